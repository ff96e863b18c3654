//! Controller lifecycle engine.
//!
//! Drives a controller through a fixed sequence of hook stages per
//! request, dispatches named actions during the load stage and renders the
//! result through a bound view. The `service` module serves controllers
//! over HTTP on top of pingora.

pub mod config;
pub mod controllers;
pub mod core;
pub mod logging;
pub mod orchestration;
pub mod service;
pub mod utils;
