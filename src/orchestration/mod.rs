//! Request lifecycle orchestration
//!
//! This module sequences the controller stages, dispatches the load-stage
//! action and renders the result.

mod dispatcher;
pub mod executor;
mod render;
pub mod stage;

pub use executor::{Lifecycle, LifecycleReport};
pub use stage::Stage;
