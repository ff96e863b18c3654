//! Core abstractions for the controller lifecycle
//!
//! This module provides the execution state, error types, per-request
//! context, collaborator traits, action registry and event bus that the
//! orchestration layer is built on.

pub mod context;
pub mod error;
pub mod event;
pub mod registry;
pub mod state;
pub mod traits;

// Re-export commonly used types
pub use context::{DataBag, LifecycleContext};
pub use error::{ErrorContext, LifecycleError, LifecycleResult};
pub use event::{EventBus, LifecycleEvent, Listener};
pub use registry::{ActionFn, ActionRegistry, ActionTarget};
pub use state::ExecutionState;
pub use traits::*;
