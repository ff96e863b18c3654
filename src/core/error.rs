//! Unified error handling for the controller lifecycle
//!
//! Every stage hook, action handler and collaborator reports failures
//! through [`LifecycleError`], so the pipeline can treat them uniformly.

use std::fmt;

/// Response body written when the requested action is not registered.
pub const ACTION_NOT_ALLOWED: &str = "Specified action is not allowed";

/// Response body written when a registered action cannot be resolved.
pub const ACTION_NOT_EXISTS: &str = "Specified action is not exists";

/// Error types raised while driving a controller lifecycle
#[derive(Debug)]
pub enum LifecycleError {
    /// A stage was entered after `terminate()` was called
    Terminated,

    /// A stage was entered after the lifecycle already failed
    Failed,

    /// The requested action is not in the action registry
    ActionNotAllowed(String),

    /// The registered action refers to a method the controller cannot resolve
    ActionNotExists(String),

    /// Error reported by a stage hook or action handler
    Hook(String),

    /// View rendering failures
    Render(String),

    /// I/O errors
    Io(std::io::Error),
}

impl LifecycleError {
    /// Shorthand for a hook-reported error
    pub fn hook(msg: impl Into<String>) -> Self {
        LifecycleError::Hook(msg.into())
    }

    /// Returns true for the pre-stage guard errors
    pub fn is_guard(&self) -> bool {
        matches!(self, LifecycleError::Terminated | LifecycleError::Failed)
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Terminated => write!(f, "Controller terminated"),
            LifecycleError::Failed => write!(f, "Controller failed"),
            LifecycleError::ActionNotAllowed(_) => write!(f, "{ACTION_NOT_ALLOWED}"),
            LifecycleError::ActionNotExists(_) => write!(f, "{ACTION_NOT_EXISTS}"),
            LifecycleError::Hook(msg) => write!(f, "{msg}"),
            LifecycleError::Render(msg) => write!(f, "Render error: {msg}"),
            LifecycleError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LifecycleError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LifecycleError {
    fn from(err: std::io::Error) -> Self {
        LifecycleError::Io(err)
    }
}

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        LifecycleError::Render(err.to_string())
    }
}

/// Result type alias for lifecycle operations
pub type LifecycleResult<T> = std::result::Result<T, LifecycleError>;

/// Helper trait for turning foreign errors into hook errors with context
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> LifecycleResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> LifecycleResult<T> {
        self.map_err(|e| LifecycleError::Hook(format!("{context}: {e}")))
    }
}

/// Convenience macro for hook errors
#[macro_export]
macro_rules! hook_error {
    ($msg:expr) => {
        $crate::core::LifecycleError::Hook($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::LifecycleError::Hook(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_messages() {
        assert_eq!(LifecycleError::Terminated.to_string(), "Controller terminated");
        assert_eq!(LifecycleError::Failed.to_string(), "Controller failed");
        assert!(LifecycleError::Terminated.is_guard());
        assert!(!LifecycleError::hook("boom").is_guard());
    }

    #[test]
    fn test_dispatch_messages_are_distinct() {
        let not_allowed = LifecycleError::ActionNotAllowed("delete".into());
        let not_exists = LifecycleError::ActionNotExists("showList".into());
        assert_eq!(not_allowed.to_string(), ACTION_NOT_ALLOWED);
        assert_eq!(not_exists.to_string(), ACTION_NOT_EXISTS);
        assert_ne!(not_allowed.to_string(), not_exists.to_string());
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), &str> = Err("connection refused");
        let err = result.with_context("loading notes").unwrap_err();
        assert_eq!(err.to_string(), "loading notes: connection refused");

        let err = hook_error!("missing {}", "id");
        assert!(matches!(err, LifecycleError::Hook(ref m) if m == "missing id"));
    }

    #[test]
    fn test_io_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LifecycleError = io_error.into();
        assert!(matches!(err, LifecycleError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
