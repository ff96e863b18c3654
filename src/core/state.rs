use std::fmt;

/// Execution state of a single controller lifecycle.
///
/// Transitions are monotonic: once the state leaves `Running` it never
/// returns to it within the same lifecycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    #[default]
    Running,
    Failed,
    Terminated,
}

impl ExecutionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionState::Running => "RUNNING",
            ExecutionState::Failed => "FAILED",
            ExecutionState::Terminated => "TERMINATED",
        }
    }

    /// Returns true while stages may still run
    pub fn is_running(&self) -> bool {
        *self == ExecutionState::Running
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
