use serde::{Deserialize, Serialize};

/// Lifecycle status of a spawned process.
///
/// Transitions are one-directional: `NotStarted` moves to `Started` (or
/// straight to `Failed` when the spawn itself fails), and `Started` resolves
/// into exactly one terminal state. A terminal status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessStatus {
    /// Handle created, nothing spawned yet
    NotStarted,
    /// Process spawned and running
    Started,
    /// Process exited on its own
    Finished,
    /// Process was stopped (or killed by a signal)
    Stopped,
    /// Spawn failed; the process never ran
    Failed,
}

impl std::fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessStatus::NotStarted => write!(f, "not started"),
            ProcessStatus::Started => write!(f, "started"),
            ProcessStatus::Finished => write!(f, "finished"),
            ProcessStatus::Stopped => write!(f, "stopped"),
            ProcessStatus::Failed => write!(f, "failed"),
        }
    }
}

impl ProcessStatus {
    /// Check if the status is terminal (no further transitions)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessStatus::Finished | ProcessStatus::Stopped | ProcessStatus::Failed
        )
    }

    /// Check if the process is currently running
    pub fn is_started(&self) -> bool {
        matches!(self, ProcessStatus::Started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ProcessStatus::Finished.is_terminal());
        assert!(ProcessStatus::Stopped.is_terminal());
        assert!(ProcessStatus::Failed.is_terminal());

        assert!(!ProcessStatus::NotStarted.is_terminal());
        assert!(!ProcessStatus::Started.is_terminal());
    }

    #[test]
    fn test_is_started() {
        assert!(ProcessStatus::Started.is_started());
        assert!(!ProcessStatus::NotStarted.is_started());
        assert!(!ProcessStatus::Stopped.is_started());
    }

    #[test]
    fn test_display() {
        assert_eq!(ProcessStatus::NotStarted.to_string(), "not started");
        assert_eq!(ProcessStatus::Started.to_string(), "started");
        assert_eq!(ProcessStatus::Finished.to_string(), "finished");
        assert_eq!(ProcessStatus::Stopped.to_string(), "stopped");
        assert_eq!(ProcessStatus::Failed.to_string(), "failed");
    }
}
