use thiserror::Error;

/// Main error type for the proclet toolkit.
///
/// Variants carry owned strings so the type stays `Clone`: the most recent
/// error is stored on a [`crate::ProcessHandle`] and handed back through
/// `get_error()`.
#[derive(Debug, Error, Clone)]
pub enum ProcletError {
    // Process lifecycle errors
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    #[error("Failed to stop process {0}: {1}")]
    StopError(String, String),

    #[error("Process {0} is in invalid state for this operation: {1}")]
    InvalidProcessState(String, String),

    // Group mode errors
    #[error("Group mode violation: {0} requested while group is {1}")]
    WrongMode(String, String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Signal delivery errors
    #[error("Signal error: {0}")]
    SignalError(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for ProcletError {
    fn from(err: std::io::Error) -> Self {
        ProcletError::Io(err.to_string())
    }
}

/// Result type alias for proclet operations
pub type Result<T> = std::result::Result<T, ProcletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProcletError::SpawnError("no such file".to_string());
        assert_eq!(err.to_string(), "Failed to spawn process: no such file");

        let err = ProcletError::WrongMode("repeat".to_string(), "parallel".to_string());
        assert!(err.to_string().contains("repeat"));
        assert!(err.to_string().contains("parallel"));
    }

    #[test]
    fn test_error_is_clone() {
        let err = ProcletError::StopError("sleep".to_string(), "ESRCH".to_string());
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProcletError = io.into();
        assert!(matches!(err, ProcletError::Io(_)));
    }
}
