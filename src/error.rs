//! Exit codes and error reporting.

use serde::Serialize;

use crate::duplicates::EngineError;

/// Exit codes for photosweep.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Usage or configuration error (bad arguments, missing directories)
/// - 3: A hashing worker hit an unrecoverable fault
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The run completed.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Arguments or configuration were invalid; nothing was hashed.
    UsageError = 2,
    /// A hashing worker failed; the partial cache was saved.
    WorkerFault = 3,
    /// Interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PS000",
            Self::GeneralError => "PS001",
            Self::UsageError => "PS002",
            Self::WorkerFault => "PS003",
            Self::Interrupted => "PS130",
        }
    }

    /// Exit code for an error returned by `run_app`.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        if let Some(engine) = err.downcast_ref::<EngineError>() {
            return if engine.is_interrupted() {
                Self::Interrupted
            } else {
                Self::WorkerFault
            };
        }
        if err.downcast_ref::<UsageError>().is_some() {
            return Self::UsageError;
        }
        Self::GeneralError
    }
}

/// Invalid invocation detected after argument parsing (missing directories,
/// unreadable config). Mapped to [`ExitCode::UsageError`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Structured error information for machine-readable output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PS001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::WorkerFault.as_i32(), 3);
        assert_eq!(ExitCode::Interrupted.code_prefix(), "PS130");
        assert_eq!(
            ExitCode::Interrupted.as_i32(),
            crate::signal::EXIT_CODE_INTERRUPTED
        );
    }

    #[test]
    fn test_for_error_engine() {
        let err = anyhow::Error::new(EngineError::Interrupted);
        assert_eq!(ExitCode::for_error(&err), ExitCode::Interrupted);

        let err = anyhow::Error::new(EngineError::Panicked {
            path: PathBuf::from("/a.jpg"),
            message: "boom".into(),
        })
        .context("hashing /photos");
        assert_eq!(ExitCode::for_error(&err), ExitCode::WorkerFault);
    }

    #[test]
    fn test_for_error_usage_and_general() {
        let err = anyhow::Error::new(UsageError("no such dir".into()));
        assert_eq!(ExitCode::for_error(&err), ExitCode::UsageError);

        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    }

    #[test]
    fn test_structured_error_includes_causes() {
        let err = anyhow::Error::new(UsageError("inner".into())).context("outer");
        let structured = StructuredError::new(&err, ExitCode::UsageError);
        assert_eq!(structured.code, "PS002");
        assert_eq!(structured.message, "outer: inner");
        assert!(!structured.interrupted);
    }
}
