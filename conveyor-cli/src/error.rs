//! CLI-specific error types and exit code mapping

use conveyor_core::error::ConveyorError;
use conveyor_log_stream::LogStreamError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The log stream could not be read to completion.
    #[error("log stream error: {0}")]
    Stream(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from conveyor-core.
    #[error("{0}")]
    Core(#[from] ConveyorError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error      |
    /// | 2    | Configuration error          |
    /// | 3    | Log stream failure           |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(ConveyorError::Config(_)) => 2,
            Self::Stream(_) => 3,
            Self::Io(_) | Self::Core(ConveyorError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<LogStreamError> for CliError {
    fn from(e: LogStreamError) -> Self {
        match e {
            LogStreamError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Stream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use conveyor_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::Core(ConveyorError::Config(ConfigError::FileNotFound {
            path: "conveyor.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_stream_error() {
        let err = CliError::Stream("poller stopped".to_owned());
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_log_stream_config_error() {
        let err: CliError = LogStreamError::Config {
            field: "poll_interval_ms".to_owned(),
            reason: "must be at least 1".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn test_from_log_stream_failure() {
        let err: CliError = LogStreamError::PollerFailed {
            reason: "AccessDeniedException".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Stream(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
