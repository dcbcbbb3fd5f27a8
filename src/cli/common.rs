//! Shared CLI error type and exit codes.

use thiserror::Error;

/// Process exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded.
    Success = 0,
    /// Bad arguments or input data.
    Validation = 1,
    /// File system failure.
    Io = 2,
    /// Backend or upstream service failure.
    Remote = 3,
}

impl ExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Error reported by a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad arguments or input data.
    #[error("{0}")]
    Validation(String),
    /// File system failure.
    #[error("{0}")]
    Io(String),
    /// Backend or upstream service failure.
    #[error("{0}")]
    Remote(String),
}

impl CliError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    /// Creates a remote service error.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    /// Exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation(_) => ExitCode::Validation,
            Self::Io(_) => ExitCode::Io,
            Self::Remote(_) => ExitCode::Remote,
        }
    }
}

/// Result type of CLI commands.
pub type CliResult<T> = Result<T, CliError>;
