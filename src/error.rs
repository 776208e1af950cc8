//! Crate error types and utilities

use thiserror::Error;

/// Errors produced while resolving, spawning or talking to child processes
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process already started")]
    AlreadyStarted,

    #[error("Process is not running")]
    NotRunning,

    #[error("Failed to decode stream as {encoding}: {message}")]
    Decode { encoding: String, message: String },

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            ShellError::CommandNotFound { .. } => "SH001",
            ShellError::Spawn { .. } => "SH002",
            ShellError::AlreadyStarted => "SH003",
            ShellError::NotRunning => "SH004",
            ShellError::Decode { .. } => "SH005",
            ShellError::Initialization(_) => "SH006",
            ShellError::Io(_) => "SH007",
        }
    }
}

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, ShellError>;
