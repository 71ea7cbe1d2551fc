use std::io;
use thiserror::Error;

/// Custom error type for procwatch
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Process enumeration failed: {0}")]
    Enumeration(String),

    #[error("Termination failed: {0}")]
    Termination(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Result type alias for procwatch
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    /// Create an enumeration error (the process table could not be listed at all)
    pub fn enumeration<S: Into<String>>(msg: S) -> Self {
        MonitorError::Enumeration(msg.into())
    }

    pub fn termination<S: Into<String>>(msg: S) -> Self {
        MonitorError::Termination(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        MonitorError::Runtime(msg.into())
    }
}
