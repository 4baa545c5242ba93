//! Error types module.
//!
//! This module defines the error types used throughout the dnslat application.
//! It uses `thiserror` for structured error handling and provides
//! a custom `Result` type alias for convenience.
//!
//! Individual probe failures never show up here: they are absorbed by the
//! probe runner and reported as data on the provider result.

use thiserror::Error;

/// A specialized `Result` type for dnslat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for dnslat.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (catalog files, JSON output)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// DNS resolver construction error
    #[error("DNS resolver error: {0}")]
    Resolver(#[from] trust_dns_resolver::error::ResolveError),

    /// Configuration error (out-of-range run settings, bad catalog)
    #[error("Config error: {0}")]
    Config(String),

    /// TUI (terminal UI) related error
    #[error("TUI error: {0}")]
    Tui(String),

    /// Parse error (invalid input format, malformed data)
    #[error("Parse error: {0}")]
    Parse(String),

    /// A run was requested with an empty provider selection.
    #[error("Please select at least one DNS provider")]
    NoProviders,

    /// A run was requested while another one is still in progress.
    #[error("A test run is already in progress")]
    AlreadyRunning,
}

impl Error {
    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error with a message.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new TUI error with a message.
    #[must_use]
    pub fn tui(msg: impl Into<String>) -> Self {
        Self::Tui(msg.into())
    }

    /// Whether this error is a user-input problem rather than a fault.
    ///
    /// Callers surface these as status messages and stay ready for
    /// another attempt.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NoProviders | Self::AlreadyRunning | Self::Config(_) | Self::Parse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_providers_message() {
        assert_eq!(
            Error::NoProviders.to_string(),
            "Please select at least one DNS provider"
        );
    }

    #[test]
    fn test_user_errors() {
        assert!(Error::NoProviders.is_user_error());
        assert!(Error::AlreadyRunning.is_user_error());
        assert!(Error::config("bad").is_user_error());
        assert!(!Error::tui("terminal gone").is_user_error());
    }
}
