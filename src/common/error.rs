//! Error types for the knot integration harness
//!
//! Messages end up verbatim in the printed report, so each variant renders
//! as a self-explanatory sentence rather than a debug dump.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Infrastructure Errors ===
    #[error("{program} command not available ({detail}). Please install the knot CLI first")]
    ToolUnavailable { program: String, detail: String },

    // === Scenario Errors ===
    #[error("Command failed with exit code {exit_code}: {output}")]
    CommandFailed { exit_code: i32, output: String },

    #[error("{0}")]
    Assertion(String),

    #[error("Scenario panicked: {0}")]
    ScenarioPanicked(String),

    // === Fixture Errors ===
    #[error("Failed to scaffold fixture '{label}': {reason}")]
    Fixture { label: String, reason: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a tool unavailable error
    pub fn tool_unavailable(program: &str, detail: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            program: program.to_string(),
            detail: detail.into(),
        }
    }

    /// Create a command failed error from an exit code and captured output
    pub fn command_failed(exit_code: i32, output: &str) -> Self {
        Self::CommandFailed {
            exit_code,
            output: output.trim().to_string(),
        }
    }

    /// Create an assertion error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Create a fixture error
    pub fn fixture(label: &str, reason: impl ToString) -> Self {
        Self::Fixture {
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the suite could not run at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assertion_renders_literal_message() {
        let err = Error::assertion("Packages not found in knot_packages");
        assert_eq!(err.to_string(), "Packages not found in knot_packages");
    }

    #[test]
    fn test_command_failed_trims_output() {
        let err = Error::command_failed(1, "  boom\n");
        assert_eq!(err.to_string(), "Command failed with exit code 1: boom");
    }

    #[test]
    fn test_only_tool_unavailable_is_fatal() {
        assert!(Error::tool_unavailable("knot", "not found").is_fatal());
        assert!(!Error::assertion("nope").is_fatal());
        assert!(!Error::ScenarioPanicked("x".into()).is_fatal());
    }
}
