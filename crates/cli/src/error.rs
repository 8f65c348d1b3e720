//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration rejected after applying overrides
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String },

    /// Mapper unreachable or listener could not start
    #[error("Failed to reach mapper at {address}: {message}")]
    MapperConnection { address: String, message: String },

    /// Tracking session aborted
    #[error("Tracking failed: {0}")]
    Tracking(#[from] tracking::TrackingError),

    /// Mapper session aborted
    #[error("Mapper failed: {0}")]
    Mapper(#[from] mapper::MapperError),

    /// Collaborator or dataset setup failed
    #[error("Setup failed: {0}")]
    Setup(#[from] contracts::ContractError),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    pub fn mapper_connection(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MapperConnection {
            address: address.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
