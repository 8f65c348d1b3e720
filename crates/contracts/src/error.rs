//! Layered error definitions
//!
//! Categorized by source: config / collaborator / channel / invariant

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// A collaborator variant that this build cannot provide
    #[error("unsupported {kind}: '{name}'")]
    UnsupportedConfiguration { kind: String, name: String },

    // ===== Collaborator Errors =====
    /// Motion gate, frontend or backend failed during its step
    #[error("{component} failed: {message}")]
    Collaborator { component: String, message: String },

    /// Dataset could not produce a frame
    #[error("dataset error at frame {index}: {message}")]
    Dataset { index: usize, message: String },

    // ===== Channel Errors =====
    /// Peer closed the handshake channel
    #[error("handshake channel closed: {context}")]
    ChannelClosed { context: String },

    /// Transport I/O failure
    #[error("handshake channel io error: {message}")]
    ChannelIo { message: String },

    /// Wire encoding / decoding failure
    #[error("codec error: {message}")]
    Codec { message: String },

    /// Acknowledgement did not arrive in time
    #[error("acknowledgement timeout after {waited_ms}ms")]
    AckTimeout { waited_ms: u64 },

    // ===== Logic Errors =====
    /// Sequencing invariant broken; a programming fault, not a user error
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create unsupported configuration error
    pub fn unsupported(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create collaborator failure
    pub fn collaborator(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Collaborator {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create channel-closed error
    pub fn channel_closed(context: impl Into<String>) -> Self {
        Self::ChannelClosed {
            context: context.into(),
        }
    }

    /// Create codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// True for errors that mean the peer process is gone
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ChannelClosed { .. } | Self::ChannelIo { .. })
    }
}
