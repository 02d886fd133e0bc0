//! Layered error definitions
//!
//! Categorized by source: config / transport / store / sync

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum CoreError {
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

    // ===== Transport Errors =====
    /// Device connection error (transient I/O)
    #[error("device '{device_id}' connection error: {message}")]
    Connection { device_id: String, message: String },

    /// Required connection parameters are missing on the registry row
    #[error("device '{device_id}' has incomplete connection parameters")]
    IncompleteConnection { device_id: String },

    /// Vendor payload could not be decoded
    #[error("device '{device_id}' protocol error: {message}")]
    Protocol { device_id: String, message: String },

    /// Unrecognized vendor tag; fatal at transport construction
    #[error("device '{device_id}' has unknown device type '{tag}'")]
    UnknownDeviceType { device_id: String, tag: String },

    // ===== Sync Errors =====
    /// Device is not present in the registry
    #[error("device '{device_id}' not found")]
    DeviceNotFound { device_id: String },

    /// Device exists but is flagged inactive
    #[error("device '{device_id}' is inactive")]
    DeviceInactive { device_id: String },

    /// Per-device sync budget exhausted
    #[error("device '{device_id}' sync timed out after {timeout_secs}s")]
    SyncTimeout { device_id: String, timeout_secs: u64 },

    // ===== Store Errors =====
    /// Persistence failure
    #[error("store error: {message}")]
    Store { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl CoreError {
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

    /// Create device connection error
    pub fn connection(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            device_id: device_id.into(),
            message: message.into(),
        }
    }

    /// Create protocol error
    pub fn protocol(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            device_id: device_id.into(),
            message: message.into(),
        }
    }

    /// Create store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }
}
