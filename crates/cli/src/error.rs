//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Plan file not found
    #[error("Plan file not found: {path}")]
    PlanNotFound { path: String },

    /// Plan loading error
    #[error("Failed to load plan: {message}")]
    PlanLoad { message: String },

    /// Device operation error
    #[error("Device operation failed for '{device_id}': {message}")]
    DeviceOperation { device_id: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn plan_not_found(path: impl Into<String>) -> Self {
        Self::PlanNotFound { path: path.into() }
    }

    pub fn plan_load(message: impl Into<String>) -> Self {
        Self::PlanLoad {
            message: message.into(),
        }
    }

    #[allow(dead_code)]
    pub fn device_operation(device_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeviceOperation {
            device_id: device_id.into(),
            message: message.into(),
        }
    }
}
