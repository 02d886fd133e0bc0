//! # Config Loader
//!
//! Sync-plan loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON plan files
//! - Validate plan legality
//! - Produce a [`SyncPlan`]
//!
//! # Example
//!
//! ```no_run
//! use config_loader::PlanLoader;
//! use std::path::Path;
//!
//! let plan = PlanLoader::load_from_path(Path::new("attsync.toml")).unwrap();
//! println!("devices: {}", plan.devices.len());
//! ```

mod parser;
mod validator;

pub use contracts::SyncPlan;
pub use parser::PlanFormat;

use contracts::CoreError;
use std::path::Path;

/// Plan loader
///
/// Static methods to load a plan from a file or a string.
pub struct PlanLoader;

impl PlanLoader {
    /// Load a plan from a file path.
    ///
    /// Detects the format from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<SyncPlan, CoreError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a plan from a string.
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: PlanFormat) -> Result<SyncPlan, CoreError> {
        let plan = parser::parse(content, format)?;
        validator::validate(&plan)?;
        Ok(plan)
    }

    /// Serialize a plan back to TOML.
    pub fn to_toml(plan: &SyncPlan) -> Result<String, CoreError> {
        toml::to_string_pretty(plan)
            .map_err(|e| CoreError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a plan back to JSON.
    pub fn to_json(plan: &SyncPlan) -> Result<String, CoreError> {
        serde_json::to_string_pretty(plan)
            .map_err(|e| CoreError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<PlanFormat, CoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CoreError::config_parse("cannot determine file format from extension"))?;

        PlanFormat::from_extension(ext)
            .ok_or_else(|| CoreError::config_parse(format!("unsupported config format: .{ext}")))
    }
}
