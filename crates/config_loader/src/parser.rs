//! Plan parsing module
//!
//! Supports TOML (primary) and JSON formats.

use contracts::{CoreError, SyncPlan};

/// Plan file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl PlanFormat {
    /// Infer the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML plan.
pub fn parse_toml(content: &str) -> Result<SyncPlan, CoreError> {
    toml::from_str(content).map_err(|e| CoreError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON plan.
pub fn parse_json(content: &str) -> Result<SyncPlan, CoreError> {
    serde_json::from_str(content).map_err(|e| CoreError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse by format.
pub fn parse(content: &str, format: PlanFormat) -> Result<SyncPlan, CoreError> {
    match format {
        PlanFormat::Toml => parse_toml(content),
        PlanFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[[devices]]
id = "gate-1"
name = "Main Gate"
device_type = "zk_net"
[devices.connection]
host = "10.0.0.20"
port = 4370
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let plan = result.unwrap();
        assert_eq!(plan.devices.len(), 1);
        assert_eq!(plan.devices[0].device_type, "zk_net");
        // Untouched tables fall back to defaults.
        assert_eq!(plan.engine.device_timeout_secs, 60);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "engine": { "cycle_interval_secs": 120 },
            "devices": [{
                "id": "cloud-1",
                "name": "Cloud Terminal",
                "device_type": "cloud_punch",
                "connection": { "endpoint": "https://example.test/api", "api_key": "k" }
            }],
            "employees": [{ "id": 1, "name": "A", "codes": ["0001", "A-1"] }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().engine.cycle_interval_secs, 120);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), CoreError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(PlanFormat::from_extension("toml"), Some(PlanFormat::Toml));
        assert_eq!(PlanFormat::from_extension("TOML"), Some(PlanFormat::Toml));
        assert_eq!(PlanFormat::from_extension("json"), Some(PlanFormat::Json));
        assert_eq!(PlanFormat::from_extension("yaml"), None);
    }
}
