//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::SyncPlan;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<PlanSummary>,
}

#[derive(Serialize)]
struct PlanSummary {
    device_count: usize,
    active_device_count: usize,
    employee_count: usize,
    cycle_interval_secs: u64,
    device_timeout_secs: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating plan");

    let result = validate_plan(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Plan validation failed")
    }
}

fn validate_plan(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::PlanLoader::load_from_path(&args.config) {
        Ok(plan) => {
            let warnings = collect_warnings(&plan);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(PlanSummary {
                    device_count: plan.devices.len(),
                    active_device_count: plan.devices.iter().filter(|d| d.active).count(),
                    employee_count: plan.employees.len(),
                    cycle_interval_secs: plan.engine.cycle_interval_secs,
                    device_timeout_secs: plan.engine.device_timeout_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect plan warnings (non-fatal issues)
fn collect_warnings(plan: &SyncPlan) -> Vec<String> {
    let mut warnings = Vec::new();

    if plan.devices.is_empty() {
        warnings.push("No devices configured - sync cycles will be no-ops".to_string());
    }

    if plan.devices.iter().all(|d| !d.active) && !plan.devices.is_empty() {
        warnings.push("All devices are inactive".to_string());
    }

    if plan.employees.is_empty() {
        warnings.push(
            "No employees configured - every punch will be dropped as unresolved".to_string(),
        );
    }

    if !plan.engine.enabled {
        warnings.push("Engine is disabled in the plan - scheduled cycles will no-op".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Plan is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!(
                "\n  Devices: {} ({} active)",
                summary.device_count, summary.active_device_count
            );
            println!("  Employees: {}", summary.employee_count);
            println!("  Cycle interval: {}s", summary.cycle_interval_secs);
            println!("  Device timeout: {}s", summary.device_timeout_secs);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Plan is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(path: &std::path::Path) -> ValidateArgs {
        ValidateArgs {
            config: path.to_path_buf(),
            json: false,
        }
    }

    #[test]
    fn test_validate_good_plan() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[devices]]
id = "gate-1"
name = "Main Gate"
device_type = "mock"

[[employees]]
id = 1
name = "A"
codes = ["0001"]
"#
        )
        .unwrap();

        let result = validate_plan(&args_for(file.path()));
        assert!(result.valid, "error: {:?}", result.error);
        assert_eq!(result.summary.unwrap().device_count, 1);
    }

    #[test]
    fn test_validate_bad_tag() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[[devices]]
id = "gate-1"
name = "Main Gate"
device_type = "punchomatic"
"#
        )
        .unwrap();

        let result = validate_plan(&args_for(file.path()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("unknown device type"));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_plan(&args_for(std::path::Path::new("/nope/missing.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_warnings_for_empty_plan() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "[engine]\nenabled = false\n").unwrap();

        let result = validate_plan(&args_for(file.path()));
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No devices")));
        assert!(warnings.iter().any(|w| w.contains("disabled")));
    }
}
