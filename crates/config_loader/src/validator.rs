//! Plan validation module
//!
//! Rules:
//! - device ids unique and non-empty
//! - device_type tags recognized
//! - employee codes unique across the directory
//! - cycle interval and device timeout positive
//! - utc offset within a representable timezone range
//! - active_hours within 0..=23

use std::collections::HashSet;

use contracts::{CoreError, DeviceKind, SyncPlan};

/// Validate a SyncPlan.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(plan: &SyncPlan) -> Result<(), CoreError> {
    validate_engine(plan)?;
    validate_policy(plan)?;
    validate_devices(plan)?;
    validate_employees(plan)?;
    Ok(())
}

fn validate_engine(plan: &SyncPlan) -> Result<(), CoreError> {
    let engine = &plan.engine;

    if engine.cycle_interval_secs == 0 {
        return Err(CoreError::config_validation(
            "engine.cycle_interval_secs",
            "cycle interval must be > 0",
        ));
    }

    if engine.device_timeout_secs == 0 {
        return Err(CoreError::config_validation(
            "engine.device_timeout_secs",
            "device timeout must be > 0",
        ));
    }

    if let Some([start, end]) = engine.active_hours {
        if start > 23 || end > 23 {
            return Err(CoreError::config_validation(
                "engine.active_hours",
                format!("hours must be within 0..=23, got [{start}, {end}]"),
            ));
        }
    }

    Ok(())
}

fn validate_policy(plan: &SyncPlan) -> Result<(), CoreError> {
    let policy = &plan.policy;

    // One full day of grace makes "late" meaningless.
    if policy.grace_minutes >= 24 * 60 {
        return Err(CoreError::config_validation(
            "policy.grace_minutes",
            format!("grace must be under a day, got {}", policy.grace_minutes),
        ));
    }

    // UTC offsets on Earth fall within -12h..=+14h.
    if policy.utc_offset_minutes < -12 * 60 || policy.utc_offset_minutes > 14 * 60 {
        return Err(CoreError::config_validation(
            "policy.utc_offset_minutes",
            format!(
                "offset must be within -720..=840 minutes, got {}",
                policy.utc_offset_minutes
            ),
        ));
    }

    Ok(())
}

fn validate_devices(plan: &SyncPlan) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for device in &plan.devices {
        if device.id.is_empty() {
            return Err(CoreError::config_validation(
                "devices[].id",
                "device id cannot be empty",
            ));
        }

        if !seen.insert(&device.id) {
            return Err(CoreError::config_validation(
                format!("devices[id={}]", device.id),
                "duplicate device id",
            ));
        }

        if DeviceKind::from_tag(&device.device_type).is_none() {
            return Err(CoreError::config_validation(
                format!("devices[id={}].device_type", device.id),
                format!("unknown device type '{}'", device.device_type),
            ));
        }
    }
    Ok(())
}

fn validate_employees(plan: &SyncPlan) -> Result<(), CoreError> {
    let mut seen_ids = HashSet::new();
    let mut seen_codes = HashSet::new();

    for employee in &plan.employees {
        if !seen_ids.insert(employee.id) {
            return Err(CoreError::config_validation(
                format!("employees[id={}]", employee.id),
                "duplicate employee id",
            ));
        }

        for code in &employee.codes {
            if code.is_empty() {
                return Err(CoreError::config_validation(
                    format!("employees[id={}].codes", employee.id),
                    "employee code cannot be empty",
                ));
            }
            if !seen_codes.insert(code) {
                return Err(CoreError::config_validation(
                    format!("employees[id={}].codes", employee.id),
                    format!("code '{code}' maps to more than one employee"),
                ));
            }
        }
    }
    Ok(())
}
