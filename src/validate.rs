//! Form validation. Pure parsing, no side effects.

use crate::error::{ControllerError, Result};
use crate::model::{RunConfig, RunForm};
use url::Url;

/// Turn raw form input into a `RunConfig`, or say why it cannot be dispatched.
pub fn validate_run_form(form: &RunForm) -> Result<RunConfig> {
    let target_url = validate_target_url(&form.target_url)?;
    let user_count = parse_positive_u32("users", &form.users)?;
    let duration_secs = parse_positive_u64("duration", &form.duration)?;
    let ramp_up_secs = parse_non_negative("ramp-up", &form.ramp_up)?;

    Ok(RunConfig {
        target_url,
        user_count,
        duration_secs,
        ramp_up_secs,
    })
}

/// Validate the subset of fields that may change while a run is active.
pub fn validate_update(users: &str, duration: &str) -> Result<(u32, u64)> {
    Ok((
        parse_positive_u32("users", users)?,
        parse_positive_u64("duration", duration)?,
    ))
}

pub fn validate_target_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    let invalid = |reason: &str| ControllerError::InvalidUrl {
        input: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid("target URL is empty"));
    }
    let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(&format!("unsupported scheme `{}`", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(raw.to_string())
}

fn parse_positive_u32(field: &'static str, raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ControllerError::invalid_parameter(
            field,
            raw.trim(),
            "a positive integer",
        )),
    }
}

fn parse_positive_u64(field: &'static str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(ControllerError::invalid_parameter(
            field,
            raw.trim(),
            "a positive integer",
        )),
    }
}

fn parse_non_negative(field: &'static str, raw: &str) -> Result<u64> {
    raw.trim().parse::<u64>().map_err(|_| {
        ControllerError::invalid_parameter(field, raw.trim(), "a non-negative integer")
    })
}
