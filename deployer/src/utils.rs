//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::DeployError;

/// Project name, also used as the ownership tag value
pub const PROJECT_NAME: &str = "fndeploy";

/// Version information for the deployer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// User agent sent to the API
pub fn user_agent() -> String {
    format!("{}/{}", PROJECT_NAME, env!("CARGO_PKG_VERSION"))
}

/// Random identifier correlating the log lines of one deployment
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Parse a duration string such as `300s`, `5m`, `1h30m`, `1.5s` or `500ms`
pub fn parse_duration(input: &str) -> Result<Duration, DeployError> {
    let invalid = || DeployError::Validation(format!("invalid duration: {:?}", input));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(invalid)?;
        if number_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..number_len].parse().map_err(|_| invalid())?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];

        total += value * seconds_per_unit;
    }

    if !total.is_finite() {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(total).map_err(|_| invalid())
}

/// Render a duration the way the API expects it: whole seconds
pub fn format_api_duration(duration: Duration) -> String {
    format!("{}s", duration.as_secs())
}

/// Hex encoding utilities
pub(crate) mod hex {
    const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

    pub fn encode(data: impl AsRef<[u8]>) -> String {
        let data = data.as_ref();
        let mut result = String::with_capacity(data.len() * 2);
        for byte in data {
            result.push(HEX_CHARS[(byte >> 4) as usize] as char);
            result.push(HEX_CHARS[(byte & 0x0f) as usize] as char);
        }
        result
    }
}
