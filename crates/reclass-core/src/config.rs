//! Configuration errors and environment lookup helpers.
//!
//! Every configurable component exposes `from_env()` plus a `from_vars()`
//! variant taking a lookup function, so tests never mutate the process
//! environment.

use std::str::FromStr;

use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable: {0}")]
    Missing(String),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

impl From<ConfigError> for crate::Error {
    fn from(e: ConfigError) -> Self {
        crate::Error::Config(e.to_string())
    }
}

/// Variable lookup used by `from_vars` constructors.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Lookup backed by the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read a required, non-empty variable.
pub fn required(vars: Lookup<'_>, name: &str) -> ConfigResult<String> {
    match vars(name) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name.to_string())),
    }
}

/// Read an optional variable, treating empty values as unset.
pub fn optional(vars: Lookup<'_>, name: &str) -> Option<String> {
    vars(name).filter(|v| !v.trim().is_empty())
}

/// Read a boolean flag. Accepts `1/0`, `true/false`, `yes/no`, `on/off`.
pub fn flag(vars: Lookup<'_>, name: &str, default: bool) -> ConfigResult<bool> {
    let Some(raw) = optional(vars, name) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var: name.to_string(),
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}

/// Parse an optional variable, falling back to `default` when unset.
pub fn parsed<T>(vars: Lookup<'_>, name: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(vars, name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var: name.to_string(),
            reason: e.to_string(),
        }),
    }
}
