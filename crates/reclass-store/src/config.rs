//! Object store configuration.
//!
//! Credentials come either from a single `CLOUDINARY_URL`
//! (`cloudinary://<api_key>:<api_secret>@<cloud_name>`) or from the three
//! separate variables. The separate variables win when both are present.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CLOUDINARY_URL` | (none) | Combined credentials |
//! | `CLOUDINARY_CLOUD_NAME` | (required) | Account cloud name |
//! | `CLOUDINARY_API_KEY` | (required) | API key |
//! | `CLOUDINARY_API_SECRET` | (required) | API secret, never logged |
//! | `CLOUDINARY_API_BASE` | `https://api.cloudinary.com/v1_1` | REST endpoint |
//! | `CLOUDINARY_TIMEOUT_SECS` | `60` | Per-request timeout |

use std::fmt;

use reclass_core::config::{self, ConfigError, ConfigResult, Lookup};
use reclass_core::defaults;

/// Credentials and endpoint of the object store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Credentials parsed from a `cloudinary://` URL.
#[derive(Debug, PartialEq, Eq)]
struct UrlCredentials {
    api_key: String,
    api_secret: String,
    cloud_name: String,
}

fn parse_cloudinary_url(raw: &str) -> ConfigResult<UrlCredentials> {
    let invalid = |reason: &str| ConfigError::Invalid {
        var: "CLOUDINARY_URL".to_string(),
        reason: reason.to_string(),
    };

    let rest = raw
        .trim()
        .strip_prefix("cloudinary://")
        .ok_or_else(|| invalid("must start with cloudinary://"))?;
    let (userinfo, host) = rest
        .rsplit_once('@')
        .ok_or_else(|| invalid("missing '@<cloud_name>'"))?;
    let (api_key, api_secret) = userinfo
        .split_once(':')
        .ok_or_else(|| invalid("missing '<api_key>:<api_secret>'"))?;
    let cloud_name = host.split(['?', '/']).next().unwrap_or_default();

    if api_key.is_empty() || api_secret.is_empty() || cloud_name.is_empty() {
        return Err(invalid("api key, secret and cloud name must be non-empty"));
    }

    Ok(UrlCredentials {
        api_key: api_key.to_string(),
        api_secret: api_secret.to_string(),
        cloud_name: cloud_name.to_string(),
    })
}

impl StoreConfig {
    /// Build a configuration with the default endpoint and timeout.
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_base: defaults::STORE_API_BASE.to_string(),
            timeout_secs: defaults::STORE_TIMEOUT_SECS,
        }
    }

    /// Point the configuration at another endpoint (used by tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(&config::process_env)
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars(vars: Lookup<'_>) -> ConfigResult<Self> {
        let from_url = config::optional(vars, "CLOUDINARY_URL")
            .map(|raw| parse_cloudinary_url(&raw))
            .transpose()?;

        let pick = |name: &str, fallback: Option<&String>| -> ConfigResult<String> {
            match (config::optional(vars, name), fallback) {
                (Some(v), _) => Ok(v),
                (None, Some(v)) => Ok(v.clone()),
                (None, None) => Err(ConfigError::Missing(name.to_string())),
            }
        };

        let cloud_name = pick(
            "CLOUDINARY_CLOUD_NAME",
            from_url.as_ref().map(|c| &c.cloud_name),
        )?;
        let api_key = pick("CLOUDINARY_API_KEY", from_url.as_ref().map(|c| &c.api_key))?;
        let api_secret = pick(
            "CLOUDINARY_API_SECRET",
            from_url.as_ref().map(|c| &c.api_secret),
        )?;

        let config = Self {
            cloud_name,
            api_key,
            api_secret,
            api_base: config::optional(vars, "CLOUDINARY_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| defaults::STORE_API_BASE.to_string()),
            timeout_secs: config::parsed(
                vars,
                "CLOUDINARY_TIMEOUT_SECS",
                defaults::STORE_TIMEOUT_SECS,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "api base must start with http:// or https://, got: {}",
                self.api_base
            )));
        }
        if self.cloud_name.contains('/') {
            return Err(ConfigError::Validation(
                "cloud name cannot contain '/'".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL for this account's endpoints.
    pub fn account_url(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), self.cloud_name)
    }
}
