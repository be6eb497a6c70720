//! Which attachments are repaired, and where they go.

use tracing::debug;

use crate::config::{self, ConfigError, ConfigResult, Lookup};
use crate::defaults;
use crate::StorageCategory;

/// Parameters of the repair.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `RECLASS_EXTENSION` | `.pdf` | File extension of affected uploads |
/// | `RECLASS_TARGET_CATEGORY` | `document` | Category affected uploads belong in |
/// | `RECLASS_ID_SUFFIX` | `_fixed` | Suffix for the corrected copy's identifier |
/// | `RECLASS_UPLOAD_FOLDER` | `res-management` | Folder for the corrected copy (empty = none) |
/// | `RECLASS_PUBLIC` | `true` | Upload the corrected copy as publicly readable |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPolicy {
    pub extension: String,
    pub target: StorageCategory,
    pub suffix: String,
    pub folder: Option<String>,
    pub public: bool,
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self {
            extension: defaults::TARGET_EXTENSION.to_string(),
            target: StorageCategory::Document,
            suffix: defaults::ID_SUFFIX.to_string(),
            folder: Some(defaults::UPLOAD_FOLDER.to_string()),
            public: true,
        }
    }
}

impl MigrationPolicy {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(&config::process_env)
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars(vars: Lookup<'_>) -> ConfigResult<Self> {
        let base = Self::default();

        let target = match config::optional(vars, "RECLASS_TARGET_CATEGORY") {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: "RECLASS_TARGET_CATEGORY".to_string(),
                reason,
            })?,
            None => base.target,
        };

        // An explicitly empty folder disables the folder parameter.
        let folder = match vars("RECLASS_UPLOAD_FOLDER") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().trim_matches('/').to_string()),
            None => base.folder,
        };

        let policy = Self {
            extension: config::optional(vars, "RECLASS_EXTENSION").unwrap_or(base.extension),
            target,
            suffix: config::optional(vars, "RECLASS_ID_SUFFIX").unwrap_or(base.suffix),
            folder,
            public: config::flag(vars, "RECLASS_PUBLIC", base.public)?,
        };
        policy.validate()?;

        debug!(
            subsystem = "core",
            component = "policy",
            extension = %policy.extension,
            target = %policy.target,
            suffix = %policy.suffix,
            folder = policy.folder.as_deref().unwrap_or("(none)"),
            "Migration policy loaded"
        );
        Ok(policy)
    }

    /// Validate the policy.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.extension.starts_with('.') || self.extension.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "extension must look like '.ext', got '{}'",
                self.extension
            )));
        }
        if self.suffix.is_empty() {
            return Err(ConfigError::Validation(
                "identifier suffix cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether an attachment with this original name is a migration candidate.
    pub fn is_candidate(&self, original_name: Option<&str>) -> bool {
        original_name.is_some_and(|name| {
            name.to_lowercase()
                .ends_with(&self.extension.to_lowercase())
        })
    }

    /// Category misplaced candidates are looked for in.
    pub fn other_category(&self) -> StorageCategory {
        self.target.other()
    }

    /// Identifier suggested for the corrected copy.
    ///
    /// The folder prefix is stripped because the store prepends the upload
    /// folder itself.
    pub fn corrected_identifier(&self, identifier: &str) -> String {
        let base = self
            .folder
            .as_deref()
            .and_then(|folder| identifier.strip_prefix(folder))
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(identifier);
        format!("{}{}", base, self.suffix)
    }
}
