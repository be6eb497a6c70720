//! Process-wide configuration, built once at startup.

use reclass_core::config::{self, ConfigResult, Lookup};
use reclass_core::MigrationPolicy;
use reclass_db::RecordStoreConfig;
use reclass_store::StoreConfig;

/// Everything the run needs, loaded from the environment.
#[derive(Debug, Clone)]
pub struct ReclassConfig {
    pub records: RecordStoreConfig,
    pub store: StoreConfig,
    pub policy: MigrationPolicy,
    pub dry_run: bool,
}

impl ReclassConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(&config::process_env)
    }

    pub fn from_vars(vars: Lookup<'_>) -> ConfigResult<Self> {
        Ok(Self {
            records: RecordStoreConfig::from_vars(vars)?,
            store: StoreConfig::from_vars(vars)?,
            policy: MigrationPolicy::from_vars(vars)?,
            dry_run: config::flag(vars, "RECLASS_DRY_RUN", false)?,
        })
    }
}
