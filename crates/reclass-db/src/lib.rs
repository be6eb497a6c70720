//! # reclass-db
//!
//! PostgreSQL record store access.
//!
//! This crate provides:
//! - Connection pool management
//! - The record repository over an application-owned table with a JSON
//!   attachment column
//! - Identifier validation for configurable table and column names
//! - An in-memory repository for tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use reclass_db::{Database, RecordStoreConfig};
//! use reclass_core::RecordRepository;
//!
//! let db = Database::connect(&RecordStoreConfig::from_env()?).await?;
//! for record in db.records.list_with_attachments().await? {
//!     println!("{} has {} attachments", record.id, record.attachments.len());
//! }
//! ```

pub mod identifiers;
pub mod memory;
pub mod pool;
pub mod records;

use sqlx::PgPool;

// Re-export core types
pub use reclass_core::*;

pub use memory::MemoryRecordRepository;
pub use identifiers::{quote_column, quote_qualified, validate_identifier};
pub use pool::{create_pool_with_config, PoolConfig};
pub use records::{JsonColumnType, PgRecordRepository, RecordStoreConfig, TableLayout};

/// Connected record store.
pub struct Database {
    pub pool: PgPool,
    pub records: PgRecordRepository,
}

impl Database {
    /// Connect, verify the record table, and build the repository.
    ///
    /// Fails with `Error::Connection` when the store is unreachable or the
    /// table layout does not match.
    pub async fn connect(config: &RecordStoreConfig) -> Result<Self> {
        let pool = create_pool_with_config(&config.database_url, config.pool.clone()).await?;
        let records = PgRecordRepository::open(pool.clone(), config.layout.clone()).await?;
        Ok(Self { pool, records })
    }
}
