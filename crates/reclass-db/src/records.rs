//! PostgreSQL implementation of the record repository.
//!
//! Records live in an application-owned table with an integer key and a JSON
//! attachment column. Table and column names are configurable because the
//! table is created by the application's ORM, not by this crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument, warn};

use reclass_core::config::{self, ConfigError, ConfigResult, Lookup};
use reclass_core::{
    defaults, Attachment, AttachmentRef, Error, Record, RecordRepository, Result,
};

use crate::identifiers::{quote_column, quote_qualified};
use crate::pool::PoolConfig;

/// Physical type of the attachment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonColumnType {
    Json,
    Jsonb,
}

impl JsonColumnType {
    fn sql(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonb => "jsonb",
        }
    }
}

/// Where records are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Table name, optionally schema-qualified.
    pub table: String,
    /// Integer primary key column.
    pub id_column: String,
    /// JSON attachment column.
    pub attachments_column: String,
    /// Timestamp column refreshed on write, if any.
    pub updated_at_column: Option<String>,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            table: defaults::RECORD_TABLE.to_string(),
            id_column: defaults::ID_COLUMN.to_string(),
            attachments_column: defaults::ATTACHMENTS_COLUMN.to_string(),
            updated_at_column: Some(defaults::UPDATED_AT_COLUMN.to_string()),
        }
    }
}

/// Record store configuration.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | (required) | PostgreSQL connection string |
/// | `DATABASE_SSL_REQUIRE` | `true` | Require TLS (no certificate verification) |
/// | `DATABASE_MAX_CONNECTIONS` | `2` | Pool size |
/// | `DATABASE_CONNECT_TIMEOUT_SECS` | `30` | Connect timeout |
/// | `RECLASS_TABLE` | `CheckHistories` | Record table |
/// | `RECLASS_ID_COLUMN` | `id` | Key column |
/// | `RECLASS_ATTACHMENTS_COLUMN` | `attachments` | Attachment column |
/// | `RECLASS_UPDATED_AT_COLUMN` | `updatedAt` | Refreshed on write (empty = none) |
#[derive(Clone)]
pub struct RecordStoreConfig {
    pub database_url: String,
    pub pool: PoolConfig,
    pub layout: TableLayout,
}

impl std::fmt::Debug for RecordStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStoreConfig")
            .field("database_url", &"<redacted>")
            .field("pool", &self.pool)
            .field("layout", &self.layout)
            .finish()
    }
}

impl RecordStoreConfig {
    /// Load from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(&config::process_env)
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars(vars: Lookup<'_>) -> ConfigResult<Self> {
        let database_url = config::required(vars, "DATABASE_URL")?;
        let base = PoolConfig::default();
        let pool = PoolConfig::new()
            .ssl_require(config::flag(vars, "DATABASE_SSL_REQUIRE", base.ssl_require)?)
            .max_connections(
                config::parsed(vars, "DATABASE_MAX_CONNECTIONS", base.max_connections)?.max(1),
            )
            .connect_timeout(Duration::from_secs(config::parsed(
                vars,
                "DATABASE_CONNECT_TIMEOUT_SECS",
                base.connect_timeout.as_secs(),
            )?));

        let layout_base = TableLayout::default();
        let updated_at_column = match vars("RECLASS_UPDATED_AT_COLUMN") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v.trim().to_string()),
            None => layout_base.updated_at_column,
        };
        let layout = TableLayout {
            table: config::optional(vars, "RECLASS_TABLE").unwrap_or(layout_base.table),
            id_column: config::optional(vars, "RECLASS_ID_COLUMN")
                .unwrap_or(layout_base.id_column),
            attachments_column: config::optional(vars, "RECLASS_ATTACHMENTS_COLUMN")
                .unwrap_or(layout_base.attachments_column),
            updated_at_column,
        };

        let config = Self {
            database_url,
            pool,
            layout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "must start with postgres:// or postgresql://".to_string(),
            });
        }
        SqlText::build(&self.layout, JsonColumnType::Json)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }
}

/// Pre-rendered SQL for one table layout.
#[derive(Debug, Clone)]
struct SqlText {
    table: String,
    list: String,
    update: String,
}

impl SqlText {
    fn build(layout: &TableLayout, column_type: JsonColumnType) -> Result<Self> {
        let table = quote_qualified(&layout.table)?;
        let id = quote_column(&layout.id_column)?;
        let attachments = quote_column(&layout.attachments_column)?;
        let touch = match &layout.updated_at_column {
            Some(column) => format!(", {} = NOW()", quote_column(column)?),
            None => String::new(),
        };

        let list = format!(
            "SELECT {id}::BIGINT AS id, {att}::jsonb AS attachments \
             FROM {table} \
             WHERE {att} IS NOT NULL \
               AND jsonb_typeof({att}::jsonb) = 'array' \
               AND jsonb_array_length({att}::jsonb) > 0 \
             ORDER BY {id}",
            id = id,
            att = attachments,
            table = table,
        );
        let update = format!(
            "UPDATE {table} SET {att} = $1::text::{ty}{touch} WHERE {id} = $2",
            table = table,
            att = attachments,
            ty = column_type.sql(),
            touch = touch,
            id = id,
        );

        Ok(Self {
            table: layout.table.clone(),
            list,
            update,
        })
    }
}

/// PostgreSQL record repository.
pub struct PgRecordRepository {
    pool: PgPool,
    sql: SqlText,
}

impl PgRecordRepository {
    /// Open the repository, checking that the table and columns exist and
    /// detecting whether the attachment column is `json` or `jsonb`.
    pub async fn open(pool: PgPool, layout: TableLayout) -> Result<Self> {
        let (schema, table) = match layout.table.split_once('.') {
            Some((schema, table)) => (Some(schema.to_string()), table.to_string()),
            None => (None, layout.table.clone()),
        };

        let data_type: Option<String> = sqlx::query_scalar(
            r#"SELECT data_type::TEXT
               FROM information_schema.columns
               WHERE table_name = $1
                 AND column_name = $2
                 AND table_schema = COALESCE($3, current_schema())"#,
        )
        .bind(&table)
        .bind(&layout.attachments_column)
        .bind(schema.as_deref())
        .fetch_optional(&pool)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

        let column_type = match data_type.as_deref() {
            Some("json") => JsonColumnType::Json,
            Some("jsonb") => JsonColumnType::Jsonb,
            Some(other) => {
                return Err(Error::Connection(format!(
                    "Column {}.{} has type {}, expected json or jsonb",
                    layout.table, layout.attachments_column, other
                )))
            }
            None => {
                return Err(Error::Connection(format!(
                    "Column {}.{} not found",
                    layout.table, layout.attachments_column
                )))
            }
        };

        debug!(
            subsystem = "db",
            component = "records",
            db_table = %layout.table,
            column_type = column_type.sql(),
            "Record table inspected"
        );

        Self::with_column_type(pool, &layout, column_type)
    }

    /// Build without inspecting the schema.
    pub fn with_column_type(
        pool: PgPool,
        layout: &TableLayout,
        column_type: JsonColumnType,
    ) -> Result<Self> {
        Ok(Self {
            pool,
            sql: SqlText::build(layout, column_type)?,
        })
    }
}

/// Decode one row's attachment JSON.
///
/// Each element is decoded on its own. Elements that are not a readable
/// attachment reference are kept verbatim as `Attachment::Opaque`. Only a
/// column that is not an array is an error.
pub fn decode_attachments(record_id: i64, value: serde_json::Value) -> Result<Vec<Attachment>> {
    let serde_json::Value::Array(elements) = value else {
        return Err(Error::Serialization(format!(
            "record {}: attachment column is not an array",
            record_id
        )));
    };

    Ok(elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            match serde_json::from_value::<AttachmentRef>(element.clone()) {
                Ok(attachment) => Attachment::Ref(attachment),
                Err(e) => {
                    debug!(record_id, index, error = %e, "Keeping unreadable attachment as-is");
                    Attachment::Opaque(element)
                }
            }
        })
        .collect())
}

#[async_trait]
impl RecordRepository for PgRecordRepository {
    #[instrument(skip(self), fields(subsystem = "db", component = "records", op = "list", db_table = %self.sql.table))]
    async fn list_with_attachments(&self) -> Result<Vec<Record>> {
        let start = Instant::now();
        let rows = sqlx::query(&self.sql.list).fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let value: serde_json::Value = row.try_get("attachments")?;
            match decode_attachments(id, value) {
                Ok(attachments) => records.push(Record { id, attachments }),
                Err(e) => {
                    warn!(record_id = id, error = %e, "Skipping record with undecodable attachments");
                }
            }
        }

        info!(
            record_count = records.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Loaded records with attachments"
        );
        Ok(records)
    }

    #[instrument(skip(self, attachments), fields(subsystem = "db", component = "records", op = "persist", attachment_count = attachments.len()))]
    async fn replace_attachments(
        &self,
        record_id: i64,
        attachments: &[Attachment],
    ) -> Result<()> {
        let payload = serde_json::to_string(attachments)?;

        let result = sqlx::query(&self.sql.update)
            .bind(payload)
            .bind(record_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Persist {
                record_id,
                message: e.to_string(),
            })?;

        if result.rows_affected() == 0 {
            return Err(Error::Persist {
                record_id,
                message: "record no longer exists".to_string(),
            });
        }

        debug!(record_id, "Attachment collection replaced");
        Ok(())
    }
}
