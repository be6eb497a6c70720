//! Database connection pool management.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use tracing::info;

use reclass_core::defaults;
use reclass_core::{Error, Result};

/// Pool configuration options.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Require TLS without verifying the server certificate.
    ///
    /// Hosted PostgreSQL providers commonly present certificates that do not
    /// chain to a public root.
    pub ssl_require: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            connect_timeout: Duration::from_secs(defaults::DB_CONNECT_TIMEOUT_SECS),
            ssl_require: true,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Require or relax TLS.
    pub fn ssl_require(mut self, require: bool) -> Self {
        self.ssl_require = require;
        self
    }
}

/// Build connect options from a URL and pool configuration.
///
/// An explicit `sslmode` in the URL wins over `ssl_require`.
pub fn connect_options(database_url: &str, config: &PoolConfig) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(database_url)
        .map_err(|e| Error::Connection(format!("Invalid database URL: {}", e)))?;

    if config.ssl_require && !database_url.contains("sslmode=") {
        return Ok(options.ssl_mode(PgSslMode::Require));
    }
    Ok(options)
}

/// Create a new PostgreSQL connection pool with custom configuration.
///
/// Any failure here means the run cannot start and is reported as
/// `Error::Connection`.
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    info!(
        subsystem = "db",
        component = "pool",
        op = "create",
        max_connections = config.max_connections,
        connect_timeout_secs = config.connect_timeout.as_secs(),
        ssl_require = config.ssl_require,
        "Creating database connection pool"
    );

    let options = connect_options(database_url, &config)?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(1)
        .acquire_timeout(config.connect_timeout)
        .connect_with(options)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    // Equivalent of an authenticate() round-trip: fail now rather than on the
    // first query.
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "established",
        pool_size = pool.size(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Database connection pool established"
    );
    Ok(pool)
}
