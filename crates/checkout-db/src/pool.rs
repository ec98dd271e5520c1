//! # Database Handle
//!
//! Opens `checkout.db`, applies the embedded migrations and hands out the
//! two repositories.
//!
//! ```text
//!   startup ─────────► Database::new(DbConfig) ──► migrations
//!                            │ clone
//!              ┌─────────────┴──────────────┐
//!              ▼                            ▼
//!   catalog + held cart load        hand-off worker writes
//! ```
//!
//! The journal runs in WAL mode, so startup reads never wait on the
//! worker's writes.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::DbResult;
use crate::migrations;
use crate::repository::coupon::CouponRepository;
use crate::repository::kv::KeyValueRepository;

/// Where the database lives and how many connections it gets.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,
    /// One register needs few: startup loading plus the hand-off worker.
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    /// A file database, created if missing.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A private in-memory database for tests.
    ///
    /// Every connection to `:memory:` opens a different database, so the
    /// pool is held to one.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Skips the migrations on connect (used to inspect an empty schema).
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening checkout database");

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite://{}", config.database_path.display()))?
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        Ok(Database { pool })
    }

    /// The raw pool, for migration status and tests.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn coupons(&self) -> CouponRepository {
        CouponRepository::new(self.pool.clone())
    }

    /// Held carts and other key-value entries.
    pub fn kv(&self) -> KeyValueRepository {
        KeyValueRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing checkout database");
        self.pool.close().await;
    }

    /// `true` while `SELECT 1` succeeds. Reported by the `health` command.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
