pub mod constants;
pub mod migrator;
pub mod models;
pub mod operations;
pub mod path;
pub mod retry;
pub mod sql;

use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use migrator::run_migrations;

use constants::MEMORY_DB_PATH;
use path::{sqlite_url, validate_db_path};

/// Database manager for the townhall service
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database, then run migrations
    pub async fn connect(db_path: &str, max_connections: u32) -> Result<Self> {
        info!("Initializing database at {:?}", db_path);
        validate_db_path(db_path)?;

        let in_memory = db_path == MEMORY_DB_PATH;
        let mut options = SqliteConnectOptions::from_str(&sqlite_url(db_path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so pin a single one
        // and never let the pool recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;

        run_migrations(&pool).await?;

        info!("Database initialized successfully");

        Ok(Database { pool })
    }

    /// Fresh private database, used by tests and the `--db-path :memory:` CLI mode
    pub async fn connect_in_memory() -> Result<Self> {
        Self::connect(MEMORY_DB_PATH, 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
