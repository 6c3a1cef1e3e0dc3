//! Shared application state

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::database::Database;

/// Handed to every handler; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        self.db.pool()
    }
}
