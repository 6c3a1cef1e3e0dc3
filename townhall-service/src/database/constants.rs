//! Database migration constants and metadata

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptions, indexed by `version - 1`
pub const MIGRATION_DESCRIPTIONS: &[&str] =
    &["Initial civic schema: towns, budgets, meetings, forum"];

/// Default database file name
pub const DEFAULT_DB_PATH: &str = "townhall.db";

/// Special path that opens a private in-memory database
pub const MEMORY_DB_PATH: &str = ":memory:";
