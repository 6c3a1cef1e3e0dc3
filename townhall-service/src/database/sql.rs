//! SQL statement constants for database operations

pub const CREATE_MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL,
    description TEXT NOT NULL
)
"#;

pub const CREATE_MUNICIPALITIES_TABLE_SQL: &str = r#"
CREATE TABLE municipalities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    state TEXT NOT NULL,
    zip_code TEXT NOT NULL,
    population INTEGER NOT NULL,
    is_serviced INTEGER NOT NULL DEFAULT 0,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    slug TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_BUDGETS_TABLE_SQL: &str = r#"
CREATE TABLE budgets (
    id TEXT PRIMARY KEY,
    year INTEGER NOT NULL,
    total_budget REAL NOT NULL,
    municipality_id TEXT NOT NULL REFERENCES municipalities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_BUDGET_CATEGORIES_TABLE_SQL: &str = r#"
CREATE TABLE budget_categories (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    amount REAL NOT NULL,
    color TEXT NOT NULL,
    budget_id TEXT NOT NULL REFERENCES budgets(id) ON DELETE CASCADE
)
"#;

pub const CREATE_MEETINGS_TABLE_SQL: &str = r#"
CREATE TABLE meetings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    date TEXT NOT NULL,
    time TEXT NOT NULL,
    committee TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('upcoming', 'past')),
    municipality_id TEXT NOT NULL REFERENCES municipalities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_AGENDA_ITEMS_TABLE_SQL: &str = r#"
CREATE TABLE agenda_items (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    item_order INTEGER NOT NULL,
    meeting_id TEXT NOT NULL REFERENCES meetings(id) ON DELETE CASCADE
)
"#;

pub const CREATE_FORUM_THREADS_TABLE_SQL: &str = r#"
CREATE TABLE forum_threads (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    author TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0,
    downvotes INTEGER NOT NULL DEFAULT 0,
    municipality_id TEXT NOT NULL REFERENCES municipalities(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

pub const CREATE_COMMENTS_TABLE_SQL: &str = r#"
CREATE TABLE comments (
    id TEXT PRIMARY KEY,
    content TEXT NOT NULL,
    author TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0,
    downvotes INTEGER NOT NULL DEFAULT 0,
    thread_id TEXT NOT NULL REFERENCES forum_threads(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
)
"#;

pub const CREATE_THREAD_TAGS_TABLE_SQL: &str = r#"
CREATE TABLE thread_tags (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    thread_id TEXT NOT NULL REFERENCES forum_threads(id) ON DELETE CASCADE
)
"#;

pub const CREATE_DB_INDEXES: &[&str] = &[
    "CREATE INDEX idx_budgets_municipality ON budgets(municipality_id, year)",
    "CREATE INDEX idx_categories_budget ON budget_categories(budget_id)",
    "CREATE INDEX idx_meetings_municipality ON meetings(municipality_id, date)",
    "CREATE INDEX idx_agenda_items_meeting ON agenda_items(meeting_id, item_order)",
    "CREATE INDEX idx_threads_municipality ON forum_threads(municipality_id, created_at)",
    "CREATE INDEX idx_threads_created_at ON forum_threads(created_at)",
    "CREATE INDEX idx_comments_thread ON comments(thread_id, created_at)",
    "CREATE INDEX idx_thread_tags_thread ON thread_tags(thread_id)",
    "CREATE INDEX idx_thread_tags_name ON thread_tags(name, thread_id)",
];
