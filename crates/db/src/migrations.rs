/// Inline SQL migrations for the coach database schema.
///
/// Plans are stored as JSON documents; only the columns needed for lookup
/// are broken out.
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: daily plan documents
    r#"
CREATE TABLE IF NOT EXISTS daily_plans (
    id TEXT PRIMARY KEY,
    user_email TEXT NOT NULL,
    date TEXT NOT NULL,
    document TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#,
    // Migration 2: per-user history lookups
    r#"
CREATE INDEX IF NOT EXISTS idx_daily_plans_user_date ON daily_plans(user_email, date DESC);
"#,
];
