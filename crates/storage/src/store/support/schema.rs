#![forbid(unsafe_code)]

use super::super::StoreError;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

const SCHEMA_VERSION: &str = "1";

/// Tables this store owns. `work_orders` and `task_verifications` belong to other
/// subsystems and are only ever read.
const OWNED_TABLES: &[&str] = &[
    "meta",
    "counters",
    "posts",
    "department_tasks",
    "events",
    "evidence_links",
];

const SQL: &str = r#"
    PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA foreign_keys=ON;

    CREATE TABLE IF NOT EXISTS meta (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS counters (
      name TEXT PRIMARY KEY,
      value INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS posts (
      id TEXT PRIMARY KEY,
      seq INTEGER NOT NULL UNIQUE,
      post_number TEXT NOT NULL UNIQUE,
      template_id TEXT NOT NULL,
      template_name TEXT NOT NULL,
      template_json TEXT NOT NULL,
      created_by_id TEXT NOT NULL,
      created_by_name TEXT NOT NULL,
      facility TEXT NOT NULL,
      location TEXT,
      form_data_json TEXT NOT NULL,
      photo_url TEXT,
      notes TEXT,
      status TEXT NOT NULL,
      total_departments INTEGER NOT NULL,
      completed_departments INTEGER NOT NULL,
      completion_rate REAL NOT NULL,
      completed_at_ms INTEGER,
      hold_status TEXT NOT NULL,
      revision INTEGER NOT NULL,
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS department_tasks (
      id TEXT PRIMARY KEY,
      post_id TEXT NOT NULL REFERENCES posts(id),
      department_code TEXT NOT NULL,
      department_name TEXT NOT NULL,
      status TEXT NOT NULL,
      requires_signoff INTEGER NOT NULL,
      is_original INTEGER NOT NULL,
      initiated_by_id TEXT,
      initiated_by_name TEXT,
      escalated_from TEXT,
      completed_by_id TEXT,
      completed_by_name TEXT,
      completed_at_ms INTEGER,
      completion_notes TEXT,
      signed_off_by_id TEXT,
      signed_off_by_name TEXT,
      signed_off_at_ms INTEGER,
      form_type TEXT,
      module_reference_type TEXT,
      module_reference_id TEXT,
      created_at_ms INTEGER NOT NULL,
      updated_at_ms INTEGER NOT NULL,
      UNIQUE(post_id, department_code)
    );

    CREATE TABLE IF NOT EXISTS events (
      seq INTEGER PRIMARY KEY AUTOINCREMENT,
      ts_ms INTEGER NOT NULL,
      post_id TEXT,
      task_id TEXT,
      type TEXT NOT NULL,
      payload_json TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS evidence_links (
      form_type TEXT NOT NULL,
      form_id TEXT NOT NULL,
      post_id TEXT NOT NULL,
      post_number TEXT NOT NULL,
      linked_by_id TEXT NOT NULL,
      linked_by_name TEXT NOT NULL,
      linked_at_ms INTEGER NOT NULL,
      PRIMARY KEY(form_type, form_id)
    );

    CREATE INDEX IF NOT EXISTS idx_posts_recent ON posts(created_at_ms DESC, seq DESC);
    CREATE INDEX IF NOT EXISTS idx_posts_hold ON posts(facility, hold_status);
    CREATE INDEX IF NOT EXISTS idx_tasks_post ON department_tasks(post_id);
    CREATE INDEX IF NOT EXISTS idx_events_post ON events(post_id, seq);
"#;

pub(in crate::store) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
        params!["schema_version", SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Refuses to open a database written by an incompatible schema version. A fresh file,
/// or one holding only foreign tables, passes.
pub(in crate::store) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if !OWNED_TABLES.iter().any(|table| tables.contains(*table)) {
        return Ok(());
    }
    if !tables.contains("meta") {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: meta table is missing",
        ));
    }

    let version = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match version.as_deref() {
        Some(SCHEMA_VERSION) | None => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
    }
}
