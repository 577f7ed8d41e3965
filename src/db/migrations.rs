//! Versioned schema migrations, tracked in a `_migrations` table and
//! applied in order. Each migration runs at most once.

use rusqlite::Connection;

use crate::error::AppError;

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "initial_schema",
    sql: include_str!("sql/001_init.sql"),
}];

pub fn run_all(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current_version: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM _migrations",
        [],
        |row| row.get(0),
    )?;

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "running migration"
        );

        conn.execute_batch(migration.sql).map_err(|err| {
            AppError::Internal(format!(
                "migration v{} ({}) failed: {err}",
                migration.version, migration.description
            ))
        })?;

        conn.execute(
            "INSERT INTO _migrations (version, description) VALUES (?1, ?2)",
            rusqlite::params![migration.version, migration.description],
        )?;
    }

    Ok(())
}
