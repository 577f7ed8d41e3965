//! SQLite persistence behind a thread-safe handle.
//!
//! All access is serialized through a `Mutex<Connection>`; multi-write
//! operations additionally run inside a transaction so a failure rolls
//! back every write. WAL mode is enabled for concurrent readers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use crate::error::AppError;

pub mod attempt_repo;
pub mod log_repo;
pub mod migrations;
pub mod order_repo;
pub mod pharmacy_repo;
pub mod profile_repo;
pub mod report_repo;
pub mod route_repo;
pub mod vehicle_repo;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database at the given path and runs all
    /// pending migrations.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                AppError::Internal(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        tracing::info!(path = %path.display(), "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for tests. Runs all migrations.
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Locked access to the connection for reads and single writes.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Connection) -> Result<T, AppError>,
    {
        let conn = self.conn.lock().map_err(|_| AppError::LockPoisoned)?;
        f(&conn)
    }

    /// Runs `f` inside a transaction. The transaction commits only when
    /// `f` returns `Ok`; any error rolls back every write made within.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T, AppError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, AppError>,
    {
        let mut conn = self.conn.lock().map_err(|_| AppError::LockPoisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

pub(crate) fn now_text(now: DateTime<Utc>) -> String {
    now.to_rfc3339()
}

pub(crate) fn parse_ts(value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| conversion_error(err))
}

pub(crate) fn parse_opt_ts(value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

pub(crate) fn parse_date(value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(conversion_error)
}

pub(crate) fn parse_opt_date(value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value.as_deref().map(parse_date).transpose()
}

pub(crate) fn parse_uuid(value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(conversion_error)
}

pub(crate) fn parse_opt_uuid(value: Option<String>) -> rusqlite::Result<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}

/// Maps a stored enum value that no parser recognizes. Only reachable if
/// the table holds text the application never writes.
pub(crate) fn bad_enum(column: &str, value: &str) -> rusqlite::Error {
    conversion_error(format!("unexpected {column} value: {value}"))
}

fn conversion_error<E>(err: E) -> rusqlite::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, err.into())
}
