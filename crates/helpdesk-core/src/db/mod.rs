//! `SQLite` access to the ticket report view.
//!
//! Connections are opened read-only: the core never writes to the store.
//! `busy_timeout` absorbs transient lock contention from the writer that
//! owns the database.

pub mod query;
pub mod schema;

use rusqlite::{Connection, OpenFlags};
use std::{path::Path, time::Duration};

use crate::error::{HelpdeskError, Result};

pub use query::SqliteStore;

/// Busy timeout used when the caller does not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open an existing ticket database read-only.
///
/// # Errors
///
/// Returns `QueryError` if the file cannot be opened or configured, or if it
/// does not expose the report view.
pub fn open_store(path: &Path, busy_timeout: Duration) -> Result<SqliteStore> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| HelpdeskError::query(format!("open ticket database {}", path.display()), e))?;

    conn.busy_timeout(busy_timeout)
        .map_err(|e| HelpdeskError::query("configure busy timeout", e))?;
    ensure_report_view(&conn)?;

    Ok(SqliteStore::new(conn))
}

fn ensure_report_view(conn: &Connection) -> Result<()> {
    let found: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('view', 'table') AND name = ?1",
            [schema::REPORT_VIEW],
            |row| row.get(0),
        )
        .map_err(|e| HelpdeskError::query("inspect database schema", e))?;
    if found == 0 {
        return Err(HelpdeskError::Query {
            context: format!("database has no {} view", schema::REPORT_VIEW),
            source: rusqlite::Error::InvalidQuery,
        });
    }
    Ok(())
}
