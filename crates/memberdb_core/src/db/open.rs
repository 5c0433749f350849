//! Connection opening.
//!
//! # Invariants
//! - Returned connections enforce foreign keys.
//! - Returned connections carry a busy timeout, so lock contention surfaces
//!   as `SQLITE_BUSY` only after waiting.
//! - Returned connections are migrated to [`super::migrations::latest_version`].

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Busy timeout used unless the caller picks one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

enum Location<'a> {
    File(&'a Path),
    Memory,
}

impl Location<'_> {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }
}

/// Opens (or creates) a database file with the default busy timeout.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_db_with_timeout(path, DEFAULT_BUSY_TIMEOUT)
}

/// Opens (or creates) a database file.
///
/// `busy_timeout` bounds how long a write waits for another connection's
/// lock.
pub fn open_db_with_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    open_at(Location::File(path.as_ref()), busy_timeout)
}

/// Opens a private in-memory database.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_at(Location::Memory, DEFAULT_BUSY_TIMEOUT)
}

fn open_at(location: Location<'_>, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = location.mode();

    let opened = match location {
        Location::File(path) => Connection::open(path),
        Location::Memory => Connection::open_in_memory(),
    };
    let result = opened
        .map_err(DbError::from)
        .and_then(|mut conn| prepare(&mut conn, busy_timeout).map(|()| conn));

    match &result {
        Ok(_) => info!(
            "event=db_open module=db status=ok mode={} busy_timeout_ms={} duration_ms={}",
            mode,
            busy_timeout.as_millis(),
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=db_open module=db status=error mode={} duration_ms={} error={}",
            mode,
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn prepare(conn: &mut Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(busy_timeout)?;
    apply_migrations(conn)
}
