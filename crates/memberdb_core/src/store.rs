//! Store entry point: one connection plus the auditing policy.
//!
//! # Responsibility
//! - Own the SQLite connection and hand out units of work over it.
//! - Apply [`StoreConfig`] when opening.
//!
//! # Invariants
//! - A store only wraps connections migrated to the latest schema version.
//! - At most one unit of work is open per store at a time.

use crate::auditing::{AuditingHandler, FixedAuditor};
use crate::config::StoreConfig;
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db_in_memory, open_db_with_timeout};
use crate::repo::crud_repo::{RepoError, RepoResult};
use crate::uow::UnitOfWork;
use rusqlite::Connection;

pub struct Store {
    conn: Connection,
    auditing: AuditingHandler,
}

impl Store {
    /// Opens the configured database with the configured auditor.
    pub fn open(config: &StoreConfig) -> RepoResult<Self> {
        let conn = match &config.db_path {
            Some(path) => open_db_with_timeout(path, config.busy_timeout())?,
            None => open_db_in_memory()?,
        };
        let mut auditing = AuditingHandler::default();
        if let Some(auditor) = &config.auditor {
            auditing = auditing.with_auditor(FixedAuditor(auditor.clone()));
        }
        Self::from_connection(conn).map(|store| store.with_auditing(auditing))
    }

    /// In-memory store with the system clock and no auditor.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::from_connection(open_db_in_memory()?)
    }

    /// Wraps a connection opened by [`crate::db::open_db`] or equivalent.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not the latest.
    pub fn from_connection(conn: Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(&conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self {
            conn,
            auditing: AuditingHandler::default(),
        })
    }

    pub fn with_auditing(mut self, auditing: AuditingHandler) -> Self {
        self.auditing = auditing;
        self
    }

    /// Starts a unit of work. Dropping it without commit rolls back.
    pub fn begin(&mut self) -> RepoResult<UnitOfWork<'_>> {
        UnitOfWork::begin(&mut self.conn, &self.auditing)
    }

    /// Raw connection, for reads outside any unit of work.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn auditing(&self) -> &AuditingHandler {
        &self.auditing
    }
}

#[cfg(test)]
mod tests {
    use super::Store;
    use crate::config::StoreConfig;
    use crate::repo::crud_repo::RepoError;
    use rusqlite::Connection;

    #[test]
    fn rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = Store::from_connection(conn).err().unwrap();
        assert!(matches!(
            err,
            RepoError::UninitializedConnection {
                actual_version: 0,
                ..
            }
        ));
    }

    #[test]
    fn open_applies_configured_auditor() {
        let config = StoreConfig {
            auditor: Some("batch".to_string()),
            ..StoreConfig::default()
        };
        let store = Store::open(&config).unwrap();
        assert!(store.auditing().has_auditor());
        assert!(!Store::open_in_memory().unwrap().auditing().has_auditor());
    }
}
