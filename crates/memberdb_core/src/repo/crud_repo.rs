//! Generic CRUD repository contract and its SQLite implementation.
//!
//! # Responsibility
//! - Provide save/find/count/delete for every mapped entity type.
//! - Route every write through the auditing hook and every read through the
//!   unit of work's identity map.
//!
//! # Invariants
//! - `save` inserts when `Persistable::is_new` holds and merges otherwise.
//! - Merge never writes creation audit columns.
//! - Returned handles are the unit of work's managed instances.

use crate::db::DbError;
use crate::model::entity::{Entity, Managed, Persistable, TransientEntityError};
use crate::query::criteria::{Criteria, Sort};
use crate::query::executor::id_column;
use crate::uow::UnitOfWork;
use log::debug;
use rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY;
use rusqlite::{params_from_iter, ErrorCode, ToSql};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// No row for the given id.
    NotFound { entity: &'static str, id: String },
    /// A single-result query matched more than one row.
    NonUniqueResult { entity: &'static str, count: usize },
    /// Storage rejected a reference to a missing row, or a delete of a
    /// still-referenced row.
    ReferentialIntegrity(String),
    /// Another connection holds the write lock past the busy timeout.
    Locked(String),
    InvalidQuery(String),
    Transient(TransientEntityError),
    /// A managed instance is borrowed while the repository must overwrite it.
    InstanceInUse { entity: &'static str },
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::NonUniqueResult { entity, count } => write!(
                f,
                "query did not return a unique {entity} result: {count} rows matched"
            ),
            Self::ReferentialIntegrity(message) => {
                write!(f, "referential integrity violation: {message}")
            }
            Self::Locked(message) => write!(f, "storage is locked: {message}"),
            Self::InvalidQuery(message) => write!(f, "invalid query: {message}"),
            Self::Transient(err) => write!(f, "{err}"),
            Self::InstanceInUse { entity } => {
                write!(f, "managed {entity} instance is borrowed and cannot be refreshed")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Transient(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::NonUniqueResult { .. } => None,
            Self::ReferentialIntegrity(_) => None,
            Self::Locked(_) => None,
            Self::InvalidQuery(_) => None,
            Self::InstanceInUse { .. } => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(err, message) = &value {
            if err.extended_code == SQLITE_CONSTRAINT_FOREIGNKEY {
                return Self::ReferentialIntegrity(
                    message.clone().unwrap_or_else(|| err.to_string()),
                );
            }
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
                return Self::Locked(value.to_string());
            }
        }
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<TransientEntityError> for RepoError {
    fn from(value: TransientEntityError) -> Self {
        Self::Transient(value)
    }
}

/// CRUD contract shared by every entity repository.
pub trait CrudRepository<E: Entity> {
    /// Inserts a new entity or merges an existing one.
    fn save(&self, entity: E) -> RepoResult<Managed<E>>;
    /// Writes the current state of a managed instance back to storage.
    fn update(&self, instance: &Managed<E>) -> RepoResult<()>;
    fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<Managed<E>>>;
    fn find_all_by_ids(&self, ids: &[E::Id]) -> RepoResult<Vec<Managed<E>>>;
    fn exists_by_id(&self, id: &E::Id) -> RepoResult<bool>;
    fn find_all(&self) -> RepoResult<Vec<Managed<E>>>;
    fn find_all_sorted(&self, sort: &Sort<E::Field>) -> RepoResult<Vec<Managed<E>>>;
    fn count(&self) -> RepoResult<u64>;
    /// Deletes the row of `instance`. A never-saved instance is ignored.
    fn delete(&self, instance: &Managed<E>) -> RepoResult<()>;
    /// Deletes by id, failing with `NotFound` when no row matches.
    fn delete_by_id(&self, id: &E::Id) -> RepoResult<()>;
    /// Deletes every row of the table and returns how many were removed.
    fn delete_all(&self) -> RepoResult<usize>;
}

/// SQLite-backed repository bound to one unit of work.
pub struct SqliteRepository<'uow, 'store, E> {
    uow: &'uow UnitOfWork<'store>,
    _entity: PhantomData<E>,
}

impl<'uow, 'store, E: Entity> SqliteRepository<'uow, 'store, E> {
    pub fn new(uow: &'uow UnitOfWork<'store>) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    pub fn unit_of_work(&self) -> &'uow UnitOfWork<'store> {
        self.uow
    }

    fn insert(&self, mut entity: E) -> RepoResult<Managed<E>> {
        self.uow.auditing().on_create(&mut entity);

        let placeholders = vec!["?"; E::INSERT_COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders});",
            E::TABLE,
            E::INSERT_COLUMNS.join(", ")
        );
        self.uow
            .conn()
            .execute(&sql, params_from_iter(entity.insert_values()))?;
        if E::GENERATED_ID {
            entity.assign_generated_id(self.uow.conn().last_insert_rowid());
        }

        debug!(
            "event=entity_save module=repo status=ok entity={} op=insert",
            E::NAME
        );
        self.uow.replace(entity)
    }

    fn merge(&self, mut entity: E) -> RepoResult<Managed<E>> {
        let id = entity.id().ok_or_else(|| {
            RepoError::InvalidData(format!("{} is not new but has no id", E::NAME))
        })?;
        self.uow.auditing().on_update(&mut entity);
        self.write_update(&entity, &id)?;

        // Reload so creation columns reflect storage rather than the caller's copy.
        let fresh = self
            .load_row(&id)?
            .ok_or_else(|| not_found::<E>(&id))?;
        debug!(
            "event=entity_save module=repo status=ok entity={} op=merge",
            E::NAME
        );
        self.uow.replace(fresh)
    }

    fn write_update(&self, entity: &E, id: &E::Id) -> RepoResult<()> {
        if E::UPDATE_COLUMNS.is_empty() {
            if !self.exists_by_id(id)? {
                return Err(not_found::<E>(id));
            }
            return Ok(());
        }

        let assignments = E::UPDATE_COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE {} = ?;",
            E::TABLE,
            E::ID_COLUMN
        );
        let values = entity.update_values();
        let mut params: Vec<&dyn ToSql> = values.iter().map(|value| value as &dyn ToSql).collect();
        params.push(id);

        let changed = self.uow.conn().execute(&sql, params.as_slice())?;
        if changed == 0 {
            return Err(not_found::<E>(id));
        }
        Ok(())
    }

    /// Reads the row for `id` from storage, bypassing the identity map.
    pub(crate) fn load_row(&self, id: &E::Id) -> RepoResult<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1;",
            E::select_list(),
            E::from_clause(),
            id_column::<E>()
        );
        let mut stmt = self.uow.conn().prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(E::from_row(row, 0)?));
        }
        Ok(None)
    }

    /// Loads entities matching `criteria` and returns their managed instances.
    pub fn find_managed_by(
        &self,
        criteria: &Criteria<E::Field>,
        sort: &Sort<E::Field>,
    ) -> RepoResult<Vec<Managed<E>>> {
        let rows = self.uow.executor().fetch::<E>(criteria, sort, None)?;
        Ok(self.uow.register_all(rows))
    }
}

impl<E: Entity> CrudRepository<E> for SqliteRepository<'_, '_, E> {
    fn save(&self, entity: E) -> RepoResult<Managed<E>> {
        if entity.is_new() {
            self.insert(entity)
        } else {
            self.merge(entity)
        }
    }

    fn update(&self, instance: &Managed<E>) -> RepoResult<()> {
        let mut snapshot = instance
            .try_borrow()
            .map_err(|_| RepoError::InstanceInUse { entity: E::NAME })?
            .clone();
        if snapshot.is_new() {
            return Err(RepoError::Transient(TransientEntityError { entity: E::NAME }));
        }
        let id = snapshot.id().ok_or_else(|| {
            RepoError::InvalidData(format!("{} is not new but has no id", E::NAME))
        })?;

        self.uow.auditing().on_update(&mut snapshot);
        self.write_update(&snapshot, &id)?;

        let mut slot = instance
            .try_borrow_mut()
            .map_err(|_| RepoError::InstanceInUse { entity: E::NAME })?;
        *slot = snapshot.clone();
        drop(slot);

        // A detached handle may be updated while another instance is managed
        // for the same id; that instance must see the written state too.
        match self.uow.find_managed::<E>(&id) {
            Some(managed) if !Rc::ptr_eq(&managed, instance) => {
                self.uow.replace(snapshot)?;
            }
            Some(_) => {}
            None => self.uow.register_instance(id, instance),
        }
        debug!(
            "event=entity_save module=repo status=ok entity={} op=update",
            E::NAME
        );
        Ok(())
    }

    fn find_by_id(&self, id: &E::Id) -> RepoResult<Option<Managed<E>>> {
        if let Some(managed) = self.uow.find_managed::<E>(id) {
            return Ok(Some(managed));
        }
        Ok(self.load_row(id)?.map(|entity| self.uow.register(entity)))
    }

    fn find_all_by_ids(&self, ids: &[E::Id]) -> RepoResult<Vec<Managed<E>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE {id} IN ({placeholders}) ORDER BY {id} ASC;",
            E::select_list(),
            E::from_clause(),
            id = id_column::<E>()
        );
        let mut stmt = self.uow.conn().prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(ids.iter()))?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(E::from_row(row, 0)?);
        }
        Ok(self.uow.register_all(entities))
    }

    fn exists_by_id(&self, id: &E::Id) -> RepoResult<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
            E::TABLE,
            E::ID_COLUMN
        );
        let exists: i64 = self.uow.conn().query_row(&sql, [id], |row| row.get(0))?;
        Ok(exists == 1)
    }

    fn find_all(&self) -> RepoResult<Vec<Managed<E>>> {
        self.find_managed_by(&Criteria::default(), &Sort::default())
    }

    fn find_all_sorted(&self, sort: &Sort<E::Field>) -> RepoResult<Vec<Managed<E>>> {
        self.find_managed_by(&Criteria::default(), sort)
    }

    fn count(&self) -> RepoResult<u64> {
        self.uow.executor().count::<E>(&Criteria::default())
    }

    fn delete(&self, instance: &Managed<E>) -> RepoResult<()> {
        let id = {
            let entity = instance
                .try_borrow()
                .map_err(|_| RepoError::InstanceInUse { entity: E::NAME })?;
            if entity.is_new() {
                return Ok(());
            }
            entity.id()
        };
        let Some(id) = id else {
            return Ok(());
        };

        self.execute_delete(&id)?;
        self.uow.evict::<E>(&id);
        Ok(())
    }

    fn delete_by_id(&self, id: &E::Id) -> RepoResult<()> {
        if self.execute_delete(id)? == 0 {
            return Err(not_found::<E>(id));
        }
        self.uow.evict::<E>(id);
        Ok(())
    }

    fn delete_all(&self) -> RepoResult<usize> {
        let removed = self
            .uow
            .conn()
            .execute(&format!("DELETE FROM {};", E::TABLE), [])?;
        self.uow.evict_type::<E>();
        debug!(
            "event=entity_delete module=repo status=ok entity={} rows={}",
            E::NAME,
            removed
        );
        Ok(removed)
    }
}

impl<E: Entity> SqliteRepository<'_, '_, E> {
    fn execute_delete(&self, id: &E::Id) -> RepoResult<usize> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1;", E::TABLE, E::ID_COLUMN);
        let removed = self.uow.conn().execute(&sql, [id])?;
        debug!(
            "event=entity_delete module=repo status=ok entity={} rows={}",
            E::NAME,
            removed
        );
        Ok(removed)
    }
}

pub(crate) fn not_found<E: Entity>(id: &<E as Persistable>::Id) -> RepoError {
    RepoError::NotFound {
        entity: E::NAME,
        id: id.to_string(),
    }
}
