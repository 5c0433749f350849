//! Mapping contracts shared by every persisted record.
//!
//! # Responsibility
//! - Describe how an entity maps to its table (columns, id, row decoding).
//! - Decide insert-versus-merge through [`Persistable::is_new`].
//! - Expose audit hooks the repository calls right before each write.
//!
//! # Invariants
//! - `COLUMNS` lists the select order and starts with the id column.
//! - `from_row` reads exactly `COLUMNS.len()` values starting at `offset`.

use rusqlite::types::Value;
use rusqlite::{Row, ToSql};
use std::cell::RefCell;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::hash::Hash;
use std::rc::Rc;

/// Shared handle to an instance tracked by a unit of work.
///
/// Two handles for the same row inside one unit of work are the same
/// allocation; compare them with [`Rc::ptr_eq`].
pub type Managed<E> = Rc<RefCell<E>>;

/// Identity and new-ness of a persisted record.
pub trait Persistable {
    type Id: Clone + Eq + Hash + Debug + Display + ToSql + 'static;

    /// Identifier, `None` while a generated id has not been assigned yet.
    fn id(&self) -> Option<Self::Id>;

    /// Whether the next save must insert rather than merge.
    fn is_new(&self) -> bool {
        self.id().is_none()
    }
}

/// Audit hooks. Entities without audit columns keep the no-op defaults.
pub trait Auditable {
    fn mark_created(&mut self, _now: i64, _auditor: Option<&str>) {}

    fn mark_modified(&mut self, _now: i64, _auditor: Option<&str>) {}
}

/// Typed reference to a queryable column.
pub trait EntityField: Copy + Debug {
    /// Alias-qualified column expression, e.g. `m.username`.
    fn column(self) -> &'static str;

    /// Join clause needed before this column can be referenced.
    fn join(self) -> Option<&'static str> {
        None
    }
}

/// Table mapping for one entity type.
pub trait Entity: Persistable + Auditable + Clone + 'static {
    type Field: EntityField;

    /// Human readable name used in errors and log events.
    const NAME: &'static str;
    const TABLE: &'static str;
    const ALIAS: &'static str;
    const ID_COLUMN: &'static str;
    /// Whether storage generates the id on insert.
    const GENERATED_ID: bool;
    const COLUMNS: &'static [&'static str];
    const INSERT_COLUMNS: &'static [&'static str];
    /// Columns written by merge. Creation audit columns never appear here.
    const UPDATE_COLUMNS: &'static [&'static str];

    /// Values bound to `INSERT_COLUMNS`, same order.
    fn insert_values(&self) -> Vec<Value>;

    /// Values bound to `UPDATE_COLUMNS`, same order.
    fn update_values(&self) -> Vec<Value>;

    /// Stores the id generated by storage. Unused for caller-assigned ids.
    fn assign_generated_id(&mut self, _rowid: i64) {}

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self>;

    /// Alias-qualified select list, e.g. `m.id, m.username`.
    fn select_list() -> String {
        Self::COLUMNS
            .iter()
            .map(|column| format!("{}.{}", Self::ALIAS, column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `FROM` clause with the entity alias.
    fn from_clause() -> String {
        format!("{} {}", Self::TABLE, Self::ALIAS)
    }
}

/// Raised when an unsaved entity is used where a persisted one is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientEntityError {
    pub entity: &'static str,
}

impl Display for TransientEntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} must be saved before it can be referenced", self.entity)
    }
}

impl Error for TransientEntityError {}

pub(crate) fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

pub(crate) fn opt_integer(value: Option<i64>) -> Value {
    match value {
        Some(number) => Value::Integer(number),
        None => Value::Null,
    }
}
