//! Item entity with a caller-assigned key.
//!
//! The id is always present, so new-ness comes from the creation stamp: an
//! item that was never saved has no `created_at`.

use crate::model::audit::TimeAudit;
use crate::model::entity::{opt_integer, Auditable, Entity, EntityField, Persistable};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: String,
    pub(crate) time: TimeAudit,
}

impl Item {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            time: TimeAudit::default(),
        }
    }

    pub fn key(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> Option<i64> {
        self.time.created_at()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Id,
    CreatedAt,
}

impl EntityField for ItemField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "i.id",
            Self::CreatedAt => "i.created_at",
        }
    }
}

impl Persistable for Item {
    type Id = String;

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn is_new(&self) -> bool {
        self.time.created_at().is_none()
    }
}

impl Auditable for Item {
    // Only the creation instant is tracked; updates leave the row untouched.
    fn mark_created(&mut self, now: i64, _auditor: Option<&str>) {
        self.time.stamp_created(now);
    }
}

impl Entity for Item {
    type Field = ItemField;

    const NAME: &'static str = "Item";
    const TABLE: &'static str = "item";
    const ALIAS: &'static str = "i";
    const ID_COLUMN: &'static str = "id";
    const GENERATED_ID: bool = false;
    const COLUMNS: &'static [&'static str] = &["id", "created_at"];
    const INSERT_COLUMNS: &'static [&'static str] = &["id", "created_at"];
    const UPDATE_COLUMNS: &'static [&'static str] = &[];

    fn insert_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.id.clone()),
            opt_integer(self.time.created_at()),
        ]
    }

    fn update_values(&self) -> Vec<Value> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let mut time = TimeAudit::default();
        time.created_at = row.get(offset + 1)?;
        Ok(Self {
            id: row.get(offset)?,
            time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Item;
    use crate::model::entity::{Auditable, Persistable};

    #[test]
    fn item_is_new_until_created_stamp() {
        let mut item = Item::new("A");
        assert!(item.is_new());
        assert_eq!(item.id().as_deref(), Some("A"));

        item.mark_created(1_000, None);
        assert!(!item.is_new());
    }
}
