//! Team entity.
//!
//! A team owns the inverse side of the member relation: the member rows carry
//! `team_id`, the team row stores only its name. Load the collection with
//! `TeamRepository::members_of`.

use crate::model::entity::{Auditable, Entity, EntityField, Persistable};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type TeamId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub(crate) id: Option<TeamId>,
    pub name: String,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    pub fn id(&self) -> Option<TeamId> {
        self.id
    }
}

/// Queryable team columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    Id,
    Name,
}

impl EntityField for TeamField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "t.id",
            Self::Name => "t.name",
        }
    }
}

impl Persistable for Team {
    type Id = TeamId;

    fn id(&self) -> Option<TeamId> {
        self.id
    }
}

impl Auditable for Team {}

impl Entity for Team {
    type Field = TeamField;

    const NAME: &'static str = "Team";
    const TABLE: &'static str = "team";
    const ALIAS: &'static str = "t";
    const ID_COLUMN: &'static str = "id";
    const GENERATED_ID: bool = true;
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const INSERT_COLUMNS: &'static [&'static str] = &["name"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["name"];

    fn insert_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn update_values(&self) -> Vec<Value> {
        vec![Value::Text(self.name.clone())]
    }

    fn assign_generated_id(&mut self, rowid: i64) {
        self.id = Some(rowid);
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(offset)?),
            name: row.get(offset + 1)?,
        })
    }
}
