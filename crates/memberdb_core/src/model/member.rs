//! Member entity.
//!
//! # Responsibility
//! - Hold member state plus the optional many-to-one team reference.
//! - Carry full audit metadata (times and auditor ids).
//!
//! # Invariants
//! - `team_id`, when set, points at a persisted team; storage enforces it with
//!   a foreign key on save.
//! - Audit metadata is only written by the auditing hook.

use crate::model::audit::AuditMetadata;
use crate::model::entity::{
    opt_integer, opt_text, Auditable, Entity, EntityField, Persistable, TransientEntityError,
};
use crate::model::team::{Team, TeamId};
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

pub type MemberId = i64;

pub(crate) const TEAM_JOIN_SQL: &str = "LEFT JOIN team t ON t.id = m.team_id";

/// Team member.
///
/// Two persisted members are equal when their ids match; members without an
/// id compare by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub(crate) id: Option<MemberId>,
    pub username: String,
    pub age: i64,
    pub(crate) team_id: Option<TeamId>,
    pub(crate) audit: AuditMetadata,
}

impl Member {
    pub fn new(username: impl Into<String>) -> Self {
        Self::with_age(username, 0)
    }

    pub fn with_age(username: impl Into<String>, age: i64) -> Self {
        Self {
            id: None,
            username: username.into(),
            age,
            team_id: None,
            audit: AuditMetadata::default(),
        }
    }

    /// Creates a member already attached to a saved team.
    pub fn with_team(
        username: impl Into<String>,
        age: i64,
        team: &Team,
    ) -> Result<Self, TransientEntityError> {
        let mut member = Self::with_age(username, age);
        member.change_team(team)?;
        Ok(member)
    }

    pub fn id(&self) -> Option<MemberId> {
        self.id
    }

    pub fn team_id(&self) -> Option<TeamId> {
        self.team_id
    }

    pub fn audit(&self) -> &AuditMetadata {
        &self.audit
    }

    /// Moves the member to `team`. The team must have been saved.
    pub fn change_team(&mut self, team: &Team) -> Result<(), TransientEntityError> {
        let team_id = team.id().ok_or(TransientEntityError { entity: Team::NAME })?;
        self.team_id = Some(team_id);
        Ok(())
    }

    /// Points at a team by id without loading it.
    ///
    /// Nothing checks the id until the next save, where a missing team fails
    /// with a referential integrity error.
    pub fn assign_team_id(&mut self, team_id: TeamId) {
        self.team_id = Some(team_id);
    }

    pub fn leave_team(&mut self) {
        self.team_id = None;
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(left), Some(right)) => left == right,
            (None, None) => {
                self.username == other.username
                    && self.age == other.age
                    && self.team_id == other.team_id
                    && self.audit == other.audit
            }
            _ => false,
        }
    }
}

impl Eq for Member {}

/// Queryable member columns, including the joined team name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberField {
    Id,
    Username,
    Age,
    TeamId,
    CreatedAt,
    LastModifiedAt,
    TeamName,
}

impl EntityField for MemberField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "m.id",
            Self::Username => "m.username",
            Self::Age => "m.age",
            Self::TeamId => "m.team_id",
            Self::CreatedAt => "m.created_at",
            Self::LastModifiedAt => "m.last_modified_at",
            Self::TeamName => "t.name",
        }
    }

    fn join(self) -> Option<&'static str> {
        match self {
            Self::TeamName => Some(TEAM_JOIN_SQL),
            _ => None,
        }
    }
}

impl Persistable for Member {
    type Id = MemberId;

    fn id(&self) -> Option<MemberId> {
        self.id
    }
}

impl Auditable for Member {
    fn mark_created(&mut self, now: i64, auditor: Option<&str>) {
        self.audit.stamp_created(now, auditor);
    }

    fn mark_modified(&mut self, now: i64, auditor: Option<&str>) {
        self.audit.stamp_modified(now, auditor);
    }
}

impl Entity for Member {
    type Field = MemberField;

    const NAME: &'static str = "Member";
    const TABLE: &'static str = "member";
    const ALIAS: &'static str = "m";
    const ID_COLUMN: &'static str = "id";
    const GENERATED_ID: bool = true;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "username",
        "age",
        "team_id",
        "created_at",
        "last_modified_at",
        "created_by",
        "last_modified_by",
    ];
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "username",
        "age",
        "team_id",
        "created_at",
        "last_modified_at",
        "created_by",
        "last_modified_by",
    ];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "username",
        "age",
        "team_id",
        "last_modified_at",
        "last_modified_by",
    ];

    fn insert_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.username.clone()),
            Value::Integer(self.age),
            opt_integer(self.team_id),
            opt_integer(self.audit.created_at()),
            opt_integer(self.audit.last_modified_at()),
            opt_text(self.audit.created_by()),
            opt_text(self.audit.last_modified_by()),
        ]
    }

    fn update_values(&self) -> Vec<Value> {
        vec![
            Value::Text(self.username.clone()),
            Value::Integer(self.age),
            opt_integer(self.team_id),
            opt_integer(self.audit.last_modified_at()),
            opt_text(self.audit.last_modified_by()),
        ]
    }

    fn assign_generated_id(&mut self, rowid: i64) {
        self.id = Some(rowid);
    }

    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        let mut audit = AuditMetadata::default();
        audit.time.created_at = row.get(offset + 4)?;
        audit.time.last_modified_at = row.get(offset + 5)?;
        audit.created_by = row.get(offset + 6)?;
        audit.last_modified_by = row.get(offset + 7)?;

        Ok(Self {
            id: Some(row.get(offset)?),
            username: row.get(offset + 1)?,
            age: row.get(offset + 2)?,
            team_id: row.get(offset + 3)?,
            audit,
        })
    }
}
