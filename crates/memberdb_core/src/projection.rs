//! Result shapes narrower than a full entity.
//!
//! # Responsibility
//! - Describe the select list, joins and row mapping of each shape.
//! - Let callers pick the shape per call through a type parameter.
//!
//! # Invariants
//! - Shapes limited to root columns select only those columns.
//! - Shapes touching the related team load full member and team rows and
//!   compute the view in memory.
//! - Projections are values; they never enter the identity map.

use crate::model::entity::Entity;
use crate::model::member::{Member, MemberId, TEAM_JOIN_SQL};
use crate::model::team::Team;
use rusqlite::Row;
use serde::Serialize;

/// A result shape derived from rows of entity `E`.
pub trait Projection<E: Entity>: Sized {
    /// Alias-qualified select list.
    fn select_list() -> String;

    /// Join clauses required by the select list.
    fn joins() -> &'static [&'static str] {
        &[]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Closed projection exposing only the username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsernameOnly {
    username: String,
}

impl UsernameOnly {
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl Projection<Member> for UsernameOnly {
    fn select_list() -> String {
        "m.username".to_string()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
        })
    }
}

/// Value-object projection built from the selected username column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsernameOnlyDto {
    pub username: String,
}

impl Projection<Member> for UsernameOnlyDto {
    fn select_list() -> String {
        "m.username".to_string()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            username: row.get(0)?,
        })
    }
}

/// Open projection computed from the full member row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsernameAndAge {
    summary: String,
}

impl UsernameAndAge {
    /// `"<username> <age>"`.
    pub fn summary(&self) -> &str {
        &self.summary
    }
}

impl Projection<Member> for UsernameAndAge {
    fn select_list() -> String {
        Member::select_list()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let member = Member::from_row(row, 0)?;
        Ok(Self {
            summary: format!("{} {}", member.username, member.age),
        })
    }
}

/// Team part of [`NestedClosedProjection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamInfo {
    name: String,
}

impl TeamInfo {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Username plus a nested view of the member's team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NestedClosedProjection {
    username: String,
    team: Option<TeamInfo>,
}

impl NestedClosedProjection {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn team(&self) -> Option<&TeamInfo> {
        self.team.as_ref()
    }
}

impl Projection<Member> for NestedClosedProjection {
    fn select_list() -> String {
        format!("{}, {}", Member::select_list(), Team::select_list())
    }

    fn joins() -> &'static [&'static str] {
        &[TEAM_JOIN_SQL]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let member = Member::from_row(row, 0)?;
        let team = load_optional_team(row, Member::COLUMNS.len())?;
        Ok(Self {
            username: member.username,
            team: team.map(|team| TeamInfo { name: team.name }),
        })
    }
}

/// Member summary with its team name, built from a joined column selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberDto {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl Projection<Member> for MemberDto {
    fn select_list() -> String {
        "m.id, m.username, t.name".to_string()
    }

    fn joins() -> &'static [&'static str] {
        &[TEAM_JOIN_SQL]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            team_name: row.get(2)?,
        })
    }
}

/// Row shape returned by native member queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProjection {
    pub id: MemberId,
    pub username: String,
    pub team_name: Option<String>,
}

impl MemberProjection {
    /// Maps columns `id, username, team_name` by name.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            team_name: row.get("team_name")?,
        })
    }
}

/// Reads a team from `offset`, or `None` when the outer join found no team.
pub(crate) fn load_optional_team(row: &Row<'_>, offset: usize) -> rusqlite::Result<Option<Team>> {
    let team_id: Option<i64> = row.get(offset)?;
    match team_id {
        Some(_) => Ok(Some(Team::from_row(row, offset)?)),
        None => Ok(None),
    }
}
