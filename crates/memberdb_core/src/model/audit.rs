//! Audit metadata embedded into entities.
//!
//! Two shapes exist: [`TimeAudit`] for entities that only track when they were
//! written, and [`AuditMetadata`] which adds who wrote them. Values are stamped
//! by the auditing hook before each write, never by application code.

use serde::{Deserialize, Serialize};

/// Creation and last-modification instants in epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAudit {
    pub(crate) created_at: Option<i64>,
    pub(crate) last_modified_at: Option<i64>,
}

impl TimeAudit {
    pub fn created_at(&self) -> Option<i64> {
        self.created_at
    }

    pub fn last_modified_at(&self) -> Option<i64> {
        self.last_modified_at
    }

    /// Stamps creation once. A second call keeps the original instant.
    pub(crate) fn stamp_created(&mut self, now: i64) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.last_modified_at = Some(now);
    }

    pub(crate) fn stamp_modified(&mut self, now: i64) {
        self.last_modified_at = Some(now);
    }
}

/// Time audit plus the auditor ids that created and last modified a row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub(crate) time: TimeAudit,
    pub(crate) created_by: Option<String>,
    pub(crate) last_modified_by: Option<String>,
}

impl AuditMetadata {
    pub fn created_at(&self) -> Option<i64> {
        self.time.created_at()
    }

    pub fn last_modified_at(&self) -> Option<i64> {
        self.time.last_modified_at()
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    pub fn last_modified_by(&self) -> Option<&str> {
        self.last_modified_by.as_deref()
    }

    pub(crate) fn stamp_created(&mut self, now: i64, auditor: Option<&str>) {
        let first_stamp = self.time.created_at.is_none();
        self.time.stamp_created(now);
        if first_stamp {
            self.created_by = auditor.map(str::to_string);
        }
        self.last_modified_by = auditor.map(str::to_string);
    }

    pub(crate) fn stamp_modified(&mut self, now: i64, auditor: Option<&str>) {
        self.time.stamp_modified(now);
        self.last_modified_by = auditor.map(str::to_string);
    }
}
