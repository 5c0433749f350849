//! Auditing hook invoked by repositories before each write.
//!
//! # Responsibility
//! - Resolve "now" and the current auditor once per write.
//! - Stamp creation fields on insert and modification fields on merge.
//!
//! # Invariants
//! - Application code never stamps audit fields itself.
//! - Without a configured auditor, creator/modifier ids stay empty.

use crate::model::entity::Auditable;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current instant in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Resolves the identity recorded as creator/modifier.
///
/// The hosting application supplies this, typically from its session or
/// authenticated principal.
pub trait AuditorAware: Send + Sync {
    fn current_auditor(&self) -> Option<String>;
}

impl<F> AuditorAware for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn current_auditor(&self) -> Option<String> {
        self()
    }
}

/// Always reports the same auditor id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedAuditor(pub String);

impl AuditorAware for FixedAuditor {
    fn current_auditor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Stamps audit fields on entities about to be written.
pub struct AuditingHandler {
    clock: Box<dyn Clock>,
    auditor: Option<Box<dyn AuditorAware>>,
}

impl AuditingHandler {
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            auditor: None,
        }
    }

    pub fn with_auditor(mut self, auditor: impl AuditorAware + 'static) -> Self {
        self.auditor = Some(Box::new(auditor));
        self
    }

    pub fn has_auditor(&self) -> bool {
        self.auditor.is_some()
    }

    pub fn on_create<E: Auditable>(&self, entity: &mut E) {
        let auditor = self.resolve_auditor();
        entity.mark_created(self.clock.now_millis(), auditor.as_deref());
    }

    pub fn on_update<E: Auditable>(&self, entity: &mut E) {
        let auditor = self.resolve_auditor();
        entity.mark_modified(self.clock.now_millis(), auditor.as_deref());
    }

    fn resolve_auditor(&self) -> Option<String> {
        self.auditor
            .as_ref()
            .and_then(|auditor| auditor.current_auditor())
    }
}

impl Default for AuditingHandler {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}
