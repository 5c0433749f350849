//! Unit of work and identity map.
//!
//! # Responsibility
//! - Bound a set of repository calls by one SQLite transaction.
//! - Keep one in-memory instance per (entity type, id) for that transaction.
//!
//! # Invariants
//! - Loading a row whose id is already managed returns the managed instance
//!   unchanged, even when storage holds newer values (bulk updates).
//! - The identity map is discarded on commit, rollback and drop.
//! - A unit of work is confined to the thread that opened it.

use crate::auditing::AuditingHandler;
use crate::model::entity::{Entity, Managed, Persistable};
use crate::query::executor::QueryExecutor;
use crate::repo::crud_repo::{RepoError, RepoResult};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

type TypedMap<E> = HashMap<<E as Persistable>::Id, Managed<E>>;

/// Per-transaction cache of managed instances keyed by entity type and id.
#[derive(Default)]
pub struct IdentityMap {
    by_type: HashMap<TypeId, Box<dyn Any>>,
}

impl IdentityMap {
    pub fn get<E: Entity>(&self, id: &E::Id) -> Option<Managed<E>> {
        self.typed::<E>()?.get(id).cloned()
    }

    pub fn insert<E: Entity>(&mut self, id: E::Id, instance: Managed<E>) {
        if let Some(map) = self.typed_mut::<E>() {
            map.insert(id, instance);
        }
    }

    pub fn remove<E: Entity>(&mut self, id: &E::Id) -> Option<Managed<E>> {
        self.typed_mut::<E>()?.remove(id)
    }

    pub fn contains<E: Entity>(&self, id: &E::Id) -> bool {
        self.typed::<E>().is_some_and(|map| map.contains_key(id))
    }

    /// Number of managed instances of type `E`.
    pub fn len<E: Entity>(&self) -> usize {
        self.typed::<E>().map_or(0, HashMap::len)
    }

    pub fn clear_type<E: Entity>(&mut self) {
        self.by_type.remove(&TypeId::of::<E>());
    }

    pub fn clear(&mut self) {
        self.by_type.clear();
    }

    fn typed<E: Entity>(&self) -> Option<&TypedMap<E>> {
        self.by_type
            .get(&TypeId::of::<E>())
            .and_then(|entry| entry.downcast_ref::<TypedMap<E>>())
    }

    fn typed_mut<E: Entity>(&mut self) -> Option<&mut TypedMap<E>> {
        self.by_type
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(TypedMap::<E>::new()))
            .downcast_mut::<TypedMap<E>>()
    }
}

/// Transactional scope shared by the repositories created from it.
pub struct UnitOfWork<'store> {
    tx: Transaction<'store>,
    identity_map: RefCell<IdentityMap>,
    auditing: &'store AuditingHandler,
    started_at: Instant,
}

impl<'store> UnitOfWork<'store> {
    pub(crate) fn begin(
        conn: &'store mut Connection,
        auditing: &'store AuditingHandler,
    ) -> RepoResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        debug!("event=uow_begin module=uow status=ok");
        Ok(Self {
            tx,
            identity_map: RefCell::new(IdentityMap::default()),
            auditing,
            started_at: Instant::now(),
        })
    }

    /// Connection scoped to this transaction.
    pub fn conn(&self) -> &Connection {
        &self.tx
    }

    pub fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.tx)
    }

    pub fn auditing(&self) -> &AuditingHandler {
        self.auditing
    }

    /// Managed instance for `id`, if one was loaded or saved in this scope.
    pub fn find_managed<E: Entity>(&self, id: &E::Id) -> Option<Managed<E>> {
        self.identity_map.borrow().get::<E>(id)
    }

    /// Whether `instance` is the managed instance for its id.
    pub fn contains<E: Entity>(&self, instance: &Managed<E>) -> bool {
        let Some(id) = instance.borrow().id() else {
            return false;
        };
        self.find_managed::<E>(&id)
            .is_some_and(|managed| Rc::ptr_eq(&managed, instance))
    }

    pub fn managed_count<E: Entity>(&self) -> usize {
        self.identity_map.borrow().len::<E>()
    }

    /// Returns the managed instance for the entity's id, registering the
    /// entity when none exists. An existing instance wins over `entity`.
    pub(crate) fn register<E: Entity>(&self, entity: E) -> Managed<E> {
        let Some(id) = entity.id() else {
            return Rc::new(RefCell::new(entity));
        };
        if let Some(existing) = self.find_managed::<E>(&id) {
            return existing;
        }
        let managed = Rc::new(RefCell::new(entity));
        self.identity_map
            .borrow_mut()
            .insert::<E>(id, Rc::clone(&managed));
        managed
    }

    pub(crate) fn register_all<E: Entity>(&self, entities: Vec<E>) -> Vec<Managed<E>> {
        entities
            .into_iter()
            .map(|entity| self.register(entity))
            .collect()
    }

    /// Stores `entity` as the state of its managed instance, overwriting any
    /// previous state in place so existing handles observe it.
    pub(crate) fn replace<E: Entity>(&self, entity: E) -> RepoResult<Managed<E>> {
        let Some(id) = entity.id() else {
            return Ok(Rc::new(RefCell::new(entity)));
        };
        if let Some(existing) = self.find_managed::<E>(&id) {
            let mut slot = existing
                .try_borrow_mut()
                .map_err(|_| RepoError::InstanceInUse { entity: E::NAME })?;
            *slot = entity;
            drop(slot);
            return Ok(existing);
        }
        Ok(self.register(entity))
    }

    /// Makes an existing handle the managed instance for `id`.
    pub(crate) fn register_instance<E: Entity>(&self, id: E::Id, instance: &Managed<E>) {
        self.identity_map
            .borrow_mut()
            .insert::<E>(id, Rc::clone(instance));
    }

    pub(crate) fn evict<E: Entity>(&self, id: &E::Id) {
        self.identity_map.borrow_mut().remove::<E>(id);
    }

    pub(crate) fn evict_type<E: Entity>(&self) {
        self.identity_map.borrow_mut().clear_type::<E>();
    }

    /// Stops tracking `instance`; later loads of its id create a new one.
    pub fn detach<E: Entity>(&self, instance: &Managed<E>) {
        if self.contains(instance) {
            if let Some(id) = instance.borrow().id() {
                self.evict::<E>(&id);
            }
        }
    }

    /// Drops every managed instance. Required after bulk updates to observe
    /// storage state through fresh loads.
    pub fn clear(&self) {
        self.identity_map.borrow_mut().clear();
        debug!("event=uow_clear module=uow status=ok");
    }

    pub fn commit(self) -> RepoResult<()> {
        let started_at = self.started_at;
        match self.tx.commit() {
            Ok(()) => {
                info!(
                    "event=uow_commit module=uow status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=uow_commit module=uow status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    pub fn rollback(self) -> RepoResult<()> {
        self.tx.rollback()?;
        info!(
            "event=uow_rollback module=uow status=ok duration_ms={}",
            self.started_at.elapsed().as_millis()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::IdentityMap;
    use crate::model::member::Member;
    use crate::model::team::Team;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn identity_map_separates_entity_types() {
        let mut map = IdentityMap::default();
        let member = Rc::new(RefCell::new(Member::new("memberA")));
        let team = Rc::new(RefCell::new(Team::new("teamA")));

        map.insert::<Member>(1, Rc::clone(&member));
        map.insert::<Team>(1, Rc::clone(&team));

        assert!(Rc::ptr_eq(&map.get::<Member>(&1).unwrap(), &member));
        assert!(Rc::ptr_eq(&map.get::<Team>(&1).unwrap(), &team));
        assert_eq!(map.len::<Member>(), 1);

        map.clear_type::<Member>();
        assert!(map.get::<Member>(&1).is_none());
        assert!(map.contains::<Team>(&1));
    }

    #[test]
    fn remove_and_clear() {
        let mut map = IdentityMap::default();
        map.insert::<Member>(5, Rc::new(RefCell::new(Member::new("a"))));
        assert!(map.remove::<Member>(&5).is_some());
        assert!(map.remove::<Member>(&5).is_none());

        map.insert::<Team>(2, Rc::new(RefCell::new(Team::new("t"))));
        map.clear();
        assert_eq!(map.len::<Team>(), 0);
    }
}
