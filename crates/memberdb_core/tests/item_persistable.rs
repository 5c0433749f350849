use memberdb_core::{
    AuditingHandler, CrudRepository, FixedClock, Item, RepoError, SqliteItemRepository, Store,
};
use std::rc::Rc;
use std::sync::Arc;

fn store_at(clock: &Arc<FixedClock>) -> Store {
    Store::open_in_memory()
        .unwrap()
        .with_auditing(AuditingHandler::new(Arc::clone(clock)))
}

#[test]
fn preset_key_inserts_then_merges() {
    let clock = Arc::new(FixedClock::new(1_000));
    let mut store = store_at(&clock);
    let uow = store.begin().unwrap();
    let repo = SqliteItemRepository::new(&uow);

    let fresh = Item::new("A");
    assert!(fresh.created_at().is_none());
    let saved = repo.save(fresh).unwrap();
    assert_eq!(saved.borrow().key(), "A");
    assert_eq!(saved.borrow().created_at(), Some(1_000));

    clock.advance(5_000);
    let again = saved.borrow().clone();
    let merged = repo.save(again).unwrap();
    assert!(Rc::ptr_eq(&saved, &merged));
    assert_eq!(merged.borrow().created_at(), Some(1_000));
    assert_eq!(repo.count().unwrap(), 1);
}

#[test]
fn stored_creation_time_survives_reload() {
    let clock = Arc::new(FixedClock::new(42));
    let mut store = store_at(&clock);
    let uow = store.begin().unwrap();
    SqliteItemRepository::new(&uow)
        .save(Item::new("B"))
        .unwrap();
    uow.commit().unwrap();

    let uow = store.begin().unwrap();
    let repo = SqliteItemRepository::new(&uow);
    let loaded = repo.find_by_id(&"B".to_string()).unwrap().unwrap();
    assert_eq!(loaded.borrow().created_at(), Some(42));
    assert!(repo.exists_by_id(&"B".to_string()).unwrap());
    assert!(repo.find_by_id(&"missing".to_string()).unwrap().is_none());
}

#[test]
fn new_item_with_taken_key_is_rejected() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let repo = SqliteItemRepository::new(&uow);

    repo.save(Item::new("dup")).unwrap();
    let err = repo.save(Item::new("dup")).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
}

#[test]
fn merge_of_deleted_item_reports_not_found() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let repo = SqliteItemRepository::new(&uow);

    let saved = repo.save(Item::new("gone")).unwrap();
    let copy = saved.borrow().clone();
    repo.delete(&saved).unwrap();

    assert!(matches!(
        repo.save(copy).unwrap_err(),
        RepoError::NotFound { entity: "Item", .. }
    ));
}
