use memberdb_core::{
    AuditingHandler, CrudRepository, FixedAuditor, FixedClock, Member, SqliteMemberRepository,
    Store,
};
use std::sync::Arc;

#[test]
fn insert_and_merge_stamp_times_and_auditors() {
    let clock = Arc::new(FixedClock::new(1_000));
    let mut store = Store::open_in_memory().unwrap().with_auditing(
        AuditingHandler::new(Arc::clone(&clock)).with_auditor(FixedAuditor("alice".to_string())),
    );
    let uow = store.begin().unwrap();
    let repo = SqliteMemberRepository::new(&uow);

    let member = repo.save(Member::new("member1")).unwrap();
    {
        let audit = member.borrow().audit().clone();
        assert_eq!(audit.created_at(), Some(1_000));
        assert_eq!(audit.last_modified_at(), Some(1_000));
        assert_eq!(audit.created_by(), Some("alice"));
        assert_eq!(audit.last_modified_by(), Some("alice"));
    }

    clock.set(2_500);
    let mut renamed = member.borrow().clone();
    renamed.username = "member2".to_string();
    repo.save(renamed).unwrap();

    let audit = member.borrow().audit().clone();
    assert_eq!(audit.created_at(), Some(1_000));
    assert_eq!(audit.last_modified_at(), Some(2_500));
    assert_eq!(audit.created_by(), Some("alice"));
}

#[test]
fn auditor_can_change_between_writes() {
    let clock = Arc::new(FixedClock::new(10));
    let current = Arc::new(std::sync::Mutex::new("creator".to_string()));
    let provider = {
        let current = Arc::clone(&current);
        move || current.lock().ok().map(|name| name.clone())
    };
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_auditing(AuditingHandler::new(Arc::clone(&clock)).with_auditor(provider));

    let uow = store.begin().unwrap();
    let repo = SqliteMemberRepository::new(&uow);
    let member = repo.save(Member::new("member1")).unwrap();

    *current.lock().unwrap() = "editor".to_string();
    clock.advance(5);
    member.borrow_mut().age = 33;
    repo.update(&member).unwrap();
    uow.commit().unwrap();

    let uow = store.begin().unwrap();
    let repo = SqliteMemberRepository::new(&uow);
    let id = member.borrow().id().unwrap();
    let reloaded = repo.find_by_id(&id).unwrap().unwrap();
    let reloaded = reloaded.borrow();
    assert_eq!(reloaded.age, 33);
    assert_eq!(reloaded.audit().created_by(), Some("creator"));
    assert_eq!(reloaded.audit().last_modified_by(), Some("editor"));
    assert_eq!(reloaded.audit().created_at(), Some(10));
    assert_eq!(reloaded.audit().last_modified_at(), Some(15));
}

#[test]
fn without_auditor_only_times_are_stamped() {
    let mut store = Store::open_in_memory()
        .unwrap()
        .with_auditing(AuditingHandler::new(FixedClock::new(7)));
    let uow = store.begin().unwrap();
    let member = SqliteMemberRepository::new(&uow)
        .save(Member::new("member1"))
        .unwrap();

    let member = member.borrow();
    assert_eq!(member.audit().created_at(), Some(7));
    assert_eq!(member.audit().created_by(), None);
    assert_eq!(member.audit().last_modified_by(), None);
}
