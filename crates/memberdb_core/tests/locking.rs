use memberdb_core::{
    CrudRepository, Member, MemberRepository, RepoError, SqliteMemberRepository, Store,
    StoreConfig,
};
use std::path::Path;

fn open(path: &Path) -> Store {
    let config = StoreConfig {
        db_path: Some(path.to_path_buf()),
        busy_timeout_ms: 50,
        ..StoreConfig::default()
    };
    Store::open(&config).unwrap()
}

fn seed(store: &mut Store) {
    let uow = store.begin().unwrap();
    SqliteMemberRepository::new(&uow)
        .save(Member::with_age("member1", 10))
        .unwrap();
    uow.commit().unwrap();
}

#[test]
fn locked_read_blocks_other_writers_until_commit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("locking.db");
    let mut holder = open(&path);
    let mut contender = open(&path);
    seed(&mut holder);

    let locking_uow = holder.begin().unwrap();
    let locked = SqliteMemberRepository::new(&locking_uow)
        .find_locked_by_username("member1")
        .unwrap();
    assert_eq!(locked.len(), 1);

    {
        let uow = contender.begin().unwrap();
        let err = SqliteMemberRepository::new(&uow)
            .save(Member::new("intruder"))
            .unwrap_err();
        assert!(matches!(err, RepoError::Locked(_)), "unexpected error: {err}");
    }

    let readers_see: i64 = contender
        .connection()
        .query_row("SELECT COUNT(*) FROM member;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(readers_see, 1);

    locking_uow.commit().unwrap();

    let uow = contender.begin().unwrap();
    let repo = SqliteMemberRepository::new(&uow);
    repo.save(Member::new("latecomer")).unwrap();
    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn rollback_releases_the_lock() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollback.db");
    let mut holder = open(&path);
    let mut contender = open(&path);
    seed(&mut holder);

    let locking_uow = holder.begin().unwrap();
    SqliteMemberRepository::new(&locking_uow)
        .find_locked_by_username("member1")
        .unwrap();
    locking_uow.rollback().unwrap();

    let uow = contender.begin().unwrap();
    SqliteMemberRepository::new(&uow)
        .save(Member::new("member2"))
        .unwrap();
    uow.commit().unwrap();
}
