use memberdb_core::{
    CrudRepository, Member, RepoError, SqliteMemberRepository, SqliteTeamRepository, Store, Team,
    TeamRepository,
};
use std::rc::Rc;

#[test]
fn members_of_loads_the_inverse_side() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let teams = SqliteTeamRepository::new(&uow);
    let members = SqliteMemberRepository::new(&uow);

    let team_a = teams.save(Team::new("teamA")).unwrap();
    let team_b = teams.save(Team::new("teamB")).unwrap();
    let m1 = members
        .save(Member::with_team("member1", 10, &team_a.borrow()).unwrap())
        .unwrap();
    members
        .save(Member::with_team("member2", 20, &team_b.borrow()).unwrap())
        .unwrap();
    members
        .save(Member::with_team("member3", 30, &team_a.borrow()).unwrap())
        .unwrap();

    let roster = teams.members_of(&team_a.borrow()).unwrap();
    assert_eq!(roster.len(), 2);
    assert!(Rc::ptr_eq(&roster[0], &m1));
    assert_eq!(roster[1].borrow().username, "member3");
}

#[test]
fn moving_a_member_changes_both_rosters() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let teams = SqliteTeamRepository::new(&uow);
    let members = SqliteMemberRepository::new(&uow);

    let team_a = teams.save(Team::new("teamA")).unwrap();
    let team_b = teams.save(Team::new("teamB")).unwrap();
    let member = members
        .save(Member::with_team("member1", 10, &team_a.borrow()).unwrap())
        .unwrap();

    member
        .borrow_mut()
        .change_team(&team_b.borrow())
        .unwrap();
    members.update(&member).unwrap();

    assert!(teams.members_of(&team_a.borrow()).unwrap().is_empty());
    assert_eq!(teams.members_of(&team_b.borrow()).unwrap().len(), 1);
}

#[test]
fn unsaved_team_has_no_roster() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let teams = SqliteTeamRepository::new(&uow);

    let err = teams.members_of(&Team::new("draft")).unwrap_err();
    assert!(matches!(err, RepoError::Transient(_)));
}

#[test]
fn find_by_name_and_rename() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let teams = SqliteTeamRepository::new(&uow);

    let team = teams.save(Team::new("teamA")).unwrap();
    teams.save(Team::new("teamB")).unwrap();

    let found = teams.find_by_name("teamA").unwrap();
    assert_eq!(found.len(), 1);
    assert!(Rc::ptr_eq(&found[0], &team));

    let mut renamed = team.borrow().clone();
    renamed.name = "teamC".to_string();
    teams.save(renamed).unwrap();
    assert!(teams.find_by_name("teamA").unwrap().is_empty());
    assert_eq!(team.borrow().name, "teamC");
}

#[test]
fn deleting_a_referenced_team_is_rejected() {
    let mut store = Store::open_in_memory().unwrap();
    let uow = store.begin().unwrap();
    let teams = SqliteTeamRepository::new(&uow);
    let members = SqliteMemberRepository::new(&uow);

    let team = teams.save(Team::new("teamA")).unwrap();
    members
        .save(Member::with_team("member1", 10, &team.borrow()).unwrap())
        .unwrap();

    assert!(matches!(
        teams.delete(&team).unwrap_err(),
        RepoError::ReferentialIntegrity(_)
    ));
    assert_eq!(teams.count().unwrap(), 1);
}
