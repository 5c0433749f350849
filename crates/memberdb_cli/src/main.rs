//! CLI demo over the member store.
//!
//! # Responsibility
//! - Open a store from `MEMBERDB_*` environment settings.
//! - Seed a small member/team set and print a page in its JSON shape.

use log::info;
use memberdb_core::{
    core_version, BulkOptions, CrudRepository, Item, Member, MemberField, MemberRepository,
    PageRequest, RepoError, Sort, SqliteItemRepository, SqliteMemberRepository,
    SqliteTeamRepository, Store, StoreConfig, Team, TeamRepository,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("memberdb: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut config = StoreConfig::from_env()?;
    if config.auditor.is_none() {
        config.auditor = Some("cli".to_string());
    }
    config.init_logging()?;

    let mut store = Store::open(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={} persistent={}",
        core_version(),
        config.db_path.is_some()
    );

    let uow = store.begin()?;
    let teams = SqliteTeamRepository::new(&uow);
    let members = SqliteMemberRepository::new(&uow);
    let items = SqliteItemRepository::new(&uow);

    let team_a = teams.save(Team::new("teamA"))?;
    let team_b = teams.save(Team::new("teamB"))?;
    for (index, age) in [10, 19, 20, 21, 40].into_iter().enumerate() {
        let team = if index % 2 == 0 { &team_a } else { &team_b };
        let member = Member::with_team(format!("member{}", index + 1), age, &team.borrow())?;
        members.save(member)?;
    }
    items.save(Item::new(uuid::Uuid::new_v4().to_string()))?;

    let request = PageRequest::of_sorted(0, 3, Sort::desc(MemberField::Username))?;
    let page = members.find_native_projection_page(&request)?;
    println!("{}", serde_json::to_string_pretty(&page)?);

    let bumped = members.bulk_age_plus(
        20,
        BulkOptions {
            clear_automatically: true,
        },
    )?;
    println!("bulk age update touched {bumped} members");

    let roster = teams.members_of(&team_a.borrow())?;
    println!("teamA has {} members", roster.len());

    match members.find_one_by_username("member1") {
        Ok(Some(member)) => println!("member1 is {} years old", member.borrow().age),
        Ok(None) => println!("member1 not found"),
        Err(RepoError::NonUniqueResult { count, .. }) => {
            println!("member1 is ambiguous ({count} rows)")
        }
        Err(err) => return Err(err.into()),
    }

    uow.commit()?;
    Ok(())
}
