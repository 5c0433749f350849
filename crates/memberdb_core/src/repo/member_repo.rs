//! Member queries beyond plain CRUD.
//!
//! # Responsibility
//! - Expose the member use-case queries: filters, paging, projections, bulk
//!   updates, locking and native SQL.
//! - Register every returned entity in the unit of work's identity map unless
//!   the method documents otherwise.
//!
//! # Invariants
//! - Single-result methods fail with `NonUniqueResult` instead of picking a row.
//! - Bulk updates leave managed instances stale unless asked to clear.

use crate::model::entity::{Entity, EntityField, Managed};
use crate::model::member::{Member, MemberField, TEAM_JOIN_SQL};
use crate::model::team::Team;
use crate::projection::{load_optional_team, MemberDto, MemberProjection, Projection};
use crate::query::criteria::{Criteria, Sort};
use crate::query::executor::{page_window, Assignment, Window};
use crate::query::page::{Page, PageRequest, Slice};
use crate::repo::crud_repo::{CrudRepository, RepoError, RepoResult, SqliteRepository};
use log::debug;
use rusqlite::types::Value;

pub type SqliteMemberRepository<'uow, 'store> = SqliteRepository<'uow, 'store, Member>;

const NATIVE_PROJECTION_SQL: &str = "SELECT m.id AS id, m.username AS username, t.name AS team_name \
     FROM member m LEFT JOIN team t ON t.id = m.team_id";
const NATIVE_PROJECTION_COUNT_SQL: &str = "SELECT COUNT(*) FROM member";

/// Options for bulk statements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOptions {
    /// Clear the identity map after the statement so later loads see storage.
    pub clear_automatically: bool,
}

/// A member loaded together with its team in one joined query.
#[derive(Debug, Clone)]
pub struct MemberWithTeam {
    pub member: Managed<Member>,
    pub team: Option<Managed<Team>>,
}

/// Member use-case repository.
pub trait MemberRepository: CrudRepository<Member> {
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i64,
    ) -> RepoResult<Vec<Managed<Member>>>;

    fn find_by_criteria(
        &self,
        criteria: &Criteria<MemberField>,
        sort: &Sort<MemberField>,
    ) -> RepoResult<Vec<Managed<Member>>>;

    /// Members named `username`; empty when none match.
    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Managed<Member>>>;

    /// The member named `username`, if exactly one exists.
    fn find_one_by_username(&self, username: &str) -> RepoResult<Option<Managed<Member>>>;

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Managed<Member>>>;

    fn find_by_age_page(
        &self,
        age: i64,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>>;

    fn find_by_age_slice(
        &self,
        age: i64,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Managed<Member>>>;

    fn find_page(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>>;

    fn find_slice(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Managed<Member>>>;

    /// Page whose total comes from `count_criteria` instead of `criteria`.
    fn find_page_with_count(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
        count_criteria: &Criteria<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>>;

    /// Every member with its team, loaded in one joined query.
    fn find_all_with_team(&self) -> RepoResult<Vec<MemberWithTeam>>;

    fn find_all_with_team_by(
        &self,
        criteria: &Criteria<MemberField>,
    ) -> RepoResult<Vec<MemberWithTeam>>;

    fn find_usernames(&self) -> RepoResult<Vec<String>>;

    fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>>;

    /// Runs `age = age + 1` for every member aged `age` or older.
    ///
    /// Returns the number of updated rows. Managed members keep their old age
    /// unless `options.clear_automatically` is set.
    fn bulk_age_plus(&self, age: i64, options: BulkOptions) -> RepoResult<usize>;

    /// Loads members named `username` after taking the storage write lock.
    ///
    /// The lock is held until the unit of work commits or rolls back.
    fn find_locked_by_username(&self, username: &str) -> RepoResult<Vec<Managed<Member>>>;

    /// Detached copies of the members named `username`.
    ///
    /// The copies are not tracked; changing them writes nothing.
    fn find_read_only_by_username(&self, username: &str) -> RepoResult<Vec<Member>>;

    fn find_projections_by_username<P: Projection<Member>>(
        &self,
        username: &str,
    ) -> RepoResult<Vec<P>>;

    /// Runs caller-written SQL selecting member columns in table order.
    fn find_by_native_query(&self, sql: &str, params: &[Value]) -> RepoResult<Vec<Managed<Member>>>;

    /// Native projection page with its own native count query.
    fn find_native_projection_page(
        &self,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<MemberProjection>>;

    /// Hand-written query returning every member in id order.
    fn find_member_custom(&self) -> RepoResult<Vec<Managed<Member>>>;
}

impl MemberRepository for SqliteMemberRepository<'_, '_> {
    fn find_by_username_and_age_greater_than(
        &self,
        username: &str,
        age: i64,
    ) -> RepoResult<Vec<Managed<Member>>> {
        let criteria = Criteria::new()
            .eq(MemberField::Username, username)
            .gt(MemberField::Age, age);
        self.find_managed_by(&criteria, &Sort::unsorted())
    }

    fn find_by_criteria(
        &self,
        criteria: &Criteria<MemberField>,
        sort: &Sort<MemberField>,
    ) -> RepoResult<Vec<Managed<Member>>> {
        self.find_managed_by(criteria, sort)
    }

    fn find_list_by_username(&self, username: &str) -> RepoResult<Vec<Managed<Member>>> {
        self.find_managed_by(
            &Criteria::new().eq(MemberField::Username, username),
            &Sort::unsorted(),
        )
    }

    fn find_one_by_username(&self, username: &str) -> RepoResult<Option<Managed<Member>>> {
        let rows = self.unit_of_work().executor().fetch::<Member>(
            &Criteria::new().eq(MemberField::Username, username),
            &Sort::unsorted(),
            None,
        )?;
        if rows.len() > 1 {
            return Err(RepoError::NonUniqueResult {
                entity: Member::NAME,
                count: rows.len(),
            });
        }
        Ok(rows
            .into_iter()
            .next()
            .map(|member| self.unit_of_work().register(member)))
    }

    fn find_by_names(&self, names: &[String]) -> RepoResult<Vec<Managed<Member>>> {
        self.find_managed_by(
            &Criteria::new().in_list(MemberField::Username, names),
            &Sort::unsorted(),
        )
    }

    fn find_by_age_page(
        &self,
        age: i64,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>> {
        self.find_page(&Criteria::new().eq(MemberField::Age, age), request)
    }

    fn find_by_age_slice(
        &self,
        age: i64,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Managed<Member>>> {
        self.find_slice(&Criteria::new().eq(MemberField::Age, age), request)
    }

    fn find_page(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>> {
        let uow = self.unit_of_work();
        let page = uow.executor().fetch_page::<Member>(criteria, request, None)?;
        Ok(page.map(|member| uow.register(member)))
    }

    fn find_slice(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Slice<Managed<Member>>> {
        let uow = self.unit_of_work();
        let slice = uow.executor().fetch_slice::<Member>(criteria, request)?;
        Ok(slice.map(|member| uow.register(member)))
    }

    fn find_page_with_count(
        &self,
        criteria: &Criteria<MemberField>,
        request: &PageRequest<MemberField>,
        count_criteria: &Criteria<MemberField>,
    ) -> RepoResult<Page<Managed<Member>>> {
        let uow = self.unit_of_work();
        let page = uow
            .executor()
            .fetch_page::<Member>(criteria, request, Some(count_criteria))?;
        Ok(page.map(|member| uow.register(member)))
    }

    fn find_all_with_team(&self) -> RepoResult<Vec<MemberWithTeam>> {
        self.find_all_with_team_by(&Criteria::new())
    }

    fn find_all_with_team_by(
        &self,
        criteria: &Criteria<MemberField>,
    ) -> RepoResult<Vec<MemberWithTeam>> {
        let uow = self.unit_of_work();
        let select_list = format!("{}, {}", Member::select_list(), Team::select_list());
        let rows = uow.executor().fetch_with::<Member, (Member, Option<Team>)>(
            &select_list,
            &[TEAM_JOIN_SQL],
            criteria,
            &Sort::unsorted(),
            None,
            |row| {
                let member = Member::from_row(row, 0)?;
                let team = load_optional_team(row, Member::COLUMNS.len())?;
                Ok((member, team))
            },
        )?;

        Ok(rows
            .into_iter()
            .map(|(member, team)| MemberWithTeam {
                member: uow.register(member),
                team: team.map(|team| uow.register(team)),
            })
            .collect())
    }

    fn find_usernames(&self) -> RepoResult<Vec<String>> {
        self.unit_of_work().executor().fetch_with::<Member, String>(
            MemberField::Username.column(),
            &[],
            &Criteria::new(),
            &Sort::unsorted(),
            None,
            |row| row.get(0),
        )
    }

    fn find_member_dtos(&self) -> RepoResult<Vec<MemberDto>> {
        self.unit_of_work()
            .executor()
            .fetch_projection::<Member, MemberDto>(&Criteria::new(), &Sort::unsorted())
    }

    fn bulk_age_plus(&self, age: i64, options: BulkOptions) -> RepoResult<usize> {
        let uow = self.unit_of_work();
        let changed = uow.executor().bulk_update::<Member>(
            &[Assignment::Increment(MemberField::Age, 1)],
            &Criteria::new().ge(MemberField::Age, age),
        )?;
        if options.clear_automatically {
            uow.clear();
        }
        Ok(changed)
    }

    fn find_locked_by_username(&self, username: &str) -> RepoResult<Vec<Managed<Member>>> {
        self.unit_of_work().executor().acquire_write_lock::<Member>()?;
        debug!("event=lock_acquire module=repo status=ok entity=Member mode=write");
        self.find_list_by_username(username)
    }

    fn find_read_only_by_username(&self, username: &str) -> RepoResult<Vec<Member>> {
        self.unit_of_work().executor().fetch::<Member>(
            &Criteria::new().eq(MemberField::Username, username),
            &Sort::unsorted(),
            None,
        )
    }

    fn find_projections_by_username<P: Projection<Member>>(
        &self,
        username: &str,
    ) -> RepoResult<Vec<P>> {
        self.unit_of_work()
            .executor()
            .fetch_projection::<Member, P>(
                &Criteria::new().eq(MemberField::Username, username),
                &Sort::unsorted(),
            )
    }

    fn find_by_native_query(&self, sql: &str, params: &[Value]) -> RepoResult<Vec<Managed<Member>>> {
        let uow = self.unit_of_work();
        let members = uow
            .executor()
            .native(sql, params, |row| Member::from_row(row, 0))?;
        Ok(uow.register_all(members))
    }

    fn find_native_projection_page(
        &self,
        request: &PageRequest<MemberField>,
    ) -> RepoResult<Page<MemberProjection>> {
        let executor = self.unit_of_work().executor();
        let Window { limit, offset } = page_window(request);
        let sql = format!(
            "{NATIVE_PROJECTION_SQL}{} LIMIT ?1 OFFSET ?2",
            request.sort().render_order_by("m.id")
        );
        let params = [
            Value::Integer(window_value(limit)?),
            Value::Integer(window_value(offset)?),
        ];
        let content = executor.native(&sql, &params, MemberProjection::from_row)?;
        let total = executor.native_count(NATIVE_PROJECTION_COUNT_SQL, &[])?;
        Ok(Page::new(content, request.page(), request.size(), total))
    }

    fn find_member_custom(&self) -> RepoResult<Vec<Managed<Member>>> {
        let uow = self.unit_of_work();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY m.id ASC;",
            Member::select_list(),
            Member::from_clause()
        );
        let mut stmt = uow.conn().prepare(&sql)?;
        let rows = stmt.query_map([], |row| Member::from_row(row, 0))?;
        let mut members = Vec::new();
        for member in rows {
            members.push(member?);
        }
        Ok(uow.register_all(members))
    }
}

fn window_value(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidQuery(format!("window value {value} is out of range")))
}
