//! Team queries, including the inverse member collection.

use crate::model::entity::{Entity, Managed, TransientEntityError};
use crate::model::member::{Member, MemberField};
use crate::model::team::{Team, TeamField};
use crate::query::criteria::{Criteria, Sort};
use crate::repo::crud_repo::{CrudRepository, RepoError, RepoResult, SqliteRepository};

pub type SqliteTeamRepository<'uow, 'store> = SqliteRepository<'uow, 'store, Team>;

/// Team use-case repository.
pub trait TeamRepository: CrudRepository<Team> {
    /// Members whose team is `team`, in id order.
    ///
    /// Fails with `RepoError::Transient` when `team` was never saved.
    fn members_of(&self, team: &Team) -> RepoResult<Vec<Managed<Member>>>;

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Managed<Team>>>;
}

impl TeamRepository for SqliteTeamRepository<'_, '_> {
    fn members_of(&self, team: &Team) -> RepoResult<Vec<Managed<Member>>> {
        let team_id = team
            .id()
            .ok_or(RepoError::Transient(TransientEntityError { entity: Team::NAME }))?;
        SqliteRepository::<Member>::new(self.unit_of_work()).find_managed_by(
            &Criteria::new().eq(MemberField::TeamId, team_id),
            &Sort::asc(MemberField::Id),
        )
    }

    fn find_by_name(&self, name: &str) -> RepoResult<Vec<Managed<Team>>> {
        self.find_managed_by(
            &Criteria::new().eq(TeamField::Name, name),
            &Sort::unsorted(),
        )
    }
}
