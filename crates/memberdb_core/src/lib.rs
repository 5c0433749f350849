//! Member/team data-access core.
//!
//! Entities are persisted to SQLite through repositories bound to a
//! [`UnitOfWork`]; each unit of work keeps one managed instance per row.

pub mod auditing;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod projection;
pub mod query;
pub mod repo;
pub mod store;
pub mod uow;

pub use auditing::{AuditingHandler, AuditorAware, Clock, FixedAuditor, FixedClock, SystemClock};
pub use config::{ConfigError, StoreConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_timeout, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entity::{Entity, EntityField, Managed, Persistable, TransientEntityError};
pub use model::item::{Item, ItemField};
pub use model::member::{Member, MemberField, MemberId};
pub use model::team::{Team, TeamField, TeamId};
pub use projection::{
    MemberDto, MemberProjection, NestedClosedProjection, Projection, TeamInfo, UsernameAndAge,
    UsernameOnly, UsernameOnlyDto,
};
pub use query::criteria::{Criteria, Direction, Predicate, Sort};
pub use query::page::{Page, PageRequest, Slice};
pub use repo::crud_repo::{CrudRepository, RepoError, RepoResult, SqliteRepository};
pub use repo::item_repo::SqliteItemRepository;
pub use repo::member_repo::{
    BulkOptions, MemberRepository, MemberWithTeam, SqliteMemberRepository,
};
pub use repo::team_repo::{SqliteTeamRepository, TeamRepository};
pub use store::Store;
pub use uow::UnitOfWork;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
