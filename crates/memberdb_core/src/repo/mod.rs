//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQL details from callers; callers speak criteria, sort and pages.
//!
//! # Invariants
//! - Every repository is bound to one unit of work and shares its identity map.
//! - Repository APIs return semantic errors (`NotFound`, `NonUniqueResult`,
//!   `ReferentialIntegrity`) in addition to DB transport errors.

pub mod crud_repo;
pub mod item_repo;
pub mod member_repo;
pub mod team_repo;
