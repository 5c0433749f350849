//! Entity model for members, teams and items.
//!
//! # Responsibility
//! - Define the persisted records and the metadata the repositories need to
//!   map them to SQL rows.
//! - Keep audit fields out of reach of application writes.
//!
//! # Invariants
//! - Every entity type maps to exactly one table.
//! - Generated identifiers are assigned only by the repository after insert.

pub mod audit;
pub mod entity;
pub mod item;
pub mod member;
pub mod team;
