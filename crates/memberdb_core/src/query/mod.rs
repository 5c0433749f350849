//! Declarative query intents and their SQL execution.
//!
//! # Responsibility
//! - Model filters, sorting and paging independently of any entity.
//! - Execute them against SQLite and shape the results.
//!
//! # Invariants
//! - Query building never interpolates caller values into SQL text.

pub mod criteria;
pub mod executor;
pub mod page;
