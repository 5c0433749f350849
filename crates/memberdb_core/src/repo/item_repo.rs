//! Item repository.
//!
//! Items carry caller-assigned keys, so `save` relies on `Item::is_new`
//! (creation time unset) rather than on id presence. A merge of an item only
//! checks that the row exists; no item column is mutable after insert.

use crate::model::item::Item;
use crate::repo::crud_repo::SqliteRepository;

pub type SqliteItemRepository<'uow, 'store> = SqliteRepository<'uow, 'store, Item>;
