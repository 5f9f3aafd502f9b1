//! Storage layer
//!
//! SQLite holds item records, their embeddings and the FTS5 index.

pub mod migrations;
pub mod sqlite;

pub use sqlite::Database;

use crate::core::{Item, ItemId};
use crate::error::Result;

/// Record retrieval the orchestrator hydrates results through.
pub trait ItemStore: Send + Sync {
    /// Items for `ids` in the same order; unknown ids are omitted.
    fn fetch_items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>>;

    /// A page of items ordered by name.
    fn fetch_all_items(&self, limit: usize, offset: usize) -> Result<Vec<Item>>;

    fn item_count(&self) -> Result<usize>;

    fn categories(&self) -> Result<Vec<String>>;

    fn items_in_category(&self, category: &str, limit: usize) -> Result<Vec<Item>>;
}
