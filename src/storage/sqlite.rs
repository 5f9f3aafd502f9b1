//! SQLite database layer

use std::collections::HashMap;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::debug;

use crate::core::{Item, ItemId, NewItem};
use crate::error::{InvError, Result};
use crate::search::EmbeddingSource;
use crate::storage::{ItemStore, migrations};

const ITEM_COLUMNS: &str =
    "id, name, category, extra_data, image_file, thumb_file, embedding IS NOT NULL";

/// Bound parameters per `IN (...)` lookup.
const ID_CHUNK: usize = 500;

/// SQLite database wrapper for the item catalog
pub struct Database {
    conn: Mutex<Connection>,
    schema_version: u32,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database (for tests and benches)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema_version,
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        Ok(f(&conn)?)
    }

    /// Current schema version after migrations.
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn insert_item(&self, item: &NewItem) -> Result<ItemId> {
        let conn = self.conn.lock();
        insert_item_row(&conn, item)
    }

    /// Insert a batch in one transaction; returns ids in input order.
    pub fn insert_items(&self, items: &[NewItem]) -> Result<Vec<ItemId>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(insert_item_row(&tx, item)?);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// Delete every item and insert `items` in one transaction. The FTS index
    /// follows through the delete trigger.
    ///
    /// Returns the number removed and the new ids. On error nothing changes.
    pub fn replace_items(&self, items: &[NewItem]) -> Result<(usize, Vec<ItemId>)> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM items", [])?;
        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(insert_item_row(&tx, item)?);
        }
        tx.commit()?;
        debug!(removed, inserted = ids.len(), "replaced items");
        Ok((removed, ids))
    }

    /// Store or replace the embedding of an existing item.
    pub fn set_embedding(&self, id: ItemId, embedding: &[f32]) -> Result<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE items SET embedding = ? WHERE id = ?",
            params![encode_embedding(embedding), id],
        )?;
        if updated == 0 {
            return Err(InvError::ItemNotFound(id));
        }
        Ok(())
    }

    /// FTS5 match over `name`, `category` and `extra_data`.
    ///
    /// Returns `(id, rank)` best-first; FTS5 rank is negative-is-better.
    pub fn text_search(&self, query: &str, limit: usize) -> Result<Vec<(ItemId, f32)>> {
        let conn = self.conn.lock();
        let run = || -> rusqlite::Result<Vec<(ItemId, f32)>> {
            let mut stmt = conn.prepare(
                "SELECT rowid, rank FROM items_fts WHERE items_fts MATCH ? ORDER BY rank LIMIT ?",
            )?;
            let rows = stmt.query_map(params![query, limit as i64], |row| {
                Ok((row.get::<_, ItemId>(0)?, row.get::<_, f64>(1)? as f32))
            })?;
            rows.collect()
        };
        run().map_err(|err| InvError::LexicalRetrieval(format!("fts5 match {query:?}: {err}")))
    }

    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(item_from_row(row)?),
            None => Err(InvError::ItemNotFound(id)),
        }
    }

    /// Fetch items preserving the order of `ids`; unknown ids are omitted.
    pub fn fetch_items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.conn.lock();
        let mut by_id: HashMap<ItemId, Item> = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let mut stmt = conn.prepare(&format!(
                "SELECT {ITEM_COLUMNS} FROM items WHERE id IN ({placeholders})"
            ))?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), item_from_row)?;
            for row in rows {
                let item = row?;
                by_id.insert(item.id, item);
            }
        }

        // A repeated id is hydrated once per occurrence.
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Items ordered by name.
    pub fn fetch_all_items(&self, limit: usize, offset: usize) -> Result<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY name, id LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], item_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn item_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn embedding_count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE embedding IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Distinct non-empty categories, sorted.
    pub fn categories(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM items \
             WHERE category IS NOT NULL AND category != '' ORDER BY category",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Items in an exact category, ordered by name.
    pub fn items_in_category(&self, category: &str, limit: usize) -> Result<Vec<Item>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE category = ? ORDER BY name, id LIMIT ?"
        ))?;
        let rows = stmt.query_map(params![category, limit as i64], item_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Every stored `(id, vector)` pair, in id order.
    pub fn fetch_all_embeddings(&self) -> Result<Vec<(ItemId, Vec<f32>)>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, embedding FROM items WHERE embedding IS NOT NULL ORDER BY id")?;
        let mut rows = stmt.query([])?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let id: ItemId = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            results.push((id, decode_embedding(&blob)?));
        }
        Ok(results)
    }

    pub fn integrity_check(&self) -> Result<bool> {
        let conn = self.conn.lock();
        let result: String = conn.query_row("PRAGMA integrity_check;", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA mmap_size = 268435456;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }
}

impl ItemStore for Database {
    fn fetch_items_by_ids(&self, ids: &[ItemId]) -> Result<Vec<Item>> {
        Self::fetch_items_by_ids(self, ids)
    }

    fn fetch_all_items(&self, limit: usize, offset: usize) -> Result<Vec<Item>> {
        Self::fetch_all_items(self, limit, offset)
    }

    fn item_count(&self) -> Result<usize> {
        Self::item_count(self)
    }

    fn categories(&self) -> Result<Vec<String>> {
        Self::categories(self)
    }

    fn items_in_category(&self, category: &str, limit: usize) -> Result<Vec<Item>> {
        Self::items_in_category(self, category, limit)
    }
}

impl EmbeddingSource for Database {
    fn fetch_all_embeddings(&self) -> Result<Vec<(ItemId, Vec<f32>)>> {
        Self::fetch_all_embeddings(self)
    }
}

fn insert_item_row(conn: &Connection, item: &NewItem) -> Result<ItemId> {
    conn.execute(
        "INSERT INTO items (name, category, extra_data, image_file, thumb_file, embedding) \
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            item.name,
            item.category,
            item.extra_data(),
            item.image_file,
            item.thumb_file,
            item.embedding.as_deref().map(encode_embedding),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let extra: Option<String> = row.get(3)?;
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        extra: Item::parse_extra(extra.as_deref().unwrap_or_default()),
        image_file: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        thumb_file: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        has_embedding: row.get(6)?,
    })
}

/// Little-endian f32 blob.
pub fn encode_embedding(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(InvError::Serialization(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
