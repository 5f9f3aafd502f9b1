//! Tantivy BM25 full-text search
//!
//! Alternative lexical backend to the store's FTS5 table. The index is
//! derived data: `invs index` rebuilds it from the store, and imports
//! rebuild it when this backend is configured.

use std::path::Path;

use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, PhrasePrefixQuery, PhraseQuery, Query, RegexQuery, TermQuery};
use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::{debug, info};

use crate::core::{Item, ItemId};
use crate::error::{InvError, Result};
use crate::search::expand::{LexicalTerm, parse_or_expression};
use crate::search::lexical::LexicalRetriever;
use crate::storage::ItemStore;

/// Items fetched per page while rebuilding.
const REBUILD_PAGE: usize = 1_000;

/// BM25 search index using Tantivy
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    // Field handles for fast access
    fields: Bm25Fields,
}

impl std::fmt::Debug for Bm25Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Index")
            .field("num_docs", &self.num_docs())
            .finish_non_exhaustive()
    }
}

/// Field handles for the BM25 schema
#[derive(Clone, Copy)]
struct Bm25Fields {
    id: Field,
    name: Field,
    category: Field,
    extra: Field,
}

impl Bm25Fields {
    const fn text(self) -> [Field; 3] {
        [self.name, self.category, self.extra]
    }
}

impl Bm25Index {
    /// Open or create a BM25 index at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = if path.join("meta.json").exists() {
            Index::open_in_dir(path)?
        } else {
            Index::create_in_dir(path, schema)?
        };

        // Manual reload: readers refresh on commit only
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        let writer = index.writer(50_000_000)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Open an in-memory index (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = Index::create_in_ram(schema);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer(15_000_000)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Index an item, replacing any previous document with the same id
    pub fn index_item(&self, item: &Item) -> Result<()> {
        let mut doc = TantivyDocument::new();
        doc.add_i64(self.fields.id, item.id);
        doc.add_text(self.fields.name, &item.name);
        doc.add_text(self.fields.category, &item.category);
        doc.add_text(self.fields.extra, item.extra_text());

        let writer = self.writer.lock();
        writer.delete_term(Term::from_field_i64(self.fields.id, item.id));
        writer.add_document(doc)?;
        Ok(())
    }

    pub fn index_items(&self, items: &[Item]) -> Result<usize> {
        for item in items {
            self.index_item(item)?;
        }
        Ok(items.len())
    }

    /// Commit pending changes and reload the reader
    pub fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.commit()?;
        drop(writer);

        self.reader.reload()?;
        Ok(())
    }

    pub fn delete_item(&self, id: ItemId) -> Result<()> {
        let writer = self.writer.lock();
        writer.delete_term(Term::from_field_i64(self.fields.id, id));
        Ok(())
    }

    /// Clear the entire index
    pub fn clear(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.delete_all_documents()?;
        writer.commit()?;
        drop(writer);

        self.reader.reload()?;
        Ok(())
    }

    /// Replace the index contents with every item in `store`.
    pub fn rebuild_from(&self, store: &dyn ItemStore) -> Result<usize> {
        {
            let writer = self.writer.lock();
            writer.delete_all_documents()?;
        }

        let mut offset = 0;
        loop {
            let page = store.fetch_all_items(REBUILD_PAGE, offset)?;
            if page.is_empty() {
                break;
            }
            self.index_items(&page)?;
            offset += page.len();
            debug!(indexed = offset, "bm25 rebuild progress");
        }

        self.commit()?;
        info!(docs = offset, "bm25 index rebuilt");
        Ok(offset)
    }

    /// Run an OR-expression (see [`crate::search::expand`]) against the index.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(ItemId, f32)>> {
        let terms = parse_or_expression(query)?;
        let Some(query) = self.build_query(&terms) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&query, &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            if let Some(id) = doc.get_first(self.fields.id).and_then(|v| v.as_i64()) {
                results.push((id, score));
            }
        }
        Ok(results)
    }

    /// Get total number of indexed documents
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs() == 0
    }

    /// Union of per-term, per-field clauses.
    fn build_query(&self, terms: &[LexicalTerm]) -> Option<Box<dyn Query>> {
        let mut clauses: Vec<Box<dyn Query>> = Vec::new();

        for term in terms {
            let words = term.words();
            for field in self.fields.text() {
                let field_terms: Vec<Term> = words
                    .iter()
                    .map(|w| Term::from_field_text(field, w))
                    .collect();
                match (field_terms.len(), term.prefix) {
                    (0, _) => {}
                    (1, false) => clauses.push(Box::new(TermQuery::new(
                        field_terms[0].clone(),
                        IndexRecordOption::WithFreqs,
                    ))),
                    (1, true) => {
                        let pattern = format!("{}.*", regex::escape(&words[0]));
                        if let Ok(query) = RegexQuery::from_pattern(&pattern, field) {
                            clauses.push(Box::new(query));
                        }
                    }
                    (_, false) => clauses.push(Box::new(PhraseQuery::new(field_terms))),
                    (_, true) => clauses.push(Box::new(PhrasePrefixQuery::new(field_terms))),
                }
            }
        }

        if clauses.is_empty() {
            None
        } else {
            Some(Box::new(BooleanQuery::union(clauses)))
        }
    }
}

impl LexicalRetriever for Bm25Index {
    fn name(&self) -> &'static str {
        "tantivy"
    }

    fn retrieve(&self, query: &str, limit: usize) -> Result<Vec<(ItemId, f32)>> {
        self.search(query, limit)
    }
}

/// Build the Tantivy schema for item indexing
fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    // Positions are needed for phrase queries
    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_i64_field("id", INDEXED | STORED | FAST);
    builder.add_text_field("name", text_options.clone());
    builder.add_text_field("category", text_options.clone());
    builder.add_text_field("extra", text_options);

    builder.build()
}

/// Extract field handles from schema
fn extract_fields(schema: &Schema) -> Result<Bm25Fields> {
    let field = |name: &str| {
        schema.get_field(name).map_err(|_| {
            InvError::SearchIndex(tantivy::TantivyError::SchemaError(format!(
                "missing {name} field"
            )))
        })
    };
    Ok(Bm25Fields {
        id: field("id")?,
        name: field("name")?,
        category: field("category")?,
        extra: field("extra")?,
    })
}
