//! Application context wiring the store, providers and searcher together.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::{Cli, OutputFormat};
use crate::config::{self, Config, LexicalBackend};
use crate::error::Result;
use crate::search::{
    Bm25Index, EmbeddingCache, EmbeddingProvider, HybridSearcher, LexicalRetriever,
    SearchOptions, build_provider,
};
use crate::storage::Database;

pub struct AppContext {
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub config: Config,
    pub db: Arc<Database>,
    pub provider: Option<Arc<dyn EmbeddingProvider>>,
    pub cache: Arc<EmbeddingCache>,
    /// Present only when `search.lexical_backend = "tantivy"`.
    pub bm25: Option<Arc<Bm25Index>>,
    pub searcher: HybridSearcher,
    pub output_format: OutputFormat,
    pub verbosity: u8,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("root", &self.root)
            .field("config_path", &self.config_path)
            .field("output_format", &self.output_format)
            .field("searcher", &self.searcher)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let root = config::resolve_root(cli.root.as_deref());
        let config_path = cli
            .config
            .clone()
            .or_else(|| std::env::var(config::CONFIG_ENV).ok().map(PathBuf::from));
        let config = Config::load(config_path.as_deref(), &root)?;
        Self::build(root, config_path, config, cli.output_format(), cli.verbose)
    }

    /// Wire everything from an already loaded config.
    pub fn build(
        root: PathBuf,
        config_path: Option<PathBuf>,
        config: Config,
        output_format: OutputFormat,
        verbosity: u8,
    ) -> Result<Self> {
        let db = Arc::new(Database::open(config.store.db_path(&root))?);
        let provider = build_provider(&config.embedding)?;
        let cache = Arc::new(EmbeddingCache::new(
            db.clone(),
            provider.as_ref().map(|p| p.dims()),
        ));

        let (lexical, bm25): (Arc<dyn LexicalRetriever>, Option<Arc<Bm25Index>>) =
            match LexicalBackend::parse(&config.search.lexical_backend)? {
                LexicalBackend::Fts5 => (db.clone(), None),
                LexicalBackend::Tantivy => {
                    let index = Arc::new(Bm25Index::open(config.store.index_path(&root))?);
                    (index.clone(), Some(index))
                }
            };

        let searcher = HybridSearcher::new(
            db.clone(),
            lexical,
            provider.clone(),
            Arc::clone(&cache),
            SearchOptions::from(&config.search),
        );
        debug!(root = %root.display(), searcher = ?searcher, "app context ready");

        if config.cache.warm_on_start {
            let entries = searcher.warm()?;
            info!(entries, "embedding cache warmed on start");
        }

        Ok(Self {
            root,
            config_path,
            config,
            db,
            provider,
            cache,
            bm25,
            searcher,
            output_format,
            verbosity,
        })
    }

    pub const fn robot_mode(&self) -> bool {
        self.output_format.is_machine_readable()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_ref().map_or("none", |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(config: Config) -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = AppContext::build(
            dir.path().to_path_buf(),
            None,
            config,
            OutputFormat::Json,
            0,
        )
        .unwrap();
        (dir, ctx)
    }

    #[test]
    fn default_context_uses_fts5_and_hash_provider() {
        let (dir, ctx) = context(Config::default());
        assert!(ctx.bm25.is_none());
        assert_eq!(ctx.provider_name(), "hash");
        assert!(dir.path().join("inventory.db").exists());
        assert!(ctx.robot_mode());
    }

    #[test]
    fn tantivy_backend_opens_index() {
        let mut config = Config::default();
        config.search.lexical_backend = "tantivy".to_string();
        let (dir, ctx) = context(config);
        assert!(ctx.bm25.is_some());
        assert!(dir.path().join("index").exists());
    }

    #[test]
    fn none_backend_has_no_provider() {
        let mut config = Config::default();
        config.embedding.backend = "none".to_string();
        let (_dir, ctx) = context(config);
        assert!(!ctx.searcher.has_provider());
        assert_eq!(ctx.provider_name(), "none");
    }

    #[test]
    fn warm_on_start_loads_cache() {
        let mut config = Config::default();
        config.cache.warm_on_start = true;
        let (_dir, ctx) = context(config);
        assert!(ctx.cache.is_loaded());
    }
}
