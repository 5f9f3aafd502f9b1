use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InvError, Result};

pub const DEFAULT_ROOT: &str = ".invs";
pub const ROOT_ENV: &str = "INVS_ROOT";
pub const CONFIG_ENV: &str = "INVS_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Defaults, then global file, then project file (or one explicit file),
    /// then `INVS_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(InvError::MissingConfig(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
            }
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document as a patch over the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| InvError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let search = &self.search;
        for (name, value) in [
            ("search.text_weight", search.text_weight),
            ("search.visual_weight", search.visual_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(InvError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if search.max_limit == 0 {
            return Err(InvError::Config("search.max_limit must be at least 1".into()));
        }
        if search.results_per_page == 0 {
            return Err(InvError::Config(
                "search.results_per_page must be at least 1".into(),
            ));
        }
        if search.lexical_overfetch == 0 || search.visual_overfetch == 0 {
            return Err(InvError::Config(
                "search overfetch factors must be at least 1".into(),
            ));
        }
        LexicalBackend::parse(&search.lexical_backend)?;

        match self.embedding.backend.as_str() {
            "none" | "off" | "" | "hash" => {}
            "http" => {
                if self.embedding.endpoint.trim().is_empty() {
                    return Err(InvError::MissingConfig(
                        "embedding.endpoint is required for the http backend".into(),
                    ));
                }
            }
            other => {
                return Err(InvError::Config(format!(
                    "unknown embedding backend {other} (expected none|hash|http)"
                )));
            }
        }
        if self.embedding.dims == 0 {
            return Err(InvError::Config("embedding.dims must be at least 1".into()));
        }
        Ok(())
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("invs/config.toml"))
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        Self::load_patch(&root.join("config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| InvError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| InvError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.store {
            self.store.merge(patch);
        }
        if let Some(patch) = patch.search {
            self.search.merge(patch);
        }
        if let Some(patch) = patch.embedding {
            self.embedding.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("INVS_STORE_DB_PATH") {
            self.store.db_path = Some(PathBuf::from(value));
        }
        if let Some(value) = env_string("INVS_STORE_INDEX_PATH") {
            self.store.index_path = Some(PathBuf::from(value));
        }

        if let Some(value) = env_f32("INVS_SEARCH_TEXT_WEIGHT")? {
            self.search.text_weight = value;
        }
        if let Some(value) = env_f32("INVS_SEARCH_VISUAL_WEIGHT")? {
            self.search.visual_weight = value;
        }
        if let Some(value) = env_usize("INVS_SEARCH_RESULTS_PER_PAGE")? {
            self.search.results_per_page = value;
        }
        if let Some(value) = env_usize("INVS_SEARCH_MAX_LIMIT")? {
            self.search.max_limit = value;
        }
        if let Some(value) = env_string("INVS_SEARCH_LEXICAL_BACKEND") {
            self.search.lexical_backend = value;
        }

        if let Some(value) = env_string("INVS_EMBEDDING_BACKEND") {
            self.embedding.backend = value;
        }
        if let Some(value) = env_u32("INVS_EMBEDDING_DIMS")? {
            self.embedding.dims = value;
        }
        if let Some(value) = env_string("INVS_EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = value;
        }
        if let Some(value) = env_u64("INVS_EMBEDDING_TIMEOUT_MS")? {
            self.embedding.timeout_ms = value;
        }

        if let Some(value) = env_bool("INVS_CACHE_WARM_ON_START") {
            self.cache.warm_on_start = value;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Defaults to `<root>/inventory.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Defaults to `<root>/index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn db_path(&self, root: &Path) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| root.join("inventory.db"))
    }

    pub fn index_path(&self, root: &Path) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| root.join("index"))
    }

    fn merge(&mut self, patch: StorePatch) {
        if let Some(value) = patch.db_path {
            self.db_path = Some(value);
        }
        if let Some(value) = patch.index_path {
            self.index_path = Some(value);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalBackend {
    Fts5,
    Tantivy,
}

impl LexicalBackend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "" | "fts5" | "sqlite" => Ok(Self::Fts5),
            "tantivy" | "bm25" => Ok(Self::Tantivy),
            other => Err(InvError::Config(format!(
                "unknown lexical backend {other} (expected fts5|tantivy)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub text_weight: f32,
    #[serde(default)]
    pub visual_weight: f32,
    #[serde(default)]
    pub results_per_page: usize,
    #[serde(default)]
    pub max_limit: usize,
    #[serde(default)]
    pub lexical_overfetch: usize,
    #[serde(default)]
    pub visual_overfetch: usize,
    #[serde(default)]
    pub lexical_backend: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text_weight: 0.4,
            visual_weight: 0.6,
            results_per_page: 60,
            max_limit: 200,
            lexical_overfetch: 5,
            visual_overfetch: 3,
            lexical_backend: "fts5".to_string(),
        }
    }
}

impl SearchConfig {
    fn merge(&mut self, patch: SearchPatch) {
        if let Some(value) = patch.text_weight {
            self.text_weight = value;
        }
        if let Some(value) = patch.visual_weight {
            self.visual_weight = value;
        }
        if let Some(value) = patch.results_per_page {
            self.results_per_page = value;
        }
        if let Some(value) = patch.max_limit {
            self.max_limit = value;
        }
        if let Some(value) = patch.lexical_overfetch {
            self.lexical_overfetch = value;
        }
        if let Some(value) = patch.visual_overfetch {
            self.visual_overfetch = value;
        }
        if let Some(value) = patch.lexical_backend {
            self.lexical_backend = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: String,
    #[serde(default)]
    pub dims: u32,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: "hash".to_string(),
            dims: 512,
            endpoint: String::new(),
            timeout_ms: 10_000,
        }
    }
}

impl EmbeddingConfig {
    fn merge(&mut self, patch: EmbeddingPatch) {
        if let Some(value) = patch.backend {
            self.backend = value;
        }
        if let Some(value) = patch.dims {
            self.dims = value;
        }
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.timeout_ms {
            self.timeout_ms = value;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub warm_on_start: bool,
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.warm_on_start {
            self.warm_on_start = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub store: Option<StorePatch>,
    pub search: Option<SearchPatch>,
    pub embedding: Option<EmbeddingPatch>,
    pub cache: Option<CachePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorePatch {
    pub db_path: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SearchPatch {
    pub text_weight: Option<f32>,
    pub visual_weight: Option<f32>,
    pub results_per_page: Option<usize>,
    pub max_limit: Option<usize>,
    pub lexical_overfetch: Option<usize>,
    pub visual_overfetch: Option<usize>,
    pub lexical_backend: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EmbeddingPatch {
    pub backend: Option<String>,
    pub dims: Option<u32>,
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub warm_on_start: Option<bool>,
}

/// Resolve the data root: explicit flag, then `INVS_ROOT`, then `./.invs`.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| env_string(ROOT_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|value| {
        matches!(
            value.to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u32>().map(Some).map_err(|err| {
            InvError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|err| {
            InvError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<usize>().map(Some).map_err(|err| {
            InvError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<f32>().map(Some).map_err(|err| {
            InvError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}
