//! Error handling for invsearch.
//!
//! This module provides:
//! - [`InvError`]: The main error enum for all operations
//! - [`ErrorCode`]: Standardized error codes for machine parsing
//! - [`StructuredError`]: Error with code, suggestion and recoverability for robot output

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

/// Main error type for invsearch operations.
#[derive(Error, Debug)]
pub enum InvError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Search index error: {0}")]
    SearchIndex(#[from] tantivy::TantivyError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Lexical retrieval failed: {0}")]
    LexicalRetrieval(String),

    #[error("Embedding provider unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(i64),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

pub type Result<T> = std::result::Result<T, InvError>;

impl InvError {
    /// Map this error onto the numeric code taxonomy.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Database(_) | Self::Migration(_) => ErrorCode::StorageDatabase,
            Self::Io(_) => ErrorCode::StorageIo,
            Self::SearchIndex(_) => ErrorCode::SearchIndexError,
            Self::Json(_) | Self::Serialization(_) => ErrorCode::InternalSerialization,
            Self::Http(_) => ErrorCode::EmbeddingRequestFailed,
            Self::QueryParse(_) => ErrorCode::SearchQueryInvalid,
            Self::LexicalRetrieval(_) => ErrorCode::SearchLexicalFailed,
            Self::EmbeddingUnavailable(_) => ErrorCode::EmbeddingUnavailable,
            Self::Embedding(_) => ErrorCode::EmbeddingRequestFailed,
            Self::DimensionMismatch { .. } => ErrorCode::EmbeddingDimensionMismatch,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::Import(_) => ErrorCode::ImportInvalid,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
            Self::ValidationFailed(_) => ErrorCode::ValidationFailed,
            Self::NotImplemented(_) => ErrorCode::InternalNotImplemented,
        }
    }

    /// Extra machine-readable context for variants that carry structured data.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::DimensionMismatch { expected, actual } => Some(serde_json::json!({
                "expected": expected,
                "actual": actual,
            })),
            Self::ItemNotFound(id) => Some(serde_json::json!({ "item_id": id })),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from(self)
    }
}

/// Error payload emitted in robot mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: ErrorCode,
    pub numeric_code: u16,
    pub message: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub recoverable: bool,
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            numeric_code: code.numeric(),
            message: message.into(),
            suggestion: code.suggestion().to_string(),
            context: None,
            recoverable: code.is_recoverable(),
            category: code.category().to_string(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[E{}] {}", self.numeric_code, self.message)
    }
}

impl From<&InvError> for StructuredError {
    fn from(err: &InvError) -> Self {
        let structured = Self::new(err.code(), err.to_string());
        match err.context() {
            Some(context) => structured.with_context(context),
            None => structured,
        }
    }
}

impl From<InvError> for StructuredError {
    fn from(err: InvError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            InvError::QueryParse("bad".into()).code(),
            ErrorCode::SearchQueryInvalid
        );
        assert_eq!(InvError::ItemNotFound(7).code(), ErrorCode::ItemNotFound);
        assert_eq!(
            InvError::DimensionMismatch {
                expected: 4,
                actual: 3
            }
            .code(),
            ErrorCode::EmbeddingDimensionMismatch
        );
        assert_eq!(
            InvError::Config("x".into()).code(),
            ErrorCode::ConfigInvalid
        );
    }

    #[test]
    fn dimension_mismatch_message_and_context() {
        let err = InvError::DimensionMismatch {
            expected: 512,
            actual: 384,
        };
        assert_eq!(
            err.to_string(),
            "Embedding dimension mismatch: expected 512, got 384"
        );
        let ctx = err.context().unwrap();
        assert_eq!(ctx["expected"], 512);
        assert_eq!(ctx["actual"], 384);
    }

    #[test]
    fn structured_error_carries_code_and_suggestion() {
        let structured = InvError::MissingConfig("embedding.endpoint".into()).to_structured();
        assert_eq!(structured.code, ErrorCode::ConfigMissingRequired);
        assert_eq!(structured.numeric_code, 304);
        assert_eq!(structured.category, "config");
        assert!(!structured.suggestion.is_empty());
        assert!(structured.to_string().starts_with("[E304]"));
    }

    #[test]
    fn structured_error_serializes_screaming_snake_code() {
        let structured = InvError::ItemNotFound(42).to_structured();
        let json = serde_json::to_value(&structured).unwrap();
        assert_eq!(json["code"], "ITEM_NOT_FOUND");
        assert_eq!(json["context"]["item_id"], 42);
    }
}
