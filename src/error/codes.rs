//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Item errors
//! - 3xx: Config errors
//! - 4xx: Search errors
//! - 5xx: Embedding errors
//! - 6xx: Storage errors
//! - 8xx: Validation / import errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

/// Standardized error codes for robot mode output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// E101: Requested item id does not exist
    ItemNotFound,

    /// E302: Config file has invalid syntax or values
    ConfigInvalid,
    /// E304: Required config value is missing
    ConfigMissingRequired,

    /// E401: Search query has invalid syntax
    SearchQueryInvalid,
    /// E402: Lexical retriever failed even after the fallback query
    SearchLexicalFailed,
    /// E403: Full-text index could not be opened or queried
    SearchIndexError,

    /// E501: No embedding provider is configured
    EmbeddingUnavailable,
    /// E502: Embedding provider request failed
    EmbeddingRequestFailed,
    /// E503: Vector has the wrong dimensionality
    EmbeddingDimensionMismatch,

    /// E601: SQLite error
    StorageDatabase,
    /// E602: Filesystem error
    StorageIo,

    /// E801: Input failed validation
    ValidationFailed,
    /// E802: Import record is malformed
    ImportInvalid,

    /// E901: Serialization failure
    InternalSerialization,
    /// E902: Feature not available in this build
    InternalNotImplemented,
}

impl ErrorCode {
    #[must_use]
    pub const fn numeric(self) -> u16 {
        match self {
            Self::ItemNotFound => 101,
            Self::ConfigInvalid => 302,
            Self::ConfigMissingRequired => 304,
            Self::SearchQueryInvalid => 401,
            Self::SearchLexicalFailed => 402,
            Self::SearchIndexError => 403,
            Self::EmbeddingUnavailable => 501,
            Self::EmbeddingRequestFailed => 502,
            Self::EmbeddingDimensionMismatch => 503,
            Self::StorageDatabase => 601,
            Self::StorageIo => 602,
            Self::ValidationFailed => 801,
            Self::ImportInvalid => 802,
            Self::InternalSerialization => 901,
            Self::InternalNotImplemented => 902,
        }
    }

    #[must_use]
    pub const fn category(self) -> &'static str {
        match self.numeric() / 100 {
            1 => "item",
            3 => "config",
            4 => "search",
            5 => "embedding",
            6 => "storage",
            8 => "validation",
            _ => "internal",
        }
    }

    /// Whether the user can fix the problem without a code change.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(
            self,
            Self::InternalSerialization | Self::InternalNotImplemented
        )
    }

    #[must_use]
    pub const fn suggestion(self) -> &'static str {
        match self {
            Self::ItemNotFound => "Run `invs browse` to list existing item ids",
            Self::ConfigInvalid => "Check the config file with `invs config`",
            Self::ConfigMissingRequired => "Set the missing key in config.toml or via INVS_* env vars",
            Self::SearchQueryInvalid | Self::SearchLexicalFailed => {
                "Simplify the query to plain words"
            }
            Self::SearchIndexError => "Rebuild the full-text index with `invs index`",
            Self::EmbeddingUnavailable => "Set embedding.backend to `hash` or `http`",
            Self::EmbeddingRequestFailed => "Check that embedding.endpoint is reachable",
            Self::EmbeddingDimensionMismatch => {
                "Make embedding.dims match the provider and re-import"
            }
            Self::StorageDatabase => "Re-import the catalog or remove the database file",
            Self::StorageIo => "Check that the data root exists and is writable",
            Self::ValidationFailed => "Check the command arguments",
            Self::ImportInvalid => "Each import line must be a JSON object with at least `name`",
            Self::InternalSerialization | Self::InternalNotImplemented => {
                "Report this as a bug"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_numeric_ranges() {
        assert_eq!(ErrorCode::ItemNotFound.category(), "item");
        assert_eq!(ErrorCode::ConfigInvalid.category(), "config");
        assert_eq!(ErrorCode::SearchLexicalFailed.category(), "search");
        assert_eq!(ErrorCode::EmbeddingUnavailable.category(), "embedding");
        assert_eq!(ErrorCode::StorageIo.category(), "storage");
        assert_eq!(ErrorCode::ImportInvalid.category(), "validation");
        assert_eq!(ErrorCode::InternalSerialization.category(), "internal");
    }

    #[test]
    fn internal_errors_are_not_recoverable() {
        assert!(!ErrorCode::InternalNotImplemented.is_recoverable());
        assert!(ErrorCode::SearchQueryInvalid.is_recoverable());
    }
}
