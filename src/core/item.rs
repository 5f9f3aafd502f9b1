//! Catalog item records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Integer identity assigned by the store.
pub type ItemId = i64;

/// A catalog entry as hydrated from the store.
///
/// The embedding vector is deliberately absent: ranking only ever needs
/// `(id, vector)` pairs, which come from [`crate::search::EmbeddingCache`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    /// Opaque attribute blob, never interpreted by ranking.
    #[serde(default)]
    pub extra: Value,
    #[serde(default)]
    pub image_file: String,
    #[serde(default)]
    pub thumb_file: String,
    #[serde(default)]
    pub has_embedding: bool,
}

impl Item {
    /// Parse a stored `extra_data` column. Empty or invalid JSON becomes `{}`.
    #[must_use]
    pub fn parse_extra(raw: &str) -> Value {
        if raw.trim().is_empty() {
            return Value::Object(Map::new());
        }
        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => value,
            _ => Value::Object(Map::new()),
        }
    }

    /// Flatten `extra` into whitespace-joined text for full-text indexing.
    #[must_use]
    pub fn extra_text(&self) -> String {
        flatten_values(&self.extra)
    }
}

/// An item as supplied to ingestion, before it has an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub extra: Value,
    #[serde(default)]
    pub image_file: String,
    #[serde(default)]
    pub thumb_file: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl NewItem {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn image(mut self, image_file: impl Into<String>) -> Self {
        self.image_file = image_file.into();
        self
    }

    #[must_use]
    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Serialized `extra_data` column value (empty string for null / empty objects).
    #[must_use]
    pub fn extra_data(&self) -> String {
        match &self.extra {
            Value::Null => String::new(),
            Value::Object(map) if map.is_empty() => String::new(),
            other => other.to_string(),
        }
    }

    /// Text the full-text index sees for the `extra_data` column.
    #[must_use]
    pub fn extra_text(&self) -> String {
        flatten_values(&self.extra)
    }
}

fn flatten_values(value: &Value) -> String {
    let mut out = Vec::new();
    collect_strings(value, &mut out);
    out.join(" ")
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s.clone()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(values) => values.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => {
            for (key, v) in map {
                out.push(key.clone());
                collect_strings(v, out);
            }
        }
    }
}
