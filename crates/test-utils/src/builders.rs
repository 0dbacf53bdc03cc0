// crates/test-utils/src/builders.rs

#![allow(dead_code)]

use serde_json::{json, Map, Value};
use bootleg_config::config::{Config, RawDocument};
use bootleg_config::errors::Result;

/// The example document shipped in `configs/`.
pub const EXAMPLE_DOCUMENT: &str = include_str!("../../../configs/bootleg_types.json");

/// Builder for config documents to simplify test setup.
///
/// Starts from the shipped example (or from nothing) and edits fields by
/// dotted path, so a test only spells out what it cares about.
pub struct DocumentBuilder {
    document: Map<String, Value>,
}

impl DocumentBuilder {
    /// Start from the valid example document.
    pub fn new() -> Self {
        let document = serde_json::from_str(EXAMPLE_DOCUMENT)
            .expect("shipped example document is valid JSON");
        Self { document }
    }

    /// Start from an empty document; handy for override layers.
    pub fn empty() -> Self {
        Self {
            document: Map::new(),
        }
    }

    /// Set `path` (e.g. `"train_config.lr"`), creating parents as needed.
    pub fn set(mut self, path: &str, value: Value) -> Self {
        let mut segments: Vec<&str> = path.split('.').collect();
        let last = segments.pop().expect("non-empty path");
        let mut map = &mut self.document;
        for segment in segments {
            let entry = map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            map = entry.as_object_mut().expect("just ensured object");
        }
        map.insert(last.to_string(), value);
        self
    }

    /// Remove `path` if present.
    pub fn remove(mut self, path: &str) -> Self {
        let segments: Vec<&str> = path.split('.').collect();
        remove_path(&mut self.document, &segments);
        self
    }

    /// Append an entry to `data_config.ent_embeddings`.
    pub fn with_embedding(mut self, key: &str, load_class: &str) -> Self {
        let entry = json!({ "key": key, "load_class": load_class, "freeze": false, "args": {} });
        let list = self
            .document
            .get_mut("data_config")
            .and_then(Value::as_object_mut)
            .expect("data_config present")
            .entry("ent_embeddings")
            .or_insert_with(|| Value::Array(vec![]));
        list.as_array_mut().expect("ent_embeddings is an array").push(entry);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.document).expect("document serializes")
    }

    pub fn build_raw(self) -> RawDocument {
        RawDocument(self.document)
    }

    pub fn try_build(self) -> Result<Config> {
        Config::try_from(self.build_raw())
    }

    pub fn build(self) -> Config {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

fn remove_path(map: &mut Map<String, Value>, segments: &[&str]) {
    match segments {
        [] => {}
        [last] => {
            map.remove(*last);
        }
        [first, rest @ ..] => {
            if let Some(next) = map.get_mut(*first).and_then(Value::as_object_mut) {
                remove_path(next, rest);
            }
        }
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
