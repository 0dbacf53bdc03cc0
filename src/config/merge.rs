// src/config/merge.rs

//! Layering partial documents over a base configuration.
//!
//! Mappings merge key by key, recursively. Everything else (scalars, and
//! lists such as `ent_embeddings`) is replaced wholesale by the override.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::model::{Config, RawDocument};
use crate::errors::{ConfigError, Result};

/// Merge `overrides` into `base`, returning a new document.
///
/// Key order follows `base`, with keys only present in `overrides` appended
/// in their override order.
pub fn merge_documents(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        if let (Some(Value::Object(existing)), Value::Object(incoming)) =
            (merged.get_mut(key), value)
        {
            let nested = merge_documents(existing, incoming);
            *existing = nested;
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Apply `overrides` on top of a validated config and validate the result.
///
/// An override can break a cross-field invariant that held in `base`
/// (a new `num_heads` against the old `hidden_size`), so this re-runs the
/// full schema check.
pub fn merge(base: &Config, overrides: &RawDocument) -> Result<Config> {
    if overrides.0.is_empty() {
        return Ok(base.clone());
    }
    debug!(keys = overrides.0.len(), "merging override document");
    let merged = merge_documents(base.document(), &overrides.0);
    Config::try_from(RawDocument(merged))
}

impl Config {
    /// See [`merge`].
    pub fn merge(&self, overrides: &RawDocument) -> Result<Config> {
        merge(self, overrides)
    }
}

/// Parse a single `dotted.path=value` assignment into a partial document.
///
/// The value is read as JSON when possible (`0.01`, `true`, `[]`,
/// `{"a": 1}`), and as a plain string otherwise, so
/// `run_config.init_checkpoint=ckpt/best.pt` needs no quoting.
pub fn parse_assignment(assignment: &str) -> Result<RawDocument> {
    let invalid = || ConfigError::InvalidOverride(assignment.to_string());

    let (path, raw_value) = assignment.split_once('=').ok_or_else(invalid)?;
    let segments: Vec<&str> = path.trim().split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(invalid());
    }

    let raw_value = raw_value.trim();
    let mut value = serde_json::from_str::<Value>(raw_value)
        .unwrap_or_else(|_| Value::String(raw_value.to_string()));

    for segment in segments.iter().skip(1).rev() {
        let mut map = Map::new();
        map.insert(segment.trim().to_string(), value);
        value = Value::Object(map);
    }

    let mut root = Map::new();
    root.insert(segments[0].trim().to_string(), value);
    Ok(RawDocument(root))
}

/// Fold several assignments into one override document, later ones winning.
pub fn overrides_from_assignments<I, S>(assignments: I) -> Result<RawDocument>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    assignments
        .into_iter()
        .try_fold(RawDocument::default(), |acc, assignment| {
            let next = parse_assignment(assignment.as_ref())?;
            Ok(RawDocument(merge_documents(&acc.0, &next.0)))
        })
}
