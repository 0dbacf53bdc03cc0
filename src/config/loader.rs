// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::config::model::{Config, RawDocument};
use crate::config::validate::type_name;
use crate::errors::{ConfigError, ParseFailure, Result};

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "BOOTLEG_CONFIG";

/// Syntax of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    /// `.toml` files are TOML; anything else is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => DocumentFormat::Toml,
            _ => DocumentFormat::Json,
        }
    }
}

/// Parse document text into an unvalidated [`RawDocument`].
///
/// `origin` only labels errors (a file path, `"<string>"`, ...).
pub fn parse_document(text: &str, format: DocumentFormat, origin: &str) -> Result<RawDocument> {
    let parse_err = |source: ParseFailure| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    };

    let value = match format {
        DocumentFormat::Json => {
            serde_json::from_str::<Value>(text).map_err(|e| parse_err(e.into()))?
        }
        DocumentFormat::Toml => {
            let table: toml::Table = toml::from_str(text).map_err(|e| parse_err(e.into()))?;
            Value::Object(table_to_json(table, "").map_err(parse_err)?)
        }
    };

    match value {
        Value::Object(map) => Ok(RawDocument(map)),
        other => Err(parse_err(ParseFailure::NotAMapping(type_name(&other)))),
    }
}

/// Convert a TOML table into the JSON tree used everywhere else.
///
/// `nan`/`inf` are rejected here: JSON cannot hold them and they would
/// otherwise turn into `null`, which validation reads as "absent".
fn table_to_json(table: toml::Table, path: &str) -> std::result::Result<Map<String, Value>, ParseFailure> {
    table
        .into_iter()
        .map(|(key, value)| {
            let field = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}.{key}")
            };
            toml_to_json(value, &field).map(|v| (key, v))
        })
        .collect()
}

fn toml_to_json(value: toml::Value, path: &str) -> std::result::Result<Value, ParseFailure> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| ParseFailure::NonFiniteFloat(path.to_string()))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| toml_to_json(item, &format!("{path}[{i}]")))
                .collect::<std::result::Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(table_to_json(table, path)?),
    })
}

/// Load a document from a given path and return the raw `RawDocument`.
///
/// This only performs deserialization; it does **not** perform schema
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawDocument> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, bytes = contents.len(), "read config document");

    parse_document(&contents, DocumentFormat::from_path(path), &path.display().to_string())
}

/// Load a document from path and validate it.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads JSON (or TOML, by extension).
/// - Applies defaults for absent optional fields.
/// - Reports every schema violation at once.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<Config> {
    let raw = load_from_path(&path)?;
    let config = Config::try_from(raw)?;
    info!(path = ?path.as_ref(), "loaded config");
    Ok(config)
}

/// Resolve the config path used when none is given explicitly:
/// `$BOOTLEG_CONFIG` if set, otherwise `config.json` in the working directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

impl FromStr for Config {
    type Err = ConfigError;

    /// Parse and validate a JSON document held in memory.
    fn from_str(s: &str) -> Result<Self> {
        let raw = parse_document(s, DocumentFormat::Json, "<string>")?;
        Config::try_from(raw)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_and_validate(path)
    }

    /// Write the full document (unknown keys included), as TOML for `.toml`
    /// paths and pretty JSON otherwise, so [`Config::load`] reads it back.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = match DocumentFormat::from_path(path) {
            DocumentFormat::Json => {
                let mut text = self.to_json_pretty();
                text.push('\n');
                text
            }
            DocumentFormat::Toml => {
                toml::to_string_pretty(self.document()).map_err(|source| ConfigError::Serialize {
                    path: path.to_path_buf(),
                    source,
                })?
            }
        };
        fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "wrote config document");
        Ok(())
    }
}
