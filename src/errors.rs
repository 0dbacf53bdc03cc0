// src/errors.rs

//! Crate-wide error types.
//!
//! Loading either fails to parse (`Parse`) or parses but violates the schema
//! (`Schema`). Schema failures carry every violation found, not just the
//! first one.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: ParseFailure,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("cannot write {path:?} as TOML: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("invalid override '{0}'")]
    InvalidOverride(String),
}

/// Why a document could not be read as hierarchical key-value data.
#[derive(Error, Debug)]
pub enum ParseFailure {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error("top-level value must be a mapping, found {0}")]
    NotAMapping(&'static str),

    #[error("{0}: non-finite float (nan/inf) has no JSON representation")]
    NonFiniteFloat(String),
}

/// Every field-level problem found while validating one document.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct SchemaError {
    violations: Vec<FieldViolation>,
}

impl SchemaError {
    pub(crate) fn new(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// True if any violation names `path` (exact match).
    pub fn mentions(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema error: {} violation(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

/// A single offending field and the constraint it breaks.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    /// Dotted path, e.g. `train_config.lr` or `data_config.ent_embeddings[1].key`.
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Missing,
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    /// The value could not be read as the field's type; carries the
    /// deserializer's message.
    Invalid(String),
    OutOfRange(String),
    DuplicateKey(String),
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{}: required field is missing", self.path),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "{}: expected {expected}, found {found}", self.path)
            }
            ViolationKind::Invalid(message) => write!(f, "{}: {message}", self.path),
            ViolationKind::OutOfRange(constraint) => {
                write!(f, "{}: must satisfy {constraint}", self.path)
            }
            ViolationKind::DuplicateKey(key) => {
                write!(f, "{}: duplicate key '{key}'", self.path)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
