// src/config/mod.rs

//! Configuration loading, validation and merging.
//!
//! Responsibilities:
//! - Define the typed data model (`model.rs`).
//! - Load a document from disk or memory (`loader.rs`).
//! - Validate it against the schema, collecting all violations (`validate.rs`).
//! - Layer partial override documents on top of a base (`merge.rs`).

pub mod loader;
pub mod merge;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, parse_document, DocumentFormat,
};
pub use merge::{merge, merge_documents, overrides_from_assignments, parse_assignment};
pub use model::{
    Config, DataConfig, DatasetSpec, EmbeddingSpec, LoadClass, ModelConfig, RawDocument,
    RunConfig, Split, TrainConfig, WordEmbeddingSpec,
};
