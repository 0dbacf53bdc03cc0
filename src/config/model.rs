// src/config/model.rs

use std::fmt;

use serde::Deserialize;
use serde_json::{Map, Value};

/// A parsed document that has not been validated yet.
///
/// This is the untyped tree exactly as it was read. Unknown keys live here
/// and are carried into the validated [`Config`] untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawDocument(pub Map<String, Value>);

impl RawDocument {
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// A validated configuration.
///
/// Mirrors a document like:
///
/// ```json
/// {
///   "run_config":   { "eval_batch_size": 32, "max_epochs": 1, ... },
///   "train_config": { "batch_size": 32, "lr": 0.0001, "dropout": 0.1, ... },
///   "model_config": { "hidden_size": 512, "num_heads": 16, ... },
///   "data_config":  { "ent_embeddings": [ ... ], "train_dataset": { ... }, ... }
/// }
/// ```
///
/// Construction goes through [`TryFrom<RawDocument>`], so holding a `Config`
/// means every invariant has been checked. Nothing in here is mutable.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    document: Map<String, Value>,
    run: RunConfig,
    train: TrainConfig,
    model: ModelConfig,
    data: DataConfig,
}

impl Config {
    pub(crate) fn new_unchecked(
        document: Map<String, Value>,
        run: RunConfig,
        train: TrainConfig,
        model: ModelConfig,
        data: DataConfig,
    ) -> Self {
        Self {
            document,
            run,
            train,
            model,
            data,
        }
    }

    pub fn run(&self) -> &RunConfig {
        &self.run
    }

    pub fn train(&self) -> &TrainConfig {
        &self.train
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    pub fn data(&self) -> &DataConfig {
        &self.data
    }

    /// The full document this config was built from, unknown keys included.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    pub fn to_raw(&self) -> RawDocument {
        RawDocument(self.document.clone())
    }

    pub fn to_json_pretty(&self) -> String {
        // A Map of Values always serializes.
        serde_json::to_string_pretty(&self.document).unwrap_or_default()
    }
}

/// Identifier of an implementation the training framework resolves by name
/// (e.g. `"LearnedTypeEmb"` or `"wiki_dataset.WikiDataset"`).
///
/// Deserializing rejects blank names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct LoadClass(String);

impl TryFrom<String> for LoadClass {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        if name.trim().is_empty() {
            return Err("class name must be non-empty".to_string());
        }
        Ok(Self(name))
    }
}

impl LoadClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `run_config` section: execution controls.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub cpu: bool,
    pub dataloader_threads: usize,
    pub dataset_threads: usize,
    /// Always > 0.
    pub eval_batch_size: usize,
    /// Slice names evaluated separately; the framework defines valid names.
    pub eval_slices: Vec<String>,
    pub eval_steps: usize,
    pub log_steps: usize,
    pub log_level: String,
    /// Always >= 1.
    pub max_epochs: usize,
    /// Fraction of the dev set evaluated, in (0, 1].
    pub perc_eval: f64,
    /// `-1` disables periodic saving.
    pub save_every_k_eval: i64,
    pub init_checkpoint: String,
    pub topk: usize,
    pub distributed: bool,
    pub ngpus_per_node: usize,
    pub result_label_file: String,
    pub result_emb_file: String,
}

impl RunConfig {
    /// Checkpoint to resume from; an empty string means none.
    pub fn init_checkpoint(&self) -> Option<&str> {
        if self.init_checkpoint.is_empty() {
            None
        } else {
            Some(&self.init_checkpoint)
        }
    }
}

/// `train_config` section: optimisation hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub batch_size: usize,
    /// Always > 0.
    pub lr: f64,
    /// Always within `[0, 1]`.
    pub dropout: f64,
    pub weight_decay: f64,
    pub seed: u64,
    pub softmax_temp: f64,
    pub slice_method: String,
    pub train_heads: Vec<String>,
    pub load_optimizer_from_ckpt: bool,
    pub random_nil: bool,
    pub random_nil_perc: f64,
}

/// `model_config` section: architecture sizing.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    /// Always a multiple of `num_heads`.
    pub hidden_size: usize,
    pub num_heads: usize,
    pub num_model_stages: usize,
    pub ff_inner_size: usize,
    pub attn_load_class: LoadClass,
    pub base_model_load_class: LoadClass,
    pub fix_entity_emb: bool,
}

impl ModelConfig {
    /// Width of a single attention head.
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_heads
    }
}

/// `data_config` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub data_dir: String,
    pub emb_dir: String,
    pub entity_dir: String,
    pub entity_map_dir: String,
    pub alias_cand_map: String,
    pub max_aliases: usize,
    pub max_word_token_len: usize,
    pub overwrite_preprocessed_data: bool,
    /// Keys are unique.
    pub ent_embeddings: Vec<EmbeddingSpec>,
    pub word_embedding: WordEmbeddingSpec,
    pub train_dataset: DatasetSpec,
    pub dev_dataset: DatasetSpec,
    pub test_dataset: DatasetSpec,
}

impl DataConfig {
    pub fn embedding(&self, key: &str) -> Option<&EmbeddingSpec> {
        self.ent_embeddings.iter().find(|e| e.key == key)
    }

    pub fn dataset(&self, split: Split) -> &DatasetSpec {
        match split {
            Split::Train => &self.train_dataset,
            Split::Dev => &self.dev_dataset,
            Split::Test => &self.test_dataset,
        }
    }
}

/// Dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Split {
    Train,
    Dev,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Dev, Split::Test];

    /// Key of this split's descriptor inside `data_config`.
    pub fn key(self) -> &'static str {
        match self {
            Split::Train => "train_dataset",
            Split::Dev => "dev_dataset",
            Split::Test => "test_dataset",
        }
    }
}

/// One entry of `data_config.ent_embeddings`.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingSpec {
    pub key: String,
    pub load_class: LoadClass,
    pub freeze: bool,
    /// Arguments for `load_class`; their meaning is up to the framework.
    pub args: Map<String, Value>,
}

/// `data_config.word_embedding`: the contextual word encoder.
#[derive(Debug, Clone, PartialEq)]
pub struct WordEmbeddingSpec {
    pub load_class: LoadClass,
    pub sent_class: LoadClass,
    pub cache_dir: String,
    pub freeze_word_emb: bool,
    pub freeze_sent_emb: bool,
    pub layers: usize,
    pub use_lower_case: bool,
}

/// `data_config.{train,dev,test}_dataset`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSpec {
    pub file: String,
    pub load_class: LoadClass,
    pub slice_class: LoadClass,
    pub use_weak_label: bool,
}
