// src/config/validate.rs

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::model::{
    Config, DataConfig, DatasetSpec, EmbeddingSpec, LoadClass, ModelConfig, RawDocument,
    RunConfig, Split, TrainConfig, WordEmbeddingSpec,
};
use crate::errors::{ConfigError, FieldViolation, SchemaError, ViolationKind};
use crate::logging::parse_level_str;

impl TryFrom<RawDocument> for Config {
    type Error = ConfigError;

    /// Validate every section, collecting all violations before failing.
    fn try_from(raw: RawDocument) -> std::result::Result<Self, Self::Error> {
        let mut checker = Checker::default();
        let root = Scope::root(&raw.0);

        let run = checker
            .section(&root, "run_config")
            .and_then(|s| run_config(&mut checker, &s));
        let train = checker
            .section(&root, "train_config")
            .and_then(|s| train_config(&mut checker, &s));
        let model = checker
            .section(&root, "model_config")
            .and_then(|s| model_config(&mut checker, &s));
        let data = checker
            .section(&root, "data_config")
            .and_then(|s| data_config(&mut checker, &s));

        let violations = checker.violations;
        match (run, train, model, data) {
            (Some(run), Some(train), Some(model), Some(data)) if violations.is_empty() => {
                debug!("config document passed schema validation");
                Ok(Config::new_unchecked(raw.0, run, train, model, data))
            }
            _ => {
                warn!(count = violations.len(), "config document failed schema validation");
                Err(SchemaError::new(violations).into())
            }
        }
    }
}

/// A mapping inside the document plus the dotted path that leads to it.
struct Scope<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> Scope<'a> {
    fn root(map: &'a Map<String, Value>) -> Self {
        Self {
            path: String::new(),
            map,
        }
    }

    fn field(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<FieldViolation>,
}

impl Checker {
    fn report(&mut self, path: String, kind: ViolationKind) {
        self.violations.push(FieldViolation { path, kind });
    }

    fn ensure(&mut self, ok: bool, path: String, constraint: &str) {
        if !ok {
            self.report(path, ViolationKind::OutOfRange(constraint.to_string()));
        }
    }

    fn section<'a>(&mut self, parent: &Scope<'a>, key: &str) -> Option<Scope<'a>> {
        match parent.map.get(key) {
            Some(Value::Object(map)) => Some(Scope {
                path: parent.field(key),
                map,
            }),
            None | Some(Value::Null) => {
                self.report(parent.field(key), ViolationKind::Missing);
                None
            }
            Some(other) => {
                self.report(parent.field(key), wrong_type("object", other));
                None
            }
        }
    }

    /// Like [`Checker::section`], but an absent record reads as empty.
    fn optional_section<'a>(&mut self, parent: &Scope<'a>, key: &str) -> Option<Scope<'a>> {
        match parent.map.get(key) {
            None | Some(Value::Null) => Some(Scope {
                path: parent.field(key),
                map: empty_map(),
            }),
            Some(_) => self.section(parent, key),
        }
    }

    fn required<T: DeserializeOwned>(&mut self, scope: &Scope<'_>, key: &str) -> Option<T> {
        match scope.map.get(key) {
            None | Some(Value::Null) => {
                self.report(scope.field(key), ViolationKind::Missing);
                None
            }
            Some(value) => self.convert(scope, key, value),
        }
    }

    fn optional<T: DeserializeOwned>(&mut self, scope: &Scope<'_>, key: &str, default: T) -> T {
        match scope.map.get(key) {
            None | Some(Value::Null) => default,
            Some(value) => self.convert(scope, key, value).unwrap_or(default),
        }
    }

    fn convert<T: DeserializeOwned>(
        &mut self,
        scope: &Scope<'_>,
        key: &str,
        value: &Value,
    ) -> Option<T> {
        let value = integral_float_as_int(value).unwrap_or_else(|| value.clone());
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(err) => {
                self.report(scope.field(key), ViolationKind::Invalid(err.to_string()));
                None
            }
        }
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_type(expected: &'static str, found: &Value) -> ViolationKind {
    ViolationKind::WrongType {
        expected,
        found: type_name(found),
    }
}

/// Reads a float without a fractional part (`32.0`) as an integer, so
/// integer fields accept either form. Float fields take integers anyway.
fn integral_float_as_int(value: &Value) -> Option<Value> {
    match value.as_f64() {
        Some(f) if value.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
            Some(Value::from(f as i64))
        }
        _ => None,
    }
}

fn run_config(c: &mut Checker, s: &Scope<'_>) -> Option<RunConfig> {
    let eval_batch_size = c.required::<usize>(s, "eval_batch_size");
    let max_epochs = c.required::<usize>(s, "max_epochs");
    let eval_slices = c.required::<Vec<String>>(s, "eval_slices");
    let perc_eval = c.optional(s, "perc_eval", 1.0);
    let save_every_k_eval = c.optional::<i64>(s, "save_every_k_eval", -1);
    let topk = c.optional::<usize>(s, "topk", 5);
    let ngpus_per_node = c.optional::<usize>(s, "ngpus_per_node", 1);
    let log_level = c.optional(s, "log_level", "info".to_string());
    let cpu = c.optional(s, "cpu", false);
    let dataloader_threads = c.optional::<usize>(s, "dataloader_threads", 16);
    let dataset_threads = c.optional::<usize>(s, "dataset_threads", 48);
    let eval_steps = c.optional::<usize>(s, "eval_steps", 5000);
    let log_steps = c.optional::<usize>(s, "log_steps", 50);
    let init_checkpoint = c.optional(s, "init_checkpoint", String::new());
    let distributed = c.optional(s, "distributed", false);
    let result_label_file = c.optional(s, "result_label_file", "bootleg_labels.jsonl".to_string());
    let result_emb_file = c.optional(s, "result_emb_file", "bootleg_embs.npy".to_string());

    if let Some(n) = eval_batch_size {
        c.ensure(n > 0, s.field("eval_batch_size"), "> 0");
    }
    if let Some(n) = max_epochs {
        c.ensure(n >= 1, s.field("max_epochs"), ">= 1");
    }
    c.ensure(
        perc_eval > 0.0 && perc_eval <= 1.0,
        s.field("perc_eval"),
        "in (0, 1]",
    );
    c.ensure(
        save_every_k_eval == -1 || save_every_k_eval >= 1,
        s.field("save_every_k_eval"),
        "-1 or >= 1",
    );
    c.ensure(topk >= 1, s.field("topk"), ">= 1");
    c.ensure(ngpus_per_node >= 1, s.field("ngpus_per_node"), ">= 1");
    c.ensure(
        parse_level_str(&log_level).is_some(),
        s.field("log_level"),
        "one of error, warn, info, debug, trace",
    );

    Some(RunConfig {
        cpu,
        dataloader_threads,
        dataset_threads,
        eval_batch_size: eval_batch_size?,
        eval_slices: eval_slices?,
        eval_steps,
        log_steps,
        log_level,
        max_epochs: max_epochs?,
        perc_eval,
        save_every_k_eval,
        init_checkpoint,
        topk,
        distributed,
        ngpus_per_node,
        result_label_file,
        result_emb_file,
    })
}

fn train_config(c: &mut Checker, s: &Scope<'_>) -> Option<TrainConfig> {
    let batch_size = c.required::<usize>(s, "batch_size");
    let lr = c.required::<f64>(s, "lr");
    let dropout = c.required::<f64>(s, "dropout");
    let train_heads = c.required::<Vec<String>>(s, "train_heads");
    let weight_decay = c.optional(s, "weight_decay", 0.0);
    let softmax_temp = c.optional(s, "softmax_temp", 0.25);
    let random_nil_perc = c.optional(s, "random_nil_perc", 0.08);
    let seed = c.optional::<u64>(s, "seed", 1234);
    let slice_method = c.optional(s, "slice_method", "Normal".to_string());
    let load_optimizer_from_ckpt = c.optional(s, "load_optimizer_from_ckpt", true);
    let random_nil = c.optional(s, "random_nil", false);

    if let Some(n) = batch_size {
        c.ensure(n > 0, s.field("batch_size"), "> 0");
    }
    if let Some(lr) = lr {
        c.ensure(lr > 0.0 && lr.is_finite(), s.field("lr"), "> 0");
    }
    if let Some(p) = dropout {
        c.ensure((0.0..=1.0).contains(&p), s.field("dropout"), "in [0, 1]");
    }
    c.ensure(weight_decay >= 0.0, s.field("weight_decay"), ">= 0");
    c.ensure(softmax_temp > 0.0, s.field("softmax_temp"), "> 0");
    c.ensure(
        (0.0..=1.0).contains(&random_nil_perc),
        s.field("random_nil_perc"),
        "in [0, 1]",
    );

    Some(TrainConfig {
        batch_size: batch_size?,
        lr: lr?,
        dropout: dropout?,
        weight_decay,
        seed,
        softmax_temp,
        slice_method,
        train_heads: train_heads?,
        load_optimizer_from_ckpt,
        random_nil,
        random_nil_perc,
    })
}

fn model_config(c: &mut Checker, s: &Scope<'_>) -> Option<ModelConfig> {
    let hidden_size = c.required::<usize>(s, "hidden_size");
    let num_heads = c.required::<usize>(s, "num_heads");
    let num_model_stages = c.required::<usize>(s, "num_model_stages");
    let ff_inner_size = c.required::<usize>(s, "ff_inner_size");
    let attn_load_class = c.required::<LoadClass>(s, "attn_load_class");
    let base_model_load_class =
        c.optional(s, "base_model_load_class", LoadClass::new("model.Model"));
    let fix_entity_emb = c.optional(s, "fix_entity_emb", false);

    if let Some(n) = hidden_size {
        c.ensure(n > 0, s.field("hidden_size"), "> 0");
    }
    if let Some(n) = num_heads {
        c.ensure(n > 0, s.field("num_heads"), "> 0");
    }
    if let (Some(hidden), Some(heads)) = (hidden_size, num_heads) {
        if heads > 0 && hidden % heads != 0 {
            c.report(
                s.field("hidden_size"),
                ViolationKind::OutOfRange(format!(
                    "divisible by {} ({hidden} % {heads} = {})",
                    s.field("num_heads"),
                    hidden % heads
                )),
            );
        }
    }
    if let Some(n) = num_model_stages {
        c.ensure(n >= 1, s.field("num_model_stages"), ">= 1");
    }
    if let Some(n) = ff_inner_size {
        c.ensure(n > 0, s.field("ff_inner_size"), "> 0");
    }

    Some(ModelConfig {
        hidden_size: hidden_size?,
        num_heads: num_heads?,
        num_model_stages: num_model_stages?,
        ff_inner_size: ff_inner_size?,
        attn_load_class: attn_load_class?,
        base_model_load_class,
        fix_entity_emb,
    })
}

fn data_config(c: &mut Checker, s: &Scope<'_>) -> Option<DataConfig> {
    let data_dir = c.required::<String>(s, "data_dir");
    let emb_dir = c.required::<String>(s, "emb_dir");
    let entity_dir = c.required::<String>(s, "entity_dir");
    let entity_map_dir = c.required::<String>(s, "entity_map_dir");
    let alias_cand_map = c.required::<String>(s, "alias_cand_map");
    let max_aliases = c.required::<usize>(s, "max_aliases");
    let max_word_token_len = c.required::<usize>(s, "max_word_token_len");
    let overwrite_preprocessed_data = c.optional(s, "overwrite_preprocessed_data", false);

    if let Some(n) = max_aliases {
        c.ensure(n > 0, s.field("max_aliases"), "> 0");
    }
    if let Some(n) = max_word_token_len {
        c.ensure(n > 0, s.field("max_word_token_len"), "> 0");
    }

    let ent_embeddings = ent_embeddings(c, s);
    let word_embedding = c
        .optional_section(s, "word_embedding")
        .and_then(|w| word_embedding(c, &w));

    let [train_dataset, dev_dataset, test_dataset] =
        Split::ALL.map(|split| c.section(s, split.key()).and_then(|d| dataset_spec(c, &d)));

    Some(DataConfig {
        data_dir: data_dir?,
        emb_dir: emb_dir?,
        entity_dir: entity_dir?,
        entity_map_dir: entity_map_dir?,
        alias_cand_map: alias_cand_map?,
        max_aliases: max_aliases?,
        max_word_token_len: max_word_token_len?,
        overwrite_preprocessed_data,
        ent_embeddings: ent_embeddings?,
        word_embedding: word_embedding?,
        train_dataset: train_dataset?,
        dev_dataset: dev_dataset?,
        test_dataset: test_dataset?,
    })
}

fn ent_embeddings(c: &mut Checker, s: &Scope<'_>) -> Option<Vec<EmbeddingSpec>> {
    let path = s.field("ent_embeddings");
    let items = match s.map.get("ent_embeddings") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => {
            c.report(path, ViolationKind::Missing);
            return None;
        }
        Some(other) => {
            c.report(path, wrong_type("array", other));
            return None;
        }
    };

    if items.is_empty() {
        c.report(
            path.clone(),
            ViolationKind::OutOfRange("at least one entity embedding".to_string()),
        );
    }

    let mut specs = Vec::with_capacity(items.len());
    let mut seen = HashSet::new();
    let mut complete = true;

    for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let Some(map) = item.as_object() else {
            c.report(item_path, wrong_type("object", item));
            complete = false;
            continue;
        };
        // Uniqueness is checked on the raw key, so an entry that is broken
        // elsewhere still counts towards duplicates.
        if let Some(key) = map.get("key").and_then(Value::as_str) {
            if !seen.insert(key) {
                c.report(path.clone(), ViolationKind::DuplicateKey(key.to_string()));
            }
        }
        let scope = Scope {
            path: item_path,
            map,
        };
        match embedding_spec(c, &scope) {
            Some(spec) => specs.push(spec),
            None => complete = false,
        }
    }

    complete.then_some(specs)
}

fn embedding_spec(c: &mut Checker, s: &Scope<'_>) -> Option<EmbeddingSpec> {
    let key = c.required::<String>(s, "key");
    let load_class = c.required::<LoadClass>(s, "load_class");
    let freeze = c.optional(s, "freeze", false);
    let args = c.optional(s, "args", Map::new());

    if let Some(ref k) = key {
        c.ensure(!k.trim().is_empty(), s.field("key"), "non-empty key");
    }

    Some(EmbeddingSpec {
        key: key?,
        load_class: load_class?,
        freeze,
        args,
    })
}

fn word_embedding(c: &mut Checker, s: &Scope<'_>) -> Option<WordEmbeddingSpec> {
    let layers = c.optional::<usize>(s, "layers", 1);
    c.ensure(layers >= 1, s.field("layers"), ">= 1");

    Some(WordEmbeddingSpec {
        load_class: c.optional(s, "load_class", LoadClass::new("BERTWordEmbedding")),
        sent_class: c.optional(s, "sent_class", LoadClass::new("BERTSentEmbedding")),
        cache_dir: c.optional(s, "cache_dir", "pretrained_bert_models".to_string()),
        freeze_word_emb: c.optional(s, "freeze_word_emb", true),
        freeze_sent_emb: c.optional(s, "freeze_sent_emb", true),
        layers,
        use_lower_case: c.optional(s, "use_lower_case", false),
    })
}

fn dataset_spec(c: &mut Checker, s: &Scope<'_>) -> Option<DatasetSpec> {
    let file = c.required::<String>(s, "file");
    let load_class = c.required::<LoadClass>(s, "load_class");
    let slice_class = c.required::<LoadClass>(s, "slice_class");
    let use_weak_label = c.required::<bool>(s, "use_weak_label");

    if let Some(ref f) = file {
        c.ensure(!f.trim().is_empty(), s.field("file"), "non-empty file name");
    }

    Some(DatasetSpec {
        file: file?,
        load_class: load_class?,
        slice_class: slice_class?,
        use_weak_label: use_weak_label?,
    })
}
