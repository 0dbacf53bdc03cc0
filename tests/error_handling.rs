// tests/error_handling.rs

use std::io::Write;

use serde_json::json;
use tempfile::NamedTempFile;
use bootleg_config::config::{load_and_validate, Config};
use bootleg_config::errors::{ConfigError, ParseFailure, SchemaError, ViolationKind};
use bootleg_config_test_utils::builders::DocumentBuilder;

fn schema_error(result: Result<Config, ConfigError>) -> SchemaError {
    match result {
        Err(ConfigError::Schema(err)) => err,
        Err(e) => panic!("Expected Schema error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_json_returns_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{ "run_config": {{ "eval_batch_size": 32, }}"#).unwrap();

    match load_and_validate(file.path()) {
        Err(ConfigError::Parse { origin, source }) => {
            assert!(origin.contains(&file.path().display().to_string()));
            assert!(matches!(source, ParseFailure::Json(_)));
        }
        Err(e) => panic!("Expected Parse error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_top_level_array_is_not_hierarchical() {
    let result: Result<Config, _> = "[1, 2, 3]".parse();
    match result {
        Err(ConfigError::Parse {
            source: ParseFailure::NotAMapping(found),
            ..
        }) => assert_eq!(found, "array"),
        other => panic!("Expected NotAMapping, got: {:?}", other),
    }
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.json");
    match Config::load(&path) {
        Err(ConfigError::Io { path: p, .. }) => assert_eq!(p, path),
        other => panic!("Expected Io error, got: {:?}", other),
    }
}

#[test]
fn test_missing_lr_is_named() {
    let err = schema_error(DocumentBuilder::new().remove("train_config.lr").try_build());

    assert!(err.mentions("train_config.lr"));
    let v = &err.violations()[0];
    assert_eq!(v.kind, ViolationKind::Missing);
    assert!(err.to_string().contains("train_config.lr: required field is missing"));
}

#[test]
fn test_null_required_field_counts_as_missing() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("model_config.num_heads", json!(null))
            .try_build(),
    );
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].path, "model_config.num_heads");
    assert_eq!(err.violations()[0].kind, ViolationKind::Missing);
}

#[test]
fn test_missing_section_is_named() {
    let err = schema_error(DocumentBuilder::new().remove("model_config").try_build());
    assert!(err.mentions("model_config"));
}

#[test]
fn test_hidden_size_not_divisible_by_heads() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("model_config.hidden_size", json!(512))
            .set("model_config.num_heads", json!(7))
            .try_build(),
    );

    assert!(err.mentions("model_config.hidden_size"));
    let msg = err.to_string();
    assert!(msg.contains("model_config.num_heads"));
    assert!(msg.contains("512 % 7"));
}

#[test]
fn test_duplicate_embedding_key_is_named() {
    let err = schema_error(
        DocumentBuilder::new()
            .with_embedding("learned_type", "LearnedTypeEmb")
            .try_build(),
    );

    assert!(err.mentions("data_config.ent_embeddings"));
    assert!(err
        .violations()
        .iter()
        .any(|v| v.kind == ViolationKind::DuplicateKey("learned_type".to_string())));
    assert!(err.to_string().contains("duplicate key 'learned_type'"));
}

#[test]
fn test_negative_eval_batch_size_is_rejected_not_clamped() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("run_config.eval_batch_size", json!(-4))
            .try_build(),
    );
    assert!(err.mentions("run_config.eval_batch_size"));

    let err = schema_error(
        DocumentBuilder::new()
            .set("run_config.eval_batch_size", json!(0))
            .try_build(),
    );
    assert_eq!(
        err.violations()[0].kind,
        ViolationKind::OutOfRange("> 0".to_string())
    );
}

#[test]
fn test_ranges_on_train_config() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("train_config.dropout", json!(1.5))
            .set("train_config.lr", json!(0.0))
            .set("run_config.max_epochs", json!(0))
            .try_build(),
    );

    assert!(err.mentions("train_config.dropout"));
    assert!(err.mentions("train_config.lr"));
    assert!(err.mentions("run_config.max_epochs"));
}

#[test]
fn test_wrong_types_report_the_deserializer_message() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("train_config.batch_size", json!("32"))
            .set("run_config.cpu", json!("no"))
            .set("run_config.eval_slices", json!(["unif_all", 3]))
            .try_build(),
    );

    let message_of = |path: &str| match err.violations().iter().find(|v| v.path == path) {
        Some(v) => match &v.kind {
            ViolationKind::Invalid(msg) => msg.clone(),
            other => panic!("Expected Invalid for {path}, got: {:?}", other),
        },
        None => panic!("no violation for {path}"),
    };

    let batch = message_of("train_config.batch_size");
    assert!(batch.contains("invalid type") && batch.contains("usize"), "{batch}");
    let cpu = message_of("run_config.cpu");
    assert!(cpu.contains("invalid type") && cpu.contains("boolean"), "{cpu}");
    let slices = message_of("run_config.eval_slices");
    assert!(slices.contains("integer") && slices.contains("string"), "{slices}");
    assert_eq!(err.violations().len(), 3);
}

#[test]
fn test_fractional_float_in_integer_field_is_a_type_error() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("model_config.num_heads", json!(7.5))
            .try_build(),
    );
    assert_eq!(err.violations().len(), 1);
    match &err.violations()[0].kind {
        ViolationKind::Invalid(msg) => assert!(msg.contains("7.5"), "{msg}"),
        other => panic!("Expected Invalid, got: {:?}", other),
    }
}

/// The example document as TOML, with `field` set to the bare float `literal`.
fn toml_with_float(field: &str, literal: &str) -> String {
    let doc = DocumentBuilder::new().set(field, json!("FLOAT_LITERAL")).to_json();
    let value: serde_json::Value = serde_json::from_str(&doc).unwrap();
    toml::to_string(&value)
        .unwrap()
        .replace("\"FLOAT_LITERAL\"", literal)
}

#[test]
fn test_non_finite_toml_floats_are_rejected_not_defaulted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    for (field, literal) in [
        ("train_config.weight_decay", "nan"),
        ("train_config.softmax_temp", "-inf"),
        ("train_config.lr", "inf"),
    ] {
        std::fs::write(&path, toml_with_float(field, literal)).unwrap();
        match Config::load(&path) {
            Err(ConfigError::Parse {
                source: ParseFailure::NonFiniteFloat(at),
                ..
            }) => assert_eq!(at, field),
            other => panic!("Expected NonFiniteFloat for {field}, got: {:?}", other),
        }
    }

    // A finite value through the same path still loads.
    std::fs::write(&path, toml_with_float("train_config.weight_decay", "0.01")).unwrap();
    let cfg = Config::load(&path).unwrap();
    assert_eq!(cfg.train().weight_decay, 0.01);
}

#[test]
fn test_duplicate_key_reported_even_when_entry_is_incomplete() {
    let err = schema_error(
        DocumentBuilder::new()
            .set(
                "data_config.ent_embeddings",
                json!([
                    { "key": "learned_type", "load_class": "LearnedTypeEmb" },
                    { "key": "learned_type" }
                ]),
            )
            .try_build(),
    );

    assert!(err.mentions("data_config.ent_embeddings[1].load_class"));
    assert!(err
        .violations()
        .iter()
        .any(|v| v.path == "data_config.ent_embeddings"
            && v.kind == ViolationKind::DuplicateKey("learned_type".to_string())));
    assert_eq!(err.violations().len(), 2);
}

#[test]
fn test_all_violations_reported_together() {
    let err = schema_error(
        DocumentBuilder::new()
            .remove("train_config.lr")
            .remove("data_config.dev_dataset.slice_class")
            .set("model_config.num_heads", json!(7))
            .set("run_config.log_level", json!("chatty"))
            .set("data_config.ent_embeddings", json!([{ "key": "", "load_class": "X" }, 4]))
            .try_build(),
    );

    assert!(err.mentions("train_config.lr"));
    assert!(err.mentions("data_config.dev_dataset.slice_class"));
    assert!(err.mentions("model_config.hidden_size"));
    assert!(err.mentions("run_config.log_level"));
    assert!(err.mentions("data_config.ent_embeddings[0].key"));
    assert!(err.mentions("data_config.ent_embeddings[1]"));
    assert_eq!(err.violations().len(), 6);
}

#[test]
fn test_empty_load_class_is_rejected() {
    let err = schema_error(
        DocumentBuilder::new()
            .set("data_config.train_dataset.load_class", json!("  "))
            .try_build(),
    );
    assert!(err.mentions("data_config.train_dataset.load_class"));
}
