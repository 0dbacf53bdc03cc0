// tests/cli_run.rs

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use bootleg_config::cli::CliArgs;
use bootleg_config::config::Config;
use bootleg_config::run;
use bootleg_config_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn example_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/bootleg_types.json")
}

#[test]
fn run_applies_merge_files_then_set_overrides() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let layer = dir.path().join("fast.json");
    std::fs::write(
        &layer,
        r#"{ "train_config": { "lr": 0.5, "batch_size": 8 }, "run_config": { "cpu": true } }"#,
    )?;
    let out = dir.path().join("effective.json");

    let args = CliArgs::try_parse_from([
        "bootleg-config".into(),
        "--config".into(),
        example_path().into_os_string(),
        "--merge".into(),
        layer.clone().into_os_string(),
        "--set".into(),
        "train_config.lr=0.01".into(),
        "--output".into(),
        out.clone().into_os_string(),
    ])?;
    run(args)?;

    let effective = Config::load(&out)?;
    assert_eq!(effective.train().lr, 0.01);
    assert_eq!(effective.train().batch_size, 8);
    assert!(effective.run().cpu);
    assert_eq!(effective.data().ent_embeddings.len(), 2);
    Ok(())
}

#[test]
fn run_fails_when_an_override_breaks_the_schema() -> TestResult {
    let args = CliArgs::try_parse_from([
        "bootleg-config",
        "--config",
        example_path().to_str().ok_or("utf-8 path")?,
        "--set",
        "train_config.dropout=2.0",
        "--print",
    ])?;

    let err = run(args).expect_err("dropout of 2.0 must be rejected");
    let msg = format!("{err:#}");
    assert!(msg.contains("train_config.dropout"), "{msg}");
    Ok(())
}
