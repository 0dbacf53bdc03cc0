// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::{Config, Split};
use crate::config::{default_config_path, load_and_validate, load_from_path, overrides_from_assignments};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - base config loading
/// - `--merge` documents, applied in order
/// - `--set` overrides, applied last
/// - output (summary, `--print`, `--output`)
pub fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading base config {config_path:?}"))?;

    for path in &args.merge {
        let overrides = load_from_path(path)?;
        cfg = cfg
            .merge(&overrides)
            .with_context(|| format!("applying override document {path:?}"))?;
        debug!(?path, "applied override document");
    }

    if !args.set.is_empty() {
        let overrides = overrides_from_assignments(&args.set)?;
        cfg = cfg.merge(&overrides).context("applying --set overrides")?;
        debug!(count = args.set.len(), "applied --set overrides");
    }

    if let Some(ref out) = args.output {
        cfg.write_to(out)?;
        info!(path = ?out, "wrote effective config");
    }

    if args.print {
        println!("{}", cfg.to_json_pretty());
    } else {
        print_summary(&cfg);
    }

    Ok(())
}

/// Human-readable overview of the effective config.
fn print_summary(cfg: &Config) {
    let run = cfg.run();
    let train = cfg.train();
    let model = cfg.model();
    let data = cfg.data();

    println!("bootleg-config: config is valid");
    println!(
        "  run: max_epochs = {}, eval_batch_size = {}, device = {}",
        run.max_epochs,
        run.eval_batch_size,
        if run.cpu { "cpu" } else { "gpu" }
    );
    if let Some(ckpt) = run.init_checkpoint() {
        println!("  run: init_checkpoint = {ckpt}");
    }
    println!(
        "  train: batch_size = {}, lr = {}, dropout = {}, seed = {}",
        train.batch_size, train.lr, train.dropout, train.seed
    );
    println!(
        "  model: {} (hidden_size = {}, num_heads = {}, head_dim = {}, stages = {})",
        model.attn_load_class,
        model.hidden_size,
        model.num_heads,
        model.head_dim(),
        model.num_model_stages
    );
    println!();

    println!("entity embeddings ({}):", data.ent_embeddings.len());
    for emb in &data.ent_embeddings {
        println!("  - {}", emb.key);
        println!("      load_class: {}", emb.load_class);
        if emb.freeze {
            println!("      freeze: true");
        }
        if !emb.args.is_empty() {
            let keys: Vec<&str> = emb.args.keys().map(String::as_str).collect();
            println!("      args: {keys:?}");
        }
    }

    println!("datasets:");
    for split in Split::ALL {
        let ds = data.dataset(split);
        println!(
            "  - {}: {} ({}, slices: {}, weak labels: {})",
            split.key(),
            ds.file,
            ds.load_class,
            ds.slice_class,
            ds.use_weak_label
        );
    }
}
