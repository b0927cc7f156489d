use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use cv_common::embedding::{create_backend, BackendKind, EmbeddingConfig};
use cv_common::fields::DIFF_SECTIONS;
use cv_common::logging::{init_tracing_subscriber, install_tracing_panic_hook};
use cv_common::matching::{
    compare_all, BatchComparison, ComparisonConfig, ComparisonEngine, NamedProfile,
};
use cv_common::Profile;
use dotenvy::dotenv;
use serde::Serialize;
use tracing::{info, warn};

const APP_NAME: &str = "cv-compare";

#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about = "Compare extracted CV profiles pairwise")]
struct Cli {
    /// Profile JSON files (at least two)
    #[arg(required = true, num_args = 2..)]
    profiles: Vec<PathBuf>,

    /// Cosine similarity a term pair must exceed in the semantic tier
    #[arg(long, env = "CV_SEMANTIC_THRESHOLD")]
    threshold: Option<f32>,

    /// Embedding backend: hash, candle or none
    #[arg(long, env = "CV_EMBEDDER")]
    embedder: Option<BackendKind>,

    /// HuggingFace Hub model for the candle backend
    #[arg(long, env = "CV_EMBEDDING_MODEL")]
    model: Option<String>,

    /// Print the batch result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct JsonOutput<'a> {
    generated_at: DateTime<Utc>,
    backend: String,
    #[serde(flatten)]
    batch: &'a BatchComparison,
}

fn embedding_config(cli: &Cli) -> EmbeddingConfig {
    let mut config = EmbeddingConfig::from_env();
    if let Some(kind) = cli.embedder {
        config.backend = kind;
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    config
}

fn comparison_config(cli: &Cli) -> ComparisonConfig {
    let mut config = ComparisonConfig::from_env();
    if let Some(threshold) = cli.threshold {
        config.semantic_threshold = threshold;
    }
    config
}

fn load_profile(path: &Path) -> Result<NamedProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let profile = Profile::from_json_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(NamedProfile::new(name, profile))
}

/// Unreadable or invalid files are skipped; fewer than two survivors is an error.
fn load_profiles(paths: &[PathBuf]) -> Result<Vec<NamedProfile>> {
    let profiles: Vec<NamedProfile> = paths
        .iter()
        .filter_map(|path| match load_profile(path) {
            Ok(profile) => Some(profile),
            Err(err) => {
                warn!(path = %path.display(), error = %format!("{err:#}"), "skipping profile");
                None
            }
        })
        .collect();

    if profiles.len() < 2 {
        bail!(
            "need at least two valid profiles, got {} of {}",
            profiles.len(),
            paths.len()
        );
    }
    Ok(profiles)
}

fn render_text(batch: &BatchComparison) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{:<18} {:>8}", "Section", "Average");
    for row in &batch.section_averages {
        let _ = writeln!(out, "{:<18} {:>7.1}%", row.label, row.average * 100.0);
    }
    let _ = writeln!(out, "{:<18} {:>7.1}%", "Overall", batch.average_total * 100.0);

    let _ = writeln!(out, "\nItem counts:");
    for counts in &batch.item_counts {
        let cells: Vec<String> = counts
            .counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(field, n)| format!("{}={n}", field.label()))
            .collect();
        let _ = writeln!(out, "  {}: {}", counts.name, cells.join(", "));
    }

    for pair in &batch.pairs {
        let _ = writeln!(out, "\n=== {} ===", pair.label);
        for line in &pair.report {
            let _ = writeln!(out, "{line}");
        }
        for field in DIFF_SECTIONS {
            let Some(diff) = pair.diffs.get(&field) else {
                continue;
            };
            if diff.is_empty() {
                continue;
            }
            let _ = writeln!(out, "[{}]", field.label());
            let _ = writeln!(out, "  common: {}", diff.common.join(", "));
            let _ = writeln!(out, "  only {}: {}", pair.name_a, diff.only_a.join(", "));
            let _ = writeln!(out, "  only {}: {}", pair.name_b, diff.only_b.join(", "));
        }
    }

    for listing in &batch.listings {
        let _ = writeln!(out, "\n=== {} ===", listing.title);
        if listing.entries.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for entry in &listing.entries {
            let _ = writeln!(out, "  {}: {}", entry.name, entry.text);
        }
    }
    out
}

fn run() -> Result<()> {
    dotenv().ok();
    init_tracing_subscriber(APP_NAME);
    install_tracing_panic_hook(APP_NAME);

    let cli = Cli::parse();
    let profiles = load_profiles(&cli.profiles)?;

    let backend = create_backend(&embedding_config(&cli));
    let engine = ComparisonEngine::new(comparison_config(&cli), backend);
    info!(profiles = profiles.len(), "comparing profiles");

    let batch = compare_all(&engine, &profiles);

    if cli.json {
        let output = JsonOutput {
            generated_at: Utc::now(),
            backend: engine.backend().describe(),
            batch: &batch,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to serialize result")?
        );
    } else {
        print!("{}", render_text(&batch));
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{APP_NAME} failed: {err:#}");
        std::process::exit(1);
    }
}
