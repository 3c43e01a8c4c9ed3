//! Product Advisor Trainer CLI
//!
//! Deterministic offline trainer for producing reproducible advisor models.

use advisor_trainer::{
    ModelTrainer, SurveyDataset, TrainingOutcome, TrainingParams, TreeConfig, DEFAULT_ID_COLUMN,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "advisor-train")]
#[command(author = "Product Advisor Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Deterministic decision-tree trainer for the product advisor", long_about = None)]
struct Args {
    /// Input CSV survey (header row, answers, product in the last column)
    #[arg(short, long, default_value = "data/base-dados-atualizada.csv")]
    input: PathBuf,

    /// Output directory for model, encoders and manifest
    #[arg(short, long, default_value = "models")]
    output: PathBuf,

    /// Identifier column dropped before training (ignored if absent)
    #[arg(long, default_value = DEFAULT_ID_COLUMN)]
    id_column: String,

    /// Seed for fold shuffling and split tie-breaking
    #[arg(long, default_value = "42")]
    seed: i64,

    /// Number of stratified cross-validation folds
    #[arg(long, default_value = "5")]
    folds: usize,

    /// Skip cross-validation
    #[arg(long)]
    no_cv: bool,

    /// Maximum tree depth (unlimited when omitted)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Minimum samples required to split a node
    #[arg(long, default_value = "2")]
    min_samples_split: usize,

    /// Minimum samples per leaf
    #[arg(long, default_value = "1")]
    min_samples_leaf: usize,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Product Advisor Trainer v{}", env!("CARGO_PKG_VERSION"));
    info!("═══════════════════════════════════════════");

    // Load dataset
    info!("Loading dataset from: {}", args.input.display());
    let dataset = SurveyDataset::from_csv(&args.input, Some(&args.id_column))
        .with_context(|| format!("Failed to load dataset {}", args.input.display()))?;
    dataset.log_summary();

    let params = TrainingParams {
        tree: TreeConfig {
            max_depth: args.max_depth,
            min_samples_split: args.min_samples_split,
            min_samples_leaf: args.min_samples_leaf,
            seed: args.seed,
        },
        folds: (!args.no_cv).then_some(args.folds),
        seed: args.seed,
    };

    info!("Training configuration:");
    match params.tree.max_depth {
        Some(depth) => info!("  Max depth: {}", depth),
        None => info!("  Max depth: unlimited"),
    }
    info!("  Min samples to split: {}", params.tree.min_samples_split);
    info!("  Min samples per leaf: {}", params.tree.min_samples_leaf);
    info!("  Seed: {}", params.seed);

    // Train model
    info!("═══════════════════════════════════════════");
    info!("Starting training...");
    let outcome = ModelTrainer::new(params)
        .train(&dataset)
        .context("Training failed")?;

    report(&outcome);

    let manifest = outcome
        .save(&args.output, chrono::Utc::now().timestamp())
        .with_context(|| format!("Failed to save artifacts to {}", args.output.display()))?;

    info!("═══════════════════════════════════════════");
    info!("✓ Training completed successfully");
    info!("  Artifacts: {}", args.output.display());
    info!("  Model hash: {}", manifest.model_hash);
    info!("  Encoders hash: {}", manifest.encoders_hash);

    Ok(())
}

fn report(outcome: &TrainingOutcome) {
    if let Some(evaluation) = &outcome.evaluation {
        let cv = &evaluation.cross_validation;
        let folds: Vec<String> = cv
            .fold_accuracies
            .iter()
            .map(|a| format!("{:.1}%", a * 100.0))
            .collect();

        info!("Cross-validation ({} folds):", cv.fold_accuracies.len());
        info!("  Mean accuracy: {:.2}%", cv.mean() * 100.0);
        info!("  Std deviation: {:.2}%", cv.std_dev() * 100.0);
        info!("  Per fold: [{}]", folds.join(", "));
        info!("  Out-of-fold accuracy: {:.2}%", cv.accuracy * 100.0);
        info!("Confusion matrix (rows = actual, columns = predicted):\n{}", evaluation.confusion);
        info!("Classification report:\n{}", evaluation.report);
    }

    info!("Training accuracy: {:.2}%", outcome.training_accuracy * 100.0);
    info!("Decision tree:\n{}", outcome.tree_text());
}
