//! Advisor Trainer - Deterministic offline decision-tree trainer
//!
//! Loads the survey CSV, fits the shared categorical encoders, grows a
//! Gini CART classifier and writes the artifacts the prediction service
//! loads. The same seed always produces byte-identical artifacts.

pub mod cart;
pub mod dataset;
pub mod deterministic;
pub mod errors;
pub mod evaluation;
pub mod trainer;

use std::path::Path;

pub use cart::{CartBuilder, TreeConfig};
pub use dataset::{SurveyDataset, DEFAULT_ID_COLUMN};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::{DatasetError, TrainerError};
pub use evaluation::{
    accuracy, cross_validate, stratified_folds, ClassMetrics, ClassificationReport, ConfusionMatrix,
    CrossValidation,
};
pub use trainer::{Evaluation, ModelTrainer, TrainingOutcome, TrainingParams};

/// Train a model directly from a CSV file using the provided parameters.
pub fn train_model_from_csv(
    path: &Path,
    id_column: Option<&str>,
    params: TrainingParams,
) -> Result<TrainingOutcome, TrainerError> {
    let dataset = SurveyDataset::from_csv(path, id_column)?;
    ModelTrainer::new(params).train(&dataset)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
