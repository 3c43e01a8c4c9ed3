use std::path::PathBuf;

use advisor_core::{ArtifactError, EncodeError, ModelError};
use thiserror::Error;

/// Errors raised while reading the survey dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("expected at least one feature column and a label column, found {0} column(s)")]
    TooFewColumns(usize),

    #[error("dataset has no rows")]
    Empty,
}

/// Errors returned by the deterministic trainer.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("training error: {0}")]
    Training(String),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
