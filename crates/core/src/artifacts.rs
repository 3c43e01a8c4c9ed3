//! Persisted artifacts shared by the trainer and the prediction service
//!
//! An artifact directory holds:
//! - `model.json`: canonical JSON of the [`ClassifierModel`]
//! - `encoders.json`: canonical JSON of the [`EncoderState`]
//! - `manifest.json`: BLAKE3 hashes of both files plus training metadata
//! - `tree.txt`: diagnostic dump of the fitted tree
//!
//! The manifest is optional on load; when present both hashes must match.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::encoding::{EncodeError, EncoderState, Record, UnknownCategoryPolicy};
use crate::serde_canon::{hash_bytes_hex, to_canonical_json, CanonicalError};
use crate::tree::{ClassifierModel, ModelError};

pub const MODEL_FILE: &str = "model.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const TREE_FILE: &str = "tree.txt";

/// Format version written into `manifest.json`
pub const MANIFEST_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact not found: {0} (train a model first)")]
    Missing(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model: {0}")]
    Model(#[from] ModelError),

    #[error("invalid encoders: {0}")]
    Encoders(#[from] EncodeError),

    #[error("artifacts are inconsistent: {0}")]
    Inconsistent(String),

    #[error("hash mismatch for {path}: manifest has {expected}, file has {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("canonical serialization failed: {0}")]
    Canonical(#[from] CanonicalError),
}

#[derive(Error, Debug)]
pub enum PredictError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Locations of the artifact files inside one directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub encoders: PathBuf,
    pub manifest: PathBuf,
    /// Plain-text tree dump, never read back
    pub tree: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            model: dir.join(MODEL_FILE),
            encoders: dir.join(ENCODERS_FILE),
            manifest: dir.join(MANIFEST_FILE),
            tree: dir.join(TREE_FILE),
            dir,
        }
    }

    /// Both required files exist
    pub fn exists(&self) -> bool {
        self.model.exists() && self.encoders.exists()
    }
}

/// Training metadata and artifact hashes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    pub model_hash: String,
    pub encoders_hash: String,
    /// Unix timestamp (seconds) of the training run
    pub trained_at: i64,
    pub sample_count: usize,
    pub training_accuracy: f64,
}

/// Training metadata recorded in the manifest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingMetadata {
    pub trained_at: i64,
    pub sample_count: usize,
    pub training_accuracy: f64,
}

/// A single prediction decoded back to its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub features: Vec<i64>,
    /// Training class counts at the leaf that decided the prediction
    pub leaf_counts: Vec<u32>,
}

/// Fitted model plus the encoders it was trained with
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    model: ClassifierModel,
    encoders: EncoderState,
}

impl ArtifactBundle {
    /// Pair a model with its encoders, checking that their dimensions agree
    pub fn new(model: ClassifierModel, encoders: EncoderState) -> Result<Self, ArtifactError> {
        model.validate()?;
        encoders.validate()?;

        if model.feature_count != encoders.feature_count() {
            return Err(ArtifactError::Inconsistent(format!(
                "model expects {} features, encoders define {}",
                model.feature_count,
                encoders.feature_count()
            )));
        }
        if model.class_count != encoders.class_count() {
            return Err(ArtifactError::Inconsistent(format!(
                "model has {} classes, label encoder has {}",
                model.class_count,
                encoders.class_count()
            )));
        }

        Ok(Self { model, encoders })
    }

    pub fn model(&self) -> &ClassifierModel {
        &self.model
    }

    pub fn encoders(&self) -> &EncoderState {
        &self.encoders
    }

    pub fn model_hash(&self) -> Result<String, ArtifactError> {
        Ok(self.model.hash_hex()?)
    }

    /// Encode a record, run the tree and decode the predicted label
    pub fn predict(
        &self,
        record: &Record,
        policy: UnknownCategoryPolicy,
    ) -> Result<Prediction, PredictError> {
        let features = self.encoders.encode_record(record, policy)?;
        let class_index = self.model.predict(&features)?;
        let leaf_counts = self.model.tree.predict_counts(&features)?.to_vec();
        let label = self.encoders.decode_label(class_index)?.to_string();

        Ok(Prediction {
            class_index,
            label,
            features,
            leaf_counts,
        })
    }

    /// Write model, encoders and manifest into `paths.dir`
    ///
    /// Each file is written to a temporary sibling and renamed into place.
    /// The manifest goes last, so a run interrupted halfway leaves the
    /// previous manifest behind and the next load fails its hash check
    /// instead of serving a mix of old and new files.
    pub fn save(
        &self,
        paths: &ArtifactPaths,
        metadata: TrainingMetadata,
    ) -> Result<ArtifactManifest, ArtifactError> {
        fs::create_dir_all(&paths.dir).map_err(|source| ArtifactError::Io {
            path: paths.dir.clone(),
            source,
        })?;

        let model_json = self.model.to_canonical_json()?;
        let encoders_json = to_canonical_json(&self.encoders)?;

        let manifest = ArtifactManifest {
            version: MANIFEST_FORMAT_VERSION,
            model_hash: hash_bytes_hex(model_json.as_bytes()),
            encoders_hash: hash_bytes_hex(encoders_json.as_bytes()),
            trained_at: metadata.trained_at,
            sample_count: metadata.sample_count,
            training_accuracy: metadata.training_accuracy,
        };
        let manifest_json = serde_json::to_string_pretty(&manifest).map_err(|source| ArtifactError::Parse {
            path: paths.manifest.clone(),
            source,
        })?;

        write_file(&paths.model, &model_json)?;
        write_file(&paths.encoders, &encoders_json)?;
        write_file(&paths.manifest, &manifest_json)?;

        info!(dir = %paths.dir.display(), model_hash = %manifest.model_hash, "artifacts saved");
        Ok(manifest)
    }

    /// Load and cross-check the artifacts in `paths.dir`
    pub fn load(paths: &ArtifactPaths) -> Result<Self, ArtifactError> {
        let model_json = read_file(&paths.model)?;
        let encoders_json = read_file(&paths.encoders)?;

        if paths.manifest.exists() {
            let manifest: ArtifactManifest = parse_json(&paths.manifest, &read_file(&paths.manifest)?)?;
            verify_hash(&paths.model, &manifest.model_hash, &model_json)?;
            verify_hash(&paths.encoders, &manifest.encoders_hash, &encoders_json)?;
            debug!(trained_at = manifest.trained_at, "artifact hashes verified");
        }

        let model: ClassifierModel = parse_json(&paths.model, &model_json)?;
        let encoders: EncoderState = parse_json(&paths.encoders, &encoders_json)?;

        let bundle = Self::new(model, encoders)?;
        info!(
            dir = %paths.dir.display(),
            features = bundle.encoders.feature_count(),
            classes = bundle.encoders.class_count(),
            "artifacts loaded"
        );
        Ok(bundle)
    }
}

fn read_file(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArtifactError::Missing(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), ArtifactError> {
    let tmp = temp_path(path);
    fs::write(&tmp, contents).map_err(|source| ArtifactError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// `model.json` -> `model.json.tmp`, in the same directory so the rename stays atomic
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path, json: &str) -> Result<T, ArtifactError> {
    serde_json::from_str(json).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn verify_hash(path: &Path, expected: &str, contents: &str) -> Result<(), ArtifactError> {
    let actual = hash_bytes_hex(contents.as_bytes());
    if actual != expected {
        return Err(ArtifactError::HashMismatch {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
