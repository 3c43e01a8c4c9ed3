//! Prediction service
//!
//! Owns the artifact bundle behind a single-initialization cell: the first
//! successful load wins and is never repeated, a failed load is retried on
//! the next call.

use std::collections::BTreeMap;
use std::path::PathBuf;

use advisor_core::{ArtifactBundle, ArtifactPaths, Record, UnknownCategoryPolicy};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::request::{PredictRequest, PredictResponse};

/// Summary returned by the health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub features: usize,
    pub classes: usize,
    pub model_hash: String,
}

#[derive(Debug)]
pub struct PredictionService {
    paths: ArtifactPaths,
    policy: UnknownCategoryPolicy,
    bundle: OnceCell<ArtifactBundle>,
}

impl PredictionService {
    /// Service that loads its artifacts from `artifact_dir` on first use
    pub fn new(artifact_dir: impl Into<PathBuf>, policy: UnknownCategoryPolicy) -> Self {
        Self {
            paths: ArtifactPaths::in_dir(artifact_dir),
            policy,
            bundle: OnceCell::new(),
        }
    }

    /// Service around an already loaded bundle
    pub fn from_bundle(bundle: ArtifactBundle, policy: UnknownCategoryPolicy) -> Self {
        Self {
            paths: ArtifactPaths::in_dir(PathBuf::new()),
            policy,
            bundle: OnceCell::with_value(bundle),
        }
    }

    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    pub fn is_loaded(&self) -> bool {
        self.bundle.get().is_some()
    }

    /// Loaded bundle, loading it now if needed
    pub fn bundle(&self) -> Result<&ArtifactBundle, ServiceError> {
        let bundle = self.bundle.get_or_try_init(|| {
            info!(dir = %self.paths.dir.display(), "loading artifacts");
            ArtifactBundle::load(&self.paths)
        })?;
        Ok(bundle)
    }

    pub fn model_info(&self) -> Result<ModelInfo, ServiceError> {
        let bundle = self.bundle()?;
        Ok(ModelInfo {
            features: bundle.encoders().feature_count(),
            classes: bundle.encoders().class_count(),
            model_hash: bundle.model_hash()?,
        })
    }

    /// Check that every question is answered, returning question → answer
    pub fn validate_request(&self, request: &PredictRequest) -> Result<BTreeMap<String, String>, ServiceError> {
        if request.is_empty() {
            return Err(ServiceError::EmptyRequest);
        }

        let missing = request.missing_questions();
        if !missing.is_empty() {
            return Err(ServiceError::MissingAnswers(missing));
        }

        Ok(request.answers_by_question())
    }

    /// Validate answers, encode them in trained column order and predict
    pub fn predict(&self, request: &PredictRequest) -> Result<PredictResponse, ServiceError> {
        let respostas = self.validate_request(request)?;
        let bundle = self.bundle()?;
        let record = Record::from_answers(bundle.encoders().feature_names(), &respostas)?;
        let prediction = bundle.predict(&record, self.policy)?;

        debug!(
            features = ?prediction.features,
            leaf_counts = ?prediction.leaf_counts,
            label = %prediction.label,
            "prediction"
        );

        Ok(PredictResponse {
            success: true,
            produto: prediction.label,
            respostas,
        })
    }
}
