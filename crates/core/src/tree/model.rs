//! Persisted classifier model
//!
//! Wraps a [`DecisionTree`] with the dimensions it was trained for and
//! handles canonical JSON persistence and BLAKE3 hashing.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::node::DecisionTree;
use super::ModelError;
use crate::serde_canon::{hash_canonical_hex, to_canonical_json};

/// Format version written into `model.json`
pub const MODEL_FORMAT_VERSION: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifierModel {
    /// Model format version (always 1 for now)
    pub version: i32,

    /// Number of encoded feature columns expected by `predict`
    pub feature_count: usize,

    /// Number of label classes
    pub class_count: usize,

    pub tree: DecisionTree,
}

impl ClassifierModel {
    pub fn new(tree: DecisionTree, feature_count: usize, class_count: usize) -> Self {
        Self {
            version: MODEL_FORMAT_VERSION,
            feature_count,
            class_count,
            tree,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.version != MODEL_FORMAT_VERSION {
            return Err(ModelError::ValidationFailed(format!(
                "Unsupported model version: {}",
                self.version
            )));
        }
        if self.feature_count == 0 || self.class_count == 0 {
            return Err(ModelError::ValidationFailed(format!(
                "Invalid dimensions: {} features, {} classes",
                self.feature_count, self.class_count
            )));
        }

        self.tree
            .validate(self.feature_count, self.class_count)
            .map_err(|e| ModelError::ValidationFailed(format!("Tree validation failed: {e}")))
    }

    /// Predict the class index of an encoded feature vector
    pub fn predict(&self, features: &[i64]) -> Result<usize, ModelError> {
        if features.len() != self.feature_count {
            return Err(ModelError::FeatureCount {
                expected: self.feature_count,
                actual: features.len(),
            });
        }
        self.tree.predict(features)
    }

    pub fn predict_batch(&self, rows: &[Vec<i64>]) -> Result<Vec<usize>, ModelError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Serialize model to canonical JSON (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> Result<String, ModelError> {
        Ok(to_canonical_json(self)?)
    }

    /// Compute model hash as hex string
    pub fn hash_hex(&self) -> Result<String, ModelError> {
        Ok(hash_canonical_hex(self)?)
    }

    /// Save model to JSON file with canonical serialization
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let json = self.to_canonical_json()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Parse and validate a model from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let model: ClassifierModel = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }

    /// Load model from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
