//! Decision tree classifier used for product recommendation
//!
//! # Model Format
//!
//! Models are serialized as canonical JSON:
//!
//! ```json
//! {
//!   "class_count": 2,
//!   "feature_count": 10,
//!   "tree": {
//!     "nodes": [
//!       {"class":null,"counts":[3,2],"feature_idx":0,"id":0,"left":1,"right":2,"threshold":2},
//!       {"class":0,"counts":[3,0],"feature_idx":-1,"id":1,"left":-1,"right":-1,"threshold":0},
//!       {"class":1,"counts":[0,2],"feature_idx":-1,"id":2,"left":-1,"right":-1,"threshold":0}
//!     ]
//!   },
//!   "version": 1
//! }
//! ```
//!
//! # Usage
//!
//! ```rust
//! use advisor_core::tree::{ClassifierModel, DecisionTree, Node};
//!
//! let tree = DecisionTree::new(vec![
//!     Node::internal(0, 0, 2, 1, 2, vec![3, 2]),
//!     Node::leaf(1, vec![3, 0]),
//!     Node::leaf(2, vec![0, 2]),
//! ]);
//! let model = ClassifierModel::new(tree, 1, 2);
//!
//! assert_eq!(model.predict(&[1]).unwrap(), 0);
//! assert_eq!(model.predict(&[3]).unwrap(), 1);
//! ```

pub mod model;
pub mod node;

pub use model::{ClassifierModel, MODEL_FORMAT_VERSION};
pub use node::{majority_class, DecisionTree, Node};

use crate::serde_canon::CanonicalError;
use thiserror::Error;

/// Classifier model errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model validation failed: {0}")]
    ValidationFailed(String),

    #[error("Expected {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Canonical serialization error: {0}")]
    CanonicalError(#[from] CanonicalError),
}
