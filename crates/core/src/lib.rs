//! Advisor Core: shared building blocks of the product advisor.
//!
//! This crate holds everything the trainer and the prediction service must
//! agree on byte for byte: the categorical encoding pipeline, the decision
//! tree model, canonical JSON serialization and the persisted artifact
//! bundle.

pub mod artifacts;
pub mod encoding;
pub mod serde_canon;
pub mod tree;

pub use artifacts::{
    ArtifactBundle, ArtifactError, ArtifactManifest, ArtifactPaths, PredictError, Prediction,
    TrainingMetadata,
};
pub use encoding::{
    static_code, CategoryEncoder, CellCode, ColumnEncoding, EncodeError, EncoderState, Record,
    UnknownCategoryPolicy,
};
pub use serde_canon::{hash_bytes_hex, hash_canonical_hex, to_canonical_json, CanonicalError};
pub use tree::{ClassifierModel, DecisionTree, ModelError, Node};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
