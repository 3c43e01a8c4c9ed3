//! Categorical encoding shared by training and serving
//!
//! Every answer cell goes through the same three steps at training time and
//! at inference time:
//!
//! 1. the static table ([`static_code`]) maps well-known answers to fixed
//!    integers, regardless of the column they appear in;
//! 2. categorical columns map the remaining strings through the fallback
//!    [`CategoryEncoder`] fitted on that column during training;
//! 3. numeric columns must parse the remaining strings as `i64`.
//!
//! A value that was never seen in a categorical column is reported as
//! [`CellCode::UnknownCategory`]; the caller picks an
//! [`UnknownCategoryPolicy`] to either reject it or substitute a sentinel.

pub mod category;
pub mod record;
pub mod state;
pub mod table;

pub use category::CategoryEncoder;
pub use record::Record;
pub use state::{ColumnEncoding, EncoderState, ENCODER_FORMAT_VERSION};
pub use table::{static_code, STATIC_CODES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of encoding a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellCode {
    /// The cell has an integer code
    Known(i64),
    /// Categorical column value never seen during training
    UnknownCategory(String),
}

/// What to do with a [`CellCode::UnknownCategory`] cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnknownCategoryPolicy {
    /// Fail the whole record with [`EncodeError::UnknownCategory`]
    #[default]
    Reject,
    /// Substitute the given value for the cell
    Sentinel(i64),
}

/// Errors raised while fitting or applying the encoders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unknown category {value:?} in column {column:?}")]
    UnknownCategory { column: String, value: String },

    #[error("value {value:?} in column {column:?} is not an integer")]
    NotInteger { column: String, value: String },

    #[error("missing answers: {}", .0.join(", "))]
    MissingAnswers(Vec<String>),

    #[error("record columns do not match the trained feature columns: {0}")]
    ColumnMismatch(String),

    #[error("column index {index} out of range ({count} feature columns)")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("unknown label {0:?}")]
    UnknownLabel(String),

    #[error("class index {index} out of range ({count} classes)")]
    ClassOutOfRange { index: usize, count: usize },

    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("invalid encoder state: {0}")]
    InvalidState(String),
}

pub type Result<T> = std::result::Result<T, EncodeError>;
