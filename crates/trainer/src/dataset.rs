//! CSV survey loading
//!
//! Reads the questionnaire export: a header row, one row per respondent,
//! an optional identifier column, the answer columns and finally the
//! recommended product as the label column. Values are kept as raw strings;
//! encoding happens later through the shared encoder.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::ReaderBuilder;
use tracing::{debug, info};

use crate::errors::DatasetError;

/// Identifier column dropped by default
pub const DEFAULT_ID_COLUMN: &str = "Perguntas";

/// Training dataset with raw categorical answers and labels
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurveyDataset {
    pub feature_names: Vec<String>,
    pub label_name: String,
    pub rows: Vec<Vec<String>>,
    pub labels: Vec<String>,
}

impl SurveyDataset {
    /// Load dataset from CSV file
    ///
    /// `id_column` is removed when present and ignored otherwise.
    pub fn from_csv<P: AsRef<Path>>(path: P, id_column: Option<&str>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                DatasetError::NotFound(path.to_path_buf())
            } else {
                DatasetError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let dataset = Self::from_reader(file, id_column)?;
        debug!(path = %path.display(), rows = dataset.len(), "dataset loaded");
        Ok(dataset)
    }

    /// Parse CSV text with a header row
    pub fn from_reader<R: Read>(reader: R, id_column: Option<&str>) -> Result<Self, DatasetError> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let id_idx = id_column.and_then(|id| headers.iter().position(|h| h == id));

        let kept: Vec<usize> = (0..headers.len()).filter(|&i| Some(i) != id_idx).collect();
        if kept.len() < 2 {
            return Err(DatasetError::TooFewColumns(kept.len()));
        }
        let (label_idx, feature_idx) = match kept.split_last() {
            Some((&label, features)) => (label, features.to_vec()),
            None => return Err(DatasetError::TooFewColumns(0)),
        };

        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(feature_idx.iter().map(|&i| record[i].to_string()).collect());
            labels.push(record[label_idx].to_string());
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty);
        }

        Ok(Self {
            feature_names: feature_idx.iter().map(|&i| headers[i].clone()).collect(),
            label_name: headers[label_idx].clone(),
            rows,
            labels,
        })
    }

    /// Get number of samples
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if dataset is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    /// Number of rows per label, sorted by label
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Log records, columns and the label distribution
    pub fn log_summary(&self) {
        info!(
            "Loaded {} records with {} feature columns",
            self.len(),
            self.feature_count()
        );
        for (i, name) in self.feature_names.iter().enumerate() {
            debug!("  Feature {}: {}", i, name);
        }
        info!("Label column: {}", self.label_name);
        for (label, count) in self.label_counts() {
            info!("  {}: {}", label, count);
        }
    }
}
