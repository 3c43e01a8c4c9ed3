use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::category::CategoryEncoder;
use super::record::Record;
use super::table::static_code;
use super::{CellCode, EncodeError, Result, UnknownCategoryPolicy};

/// Format version written into `encoders.json`
pub const ENCODER_FORMAT_VERSION: u32 = 1;

/// How cells outside the static table are encoded for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnEncoding {
    /// Remaining cells must be integer literals; chosen only when the column
    /// had integer literals outside the static table at fit time
    Numeric,
    /// Remaining cells go through the fallback encoder fitted on this column,
    /// which is empty when every training answer was in the static table
    Categorical { fallback: CategoryEncoder },
}

/// Fitted encoder bundle persisted next to the model
///
/// Holds the ordered feature column names, one [`ColumnEncoding`] per
/// column and the label encoder. Immutable once fitted or loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderState {
    version: u32,
    feature_names: Vec<String>,
    columns: Vec<ColumnEncoding>,
    label_name: String,
    labels: CategoryEncoder,
}

impl EncoderState {
    /// Fit column encoders and the label encoder on raw training data
    pub fn fit(
        feature_names: Vec<String>,
        label_name: impl Into<String>,
        rows: &[Vec<String>],
        labels: &[String],
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(EncodeError::InvalidTrainingData("no rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(EncodeError::InvalidTrainingData(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        check_feature_names(&feature_names)?;

        for (i, row) in rows.iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(EncodeError::InvalidTrainingData(format!(
                    "row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    feature_names.len()
                )));
            }
        }

        let columns = (0..feature_names.len())
            .map(|col| {
                let leftovers: Vec<&str> = rows
                    .iter()
                    .map(|row| row[col].as_str())
                    .filter(|value| static_code(value).is_none())
                    .collect();

                // a column covered entirely by the static table stays categorical
                // with an empty fallback, so unseen answers are unknown categories
                if !leftovers.is_empty() && leftovers.iter().all(|value| value.parse::<i64>().is_ok()) {
                    ColumnEncoding::Numeric
                } else {
                    ColumnEncoding::Categorical {
                        fallback: CategoryEncoder::fit(leftovers),
                    }
                }
            })
            .collect();

        Ok(Self {
            version: ENCODER_FORMAT_VERSION,
            feature_names,
            columns,
            label_name: label_name.into(),
            labels: CategoryEncoder::fit(labels),
        })
    }

    /// Check structural invariants of a deserialized state
    pub fn validate(&self) -> Result<()> {
        if self.version != ENCODER_FORMAT_VERSION {
            return Err(EncodeError::InvalidState(format!(
                "unsupported encoder version {}",
                self.version
            )));
        }
        check_feature_names(&self.feature_names).map_err(|e| EncodeError::InvalidState(e.to_string()))?;

        if self.columns.len() != self.feature_names.len() {
            return Err(EncodeError::InvalidState(format!(
                "{} column encoders for {} feature columns",
                self.columns.len(),
                self.feature_names.len()
            )));
        }
        for (name, column) in self.feature_names.iter().zip(&self.columns) {
            if let ColumnEncoding::Categorical { fallback } = column {
                if !fallback.is_well_formed() {
                    return Err(EncodeError::InvalidState(format!(
                        "malformed fallback encoder for column {name:?}"
                    )));
                }
            }
        }
        if self.labels.is_empty() || !self.labels.is_well_formed() {
            return Err(EncodeError::InvalidState("malformed label encoder".to_string()));
        }
        Ok(())
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn columns(&self) -> &[ColumnEncoding] {
        &self.columns
    }

    pub fn label_name(&self) -> &str {
        &self.label_name
    }

    pub fn labels(&self) -> &CategoryEncoder {
        &self.labels
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn class_count(&self) -> usize {
        self.labels.len()
    }

    /// Encode one cell of the given column
    pub fn encode_cell(&self, column: usize, value: &str) -> Result<CellCode> {
        let encoding = self.columns.get(column).ok_or(EncodeError::ColumnOutOfRange {
            index: column,
            count: self.columns.len(),
        })?;

        if let Some(code) = static_code(value) {
            return Ok(CellCode::Known(code));
        }

        match encoding {
            ColumnEncoding::Categorical { fallback } => Ok(match fallback.transform(value) {
                Some(index) => CellCode::Known(index as i64),
                None => CellCode::UnknownCategory(value.to_string()),
            }),
            ColumnEncoding::Numeric => value.parse::<i64>().map(CellCode::Known).map_err(|_| {
                EncodeError::NotInteger {
                    column: self.feature_names[column].clone(),
                    value: value.to_string(),
                }
            }),
        }
    }

    /// Encode a record whose questions must match the trained columns in order
    pub fn encode_record(&self, record: &Record, policy: UnknownCategoryPolicy) -> Result<Vec<i64>> {
        if record.len() != self.feature_names.len() {
            return Err(EncodeError::ColumnMismatch(format!(
                "expected {} columns, got {}",
                self.feature_names.len(),
                record.len()
            )));
        }
        if let Some((expected, got)) = self
            .feature_names
            .iter()
            .zip(record.questions())
            .find(|(expected, got)| expected.as_str() != *got)
        {
            return Err(EncodeError::ColumnMismatch(format!(
                "expected {expected:?}, got {got:?}"
            )));
        }

        self.encode_values(record.answers(), policy)
    }

    /// Encode one raw training row, rejecting unknown categories
    pub fn encode_row(&self, row: &[String]) -> Result<Vec<i64>> {
        if row.len() != self.feature_names.len() {
            return Err(EncodeError::ColumnMismatch(format!(
                "expected {} columns, got {}",
                self.feature_names.len(),
                row.len()
            )));
        }
        self.encode_values(row.iter().map(String::as_str), UnknownCategoryPolicy::Reject)
    }

    pub fn encode_rows(&self, rows: &[Vec<String>]) -> Result<Vec<Vec<i64>>> {
        rows.iter().map(|row| self.encode_row(row)).collect()
    }

    pub fn encode_label(&self, label: &str) -> Result<usize> {
        self.labels
            .transform(label)
            .ok_or_else(|| EncodeError::UnknownLabel(label.to_string()))
    }

    pub fn encode_labels(&self, labels: &[String]) -> Result<Vec<usize>> {
        labels.iter().map(|label| self.encode_label(label)).collect()
    }

    pub fn decode_label(&self, index: usize) -> Result<&str> {
        self.labels
            .inverse_transform(index)
            .ok_or(EncodeError::ClassOutOfRange {
                index,
                count: self.labels.len(),
            })
    }

    fn encode_values<'a>(
        &self,
        values: impl Iterator<Item = &'a str>,
        policy: UnknownCategoryPolicy,
    ) -> Result<Vec<i64>> {
        values
            .enumerate()
            .map(|(column, value)| match self.encode_cell(column, value)? {
                CellCode::Known(code) => Ok(code),
                CellCode::UnknownCategory(value) => {
                    let column = self.feature_names[column].clone();
                    match policy {
                        UnknownCategoryPolicy::Reject => {
                            Err(EncodeError::UnknownCategory { column, value })
                        }
                        UnknownCategoryPolicy::Sentinel(sentinel) => {
                            warn!(%column, %value, sentinel, "unknown category replaced by sentinel");
                            Ok(sentinel)
                        }
                    }
                }
            })
            .collect()
    }
}

fn check_feature_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        return Err(EncodeError::InvalidTrainingData("no feature columns".to_string()));
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(EncodeError::InvalidTrainingData(format!(
                "duplicate feature column {name:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::STATIC_CODES;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn fitted() -> EncoderState {
        let names = strings(&["finalidade", "quantidade", "voltagem", "marca", "lotes"]);
        let rows = vec![
            strings(&["Doméstico", "Até 1Kg", "127V", "Bosch", "3"]),
            strings(&["Comercial", "Até 6.5Kg", "220V", "Arbel", "10"]),
            strings(&["Industrial", "Até 9Kg", "Trifásico", "Bosch", "Sim"]),
        ];
        let labels = strings(&["Moedor 10", "Moedor 22", "Moedor 98"]);
        EncoderState::fit(names, "Produto", &rows, &labels).unwrap()
    }

    #[test]
    fn test_column_kinds() {
        let state = fitted();
        let table_only = ColumnEncoding::Categorical {
            fallback: CategoryEncoder::default(),
        };
        assert_eq!(state.columns()[0], table_only);
        assert_eq!(state.columns()[2], table_only);
        assert_eq!(state.columns()[4], ColumnEncoding::Numeric);
        assert_eq!(
            state.columns()[3],
            ColumnEncoding::Categorical {
                fallback: CategoryEncoder::fit(["Arbel", "Bosch"])
            }
        );
    }

    #[test]
    fn test_static_codes_win_in_every_column() {
        let state = fitted();
        for column in 0..state.feature_count() {
            for (value, code) in STATIC_CODES {
                assert_eq!(state.encode_cell(column, value).unwrap(), CellCode::Known(*code));
            }
        }
    }

    #[test]
    fn test_reference_record() {
        let state = fitted();
        let record = Record::new()
            .with("finalidade", "Doméstico")
            .with("quantidade", "Até 1Kg")
            .with("voltagem", "220V")
            .with("marca", "Bosch")
            .with("lotes", "7");

        let encoded = state.encode_record(&record, UnknownCategoryPolicy::Reject).unwrap();
        assert_eq!(encoded, vec![3, 1, 2, 1, 7]);
    }

    #[test]
    fn test_unknown_category_rejected_by_default() {
        let state = fitted();
        let record = Record::new()
            .with("finalidade", "Doméstico")
            .with("quantidade", "Até 1Kg")
            .with("voltagem", "220V")
            .with("marca", "Walita")
            .with("lotes", "7");

        assert_eq!(state.encode_cell(3, "Walita").unwrap(), CellCode::UnknownCategory("Walita".into()));
        assert_eq!(
            state.encode_record(&record, UnknownCategoryPolicy::default()),
            Err(EncodeError::UnknownCategory {
                column: "marca".into(),
                value: "Walita".into()
            })
        );
        assert_eq!(
            state.encode_record(&record, UnknownCategoryPolicy::Sentinel(-1)).unwrap(),
            vec![3, 1, 2, -1, 7]
        );
    }

    #[test]
    fn test_table_only_column_reports_unknown_category() {
        let state = fitted();
        assert_eq!(state.encode_cell(2, "110V").unwrap(), CellCode::UnknownCategory("110V".into()));

        let record = Record::new()
            .with("finalidade", "Doméstico")
            .with("quantidade", "Até 1Kg")
            .with("voltagem", "110V")
            .with("marca", "Bosch")
            .with("lotes", "7");
        assert_eq!(
            state.encode_record(&record, UnknownCategoryPolicy::Reject),
            Err(EncodeError::UnknownCategory {
                column: "voltagem".into(),
                value: "110V".into()
            })
        );
        assert_eq!(
            state.encode_record(&record, UnknownCategoryPolicy::Sentinel(0)).unwrap(),
            vec![3, 1, 0, 1, 7]
        );
    }

    #[test]
    fn test_numeric_column_fails_loudly() {
        let state = fitted();
        assert_eq!(
            state.encode_cell(4, "muitos"),
            Err(EncodeError::NotInteger {
                column: "lotes".into(),
                value: "muitos".into()
            })
        );
        // the sentinel policy never hides a type error
        let record = Record::new()
            .with("finalidade", "Doméstico")
            .with("quantidade", "Até 1Kg")
            .with("voltagem", "220V")
            .with("marca", "Bosch")
            .with("lotes", "muitos");
        assert!(matches!(
            state.encode_record(&record, UnknownCategoryPolicy::Sentinel(0)),
            Err(EncodeError::NotInteger { .. })
        ));
    }

    #[test]
    fn test_column_order_enforced() {
        let state = fitted();
        let record = Record::new()
            .with("quantidade", "Até 1Kg")
            .with("finalidade", "Doméstico")
            .with("voltagem", "220V")
            .with("marca", "Bosch")
            .with("lotes", "7");

        assert!(matches!(
            state.encode_record(&record, UnknownCategoryPolicy::Reject),
            Err(EncodeError::ColumnMismatch(_))
        ));
        assert!(matches!(
            state.encode_record(&Record::new().with("finalidade", "Sim"), UnknownCategoryPolicy::Reject),
            Err(EncodeError::ColumnMismatch(_))
        ));
    }

    #[test]
    fn test_labels_round_trip() {
        let state = fitted();
        assert_eq!(state.class_count(), 3);
        assert_eq!(state.encode_label("Moedor 22").unwrap(), 1);
        assert_eq!(state.decode_label(2).unwrap(), "Moedor 98");
        assert!(state.decode_label(3).is_err());
        assert!(state.encode_label("Moedor 99").is_err());
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let names = strings(&["a", "b"]);
        assert!(EncoderState::fit(names.clone(), "y", &[], &[]).is_err());
        assert!(EncoderState::fit(names.clone(), "y", &[strings(&["1"])], &strings(&["x"])).is_err());
        assert!(EncoderState::fit(names, "y", &[strings(&["1", "2"])], &[]).is_err());
        assert!(EncoderState::fit(strings(&["a", "a"]), "y", &[strings(&["1", "2"])], &strings(&["x"])).is_err());
    }

    #[test]
    fn test_validate_after_round_trip() {
        let state = fitted();
        let json = serde_json::to_string(&state).unwrap();
        let back: EncoderState = serde_json::from_str(&json).unwrap();

        assert_eq!(back, state);
        assert!(back.validate().is_ok());
        assert!(json.contains(r#""kind":"categorical""#));
    }
}
