use std::collections::BTreeMap;

use super::{EncodeError, Result};

/// One respondent's answers, ordered by feature column
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    cells: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.cells.push((question.into(), answer.into()));
    }

    pub fn with(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.push(question, answer);
        self
    }

    /// Arrange `answers` in `feature_names` order.
    ///
    /// Every question without a non-blank answer is reported in a single
    /// [`EncodeError::MissingAnswers`]. Extra answers are ignored.
    pub fn from_answers(
        feature_names: &[String],
        answers: &BTreeMap<String, String>,
    ) -> Result<Self> {
        let mut record = Record::new();
        let mut missing = Vec::new();

        for name in feature_names {
            match answers.get(name) {
                Some(answer) if !answer.trim().is_empty() => record.push(name.clone(), answer.clone()),
                _ => missing.push(name.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(EncodeError::MissingAnswers(missing));
        }
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(q, _)| q.as_str())
    }

    pub fn answers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(_, a)| a.as_str())
    }
}
