use serde::{Deserialize, Serialize};

/// Bijection between a sorted set of strings and `0..len`
///
/// Used both as the per-column fallback encoder and as the label encoder.
/// Classes are sorted byte-wise so fitting is independent of row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CategoryEncoder {
    classes: Vec<String>,
}

impl CategoryEncoder {
    /// Fit on the observed values; duplicates collapse to one class
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(|v| v.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Build from already-fitted classes, which must be strictly ascending
    pub fn from_classes(classes: Vec<String>) -> Option<Self> {
        if classes.windows(2).all(|w| w[0] < w[1]) {
            Some(Self { classes })
        } else {
            None
        }
    }

    pub fn transform(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Classes must stay sorted and unique for `transform` to be correct
    pub(crate) fn is_well_formed(&self) -> bool {
        self.classes.windows(2).all(|w| w[0] < w[1])
    }
}
