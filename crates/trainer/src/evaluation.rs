//! Cross-validation and classification diagnostics
//!
//! Nothing downstream depends on these numbers; they are reported by the
//! trainer so a human can judge the fitted tree.

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Stratified k-fold assignment.
///
/// Indices are grouped by class (ascending class index), each group is
/// shuffled with one seeded LCG and the groups are dealt round-robin over
/// the folds with a single running slot counter. Each returned fold is
/// sorted ascending.
pub fn stratified_folds(labels: &[usize], k: usize, seed: i64) -> Result<Vec<Vec<usize>>, TrainerError> {
    if k < 2 || k > labels.len() {
        return Err(TrainerError::Config(format!(
            "folds must satisfy 2 <= k <= {} samples, got k = {k}",
            labels.len()
        )));
    }

    let class_count = labels.iter().max().map_or(0, |&max| max + 1);
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); class_count];
    for (idx, &label) in labels.iter().enumerate() {
        groups[label].push(idx);
    }

    if let Some(smallest) = groups.iter().map(Vec::len).filter(|&len| len > 0).min() {
        if smallest < k {
            warn!(smallest, folds = k, "least populated class has fewer members than folds");
        }
    }

    let mut rng = LcgRng::new(seed);
    let mut folds = vec![Vec::new(); k];
    let mut slot = 0usize;

    for group in &mut groups {
        rng.shuffle(group);
        for &idx in group.iter() {
            folds[slot % k].push(idx);
            slot += 1;
        }
    }

    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Fraction of matching predictions (0.0 for empty input)
pub fn accuracy(actual: &[usize], predicted: &[usize]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    correct as f64 / actual.len() as f64
}

/// Result of stratified k-fold cross-validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidation {
    pub fold_accuracies: Vec<f64>,
    /// Out-of-fold prediction for every sample
    pub predictions: Vec<usize>,
    pub accuracy: f64,
}

impl CrossValidation {
    pub fn mean(&self) -> f64 {
        if self.fold_accuracies.is_empty() {
            return 0.0;
        }
        self.fold_accuracies.iter().sum::<f64>() / self.fold_accuracies.len() as f64
    }

    /// Population standard deviation of the fold accuracies
    pub fn std_dev(&self) -> f64 {
        if self.fold_accuracies.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .fold_accuracies
            .iter()
            .map(|a| (a - mean).powi(2))
            .sum::<f64>()
            / self.fold_accuracies.len() as f64;
        variance.sqrt()
    }
}

/// Train one tree per fold on the remaining folds and predict the held-out one
pub fn cross_validate(
    features: &[Vec<i64>],
    labels: &[usize],
    class_count: usize,
    folds: usize,
    seed: i64,
    config: &TreeConfig,
) -> Result<CrossValidation, TrainerError> {
    let assignment = stratified_folds(labels, folds, seed)?;
    let mut predictions = vec![0usize; labels.len()];
    let mut fold_accuracies = Vec::with_capacity(folds);

    for (fold_idx, test) in assignment.iter().enumerate() {
        let mut in_test = vec![false; labels.len()];
        for &idx in test {
            in_test[idx] = true;
        }

        let (train_x, train_y): (Vec<Vec<i64>>, Vec<usize>) = (0..labels.len())
            .filter(|&idx| !in_test[idx])
            .map(|idx| (features[idx].clone(), labels[idx]))
            .unzip();

        let tree = CartBuilder::new(&train_x, &train_y, class_count, config.clone())?.build();

        let mut actual = Vec::with_capacity(test.len());
        let mut predicted = Vec::with_capacity(test.len());
        for &idx in test {
            let class = tree.predict(&features[idx])?;
            predictions[idx] = class;
            actual.push(labels[idx]);
            predicted.push(class);
        }

        let fold_accuracy = accuracy(&actual, &predicted);
        debug!(fold = fold_idx + 1, samples = test.len(), accuracy = fold_accuracy, "fold evaluated");
        fold_accuracies.push(fold_accuracy);
    }

    Ok(CrossValidation {
        fold_accuracies,
        accuracy: accuracy(labels, &predictions),
        predictions,
    })
}

/// Confusion matrix; rows are actual classes, columns predicted classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub matrix: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn new(actual: &[usize], predicted: &[usize], class_count: usize) -> Self {
        let mut matrix = vec![vec![0usize; class_count]; class_count];
        for (&a, &p) in actual.iter().zip(predicted) {
            if a < class_count && p < class_count {
                matrix[a][p] += 1;
            }
        }
        Self { matrix }
    }

    pub fn class_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.class_count()).map(|i| self.matrix[i][i]).sum()
    }

    /// Row sum: samples whose actual class is `class`
    pub fn support(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Column sum: samples predicted as `class`
    pub fn predicted(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .matrix
            .iter()
            .flatten()
            .map(|v| v.to_string().len())
            .max()
            .unwrap_or(1);
        for row in &self.matrix {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>width$}")).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1; zero divisions yield 0
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn new(matrix: &ConfusionMatrix, class_names: &[String]) -> Self {
        let classes: Vec<ClassMetrics> = (0..matrix.class_count())
            .map(|class| {
                let tp = matrix.matrix[class][class];
                let precision = ratio(tp, matrix.predicted(class));
                let recall = ratio(tp, matrix.support(class));
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label: class_names
                        .get(class)
                        .cloned()
                        .unwrap_or_else(|| class.to_string()),
                    precision,
                    recall,
                    f1,
                    support: matrix.support(class),
                }
            })
            .collect();

        let total = matrix.total();
        let n = classes.len().max(1) as f64;
        let macro_avg = ClassMetrics {
            label: "macro avg".to_string(),
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1: classes.iter().map(|c| c.f1).sum::<f64>() / n,
            support: total,
        };

        let weight = |metric: fn(&ClassMetrics) -> f64| {
            if total == 0 {
                return 0.0;
            }
            classes.iter().map(|c| metric(c) * c.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = ClassMetrics {
            label: "weighted avg".to_string(),
            precision: weight(|c| c.precision),
            recall: weight(|c| c.recall),
            f1: weight(|c| c.f1),
            support: total,
        };

        Self {
            accuracy: ratio(matrix.correct(), total),
            classes,
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .classes
            .iter()
            .map(|c| c.label.chars().count())
            .chain([self.weighted_avg.label.len()])
            .max()
            .unwrap_or(0);

        writeln!(f, "{:>width$} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for metrics in &self.classes {
            write_row(f, metrics, width)?;
        }
        writeln!(f)?;

        let support = self.macro_avg.support;
        writeln!(f, "{:>width$} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, support)?;
        write_row(f, &self.macro_avg, width)?;
        write_row(f, &self.weighted_avg, width)
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, m: &ClassMetrics, width: usize) -> fmt::Result {
    // `{:>width$}` pads by chars, which keeps accented labels aligned
    writeln!(
        f,
        "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        m.label, m.precision, m.recall, m.f1, m.support
    )
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
