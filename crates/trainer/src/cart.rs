//! CART (Classification and Regression Tree) builder
//!
//! Implements deterministic exact-greedy classification tree construction
//! with the Gini criterion. Split scores are compared as exact rationals in
//! integer arithmetic, so no floating point ever decides a split.

use advisor_core::tree::{DecisionTree, Node};

use crate::deterministic::{permutation, SplitTieBreaker};
use crate::errors::TrainerError;

/// Training parameters for a single tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum depth (root is depth 0); `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Seed of the feature permutation used to break score ties
    pub seed: i64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> Result<(), TrainerError> {
        if self.min_samples_split < 2 {
            return Err(TrainerError::Config(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            )));
        }
        if self.min_samples_leaf < 1 {
            return Err(TrainerError::Config("min_samples_leaf must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Gini purity of a split as the exact rational
/// `sum(cL²)/nL + sum(cR²)/nR = (sqL·nR + sqR·nL) / (nL·nR)`.
///
/// Maximizing it is the same as minimizing the weighted Gini impurity of
/// the children.
#[derive(Debug, Clone, Copy)]
struct SplitScore {
    numerator: i128,
    denominator: i128,
}

impl SplitScore {
    fn new(left: &[u32], right: &[u32]) -> Self {
        let (sq_left, n_left) = sum_squares(left);
        let (sq_right, n_right) = sum_squares(right);
        Self {
            numerator: sq_left * n_right + sq_right * n_left,
            denominator: n_left * n_right,
        }
    }

    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.numerator * other.denominator).cmp(&(other.numerator * self.denominator))
    }
}

fn sum_squares(counts: &[u32]) -> (i128, i128) {
    counts.iter().fold((0i128, 0i128), |(sq, n), &c| {
        let c = c as i128;
        (sq + c * c, n + c)
    })
}

/// Split candidate with score and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    score: SplitScore,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, current: &SplitCandidate) -> bool {
        match self.score.cmp(&current.score) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => self.tie_breaker < current.tie_breaker,
            std::cmp::Ordering::Less => false,
        }
    }
}

/// Build a classification tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    labels: &'a [usize],
    class_count: usize,
    feature_count: usize,
    /// `feature_rank[f]` is the position of feature `f` in the seeded permutation
    feature_rank: Vec<usize>,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<i64>],
        labels: &'a [usize],
        class_count: usize,
        config: TreeConfig,
    ) -> Result<Self, TrainerError> {
        config.validate()?;

        if features.is_empty() {
            return Err(TrainerError::Training("no training samples".to_string()));
        }
        if features.len() != labels.len() {
            return Err(TrainerError::Training(format!(
                "{} samples but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let feature_count = features[0].len();
        if feature_count == 0 {
            return Err(TrainerError::Training("samples have no features".to_string()));
        }
        if let Some(row) = features.iter().position(|row| row.len() != feature_count) {
            return Err(TrainerError::Training(format!(
                "sample {row} has {} features, expected {feature_count}",
                features[row].len()
            )));
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= class_count) {
            return Err(TrainerError::Training(format!(
                "label {label} out of range for {class_count} classes"
            )));
        }

        let mut feature_rank = vec![0; feature_count];
        for (rank, feature) in permutation(feature_count, config.seed).into_iter().enumerate() {
            feature_rank[feature] = rank;
        }

        Ok(Self {
            config,
            features,
            labels,
            class_count,
            feature_count,
            feature_rank,
        })
    }

    /// Build tree and return nodes
    pub fn build(&self) -> DecisionTree {
        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..self.features.len()).collect();

        self.build_node(&indices, 0, &mut nodes);

        DecisionTree::new(nodes)
    }

    /// Recursively build tree nodes in pre-order, returning the node index
    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<Node>) -> i32 {
        let current_idx = nodes.len();
        let id = current_idx as i32;
        let counts = self.class_counts(indices);

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);

        if pure
            || depth_reached
            || indices.len() < self.config.min_samples_split
            || indices.len() < 2 * self.config.min_samples_leaf
        {
            nodes.push(Node::leaf(id, counts));
            return id;
        }

        let Some(split) = self.find_best_split(indices, current_idx) else {
            nodes.push(Node::leaf(id, counts));
            return id;
        };

        let (left_indices, right_indices) = self.split_samples(indices, split.feature_idx, split.threshold);

        // Reserve space for current node
        nodes.push(Node::internal(id, split.feature_idx as i32, split.threshold, -1, -1, counts));

        let left = self.build_node(&left_indices, depth + 1, nodes);
        let right = self.build_node(&right_indices, depth + 1, nodes);

        nodes[current_idx].left = left;
        nodes[current_idx].right = right;

        id
    }

    /// Find best split using exact-greedy search over every feature
    fn find_best_split(&self, indices: &[usize], node_id: usize) -> Option<SplitCandidate> {
        let mut best: Option<SplitCandidate> = None;
        let min_leaf = self.config.min_samples_leaf;
        let total = self.class_counts(indices);

        for feature_idx in 0..self.feature_count {
            let mut sorted: Vec<(i64, usize)> = indices
                .iter()
                .map(|&i| (self.features[i][feature_idx], self.labels[i]))
                .collect();
            sorted.sort_unstable();

            let mut left = vec![0u32; self.class_count];
            let mut right = total.clone();

            for pos in 0..sorted.len() - 1 {
                let (value, label) = sorted[pos];
                left[label] += 1;
                right[label] -= 1;

                let next_value = sorted[pos + 1].0;
                if value == next_value {
                    continue;
                }

                let n_left = pos + 1;
                if n_left < min_leaf || sorted.len() - n_left < min_leaf {
                    continue;
                }

                let threshold = floor_midpoint(value, next_value);
                let candidate = SplitCandidate {
                    feature_idx,
                    threshold,
                    score: SplitScore::new(&left, &right),
                    tie_breaker: SplitTieBreaker::new(self.feature_rank[feature_idx], threshold, node_id),
                };

                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Split samples based on threshold
    fn split_samples(&self, indices: &[usize], feature_idx: usize, threshold: i64) -> (Vec<usize>, Vec<usize>) {
        indices
            .iter()
            .partition(|&&idx| self.features[idx][feature_idx] <= threshold)
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.class_count];
        for &idx in indices {
            counts[self.labels[idx]] += 1;
        }
        counts
    }
}

/// Largest integer `t` with `a <= t < b` halfway between `a` and `b`
fn floor_midpoint(a: i64, b: i64) -> i64 {
    ((a as i128 + b as i128).div_euclid(2)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(features: &[Vec<i64>], labels: &[usize], classes: usize, config: TreeConfig) -> DecisionTree {
        CartBuilder::new(features, labels, classes, config).unwrap().build()
    }

    #[test]
    fn test_single_split() {
        let features = vec![vec![1, 5], vec![2, 5], vec![3, 5], vec![4, 5]];
        let labels = vec![0, 0, 1, 1];

        let tree = fit(&features, &labels, 2, TreeConfig::default());

        assert_eq!(tree.nodes.len(), 3);
        let root = &tree.nodes[0];
        assert_eq!(root.feature_idx, 0);
        assert_eq!(root.threshold, 2);
        assert_eq!(root.counts, vec![2, 2]);
        for (row, &label) in features.iter().zip(&labels) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
    }

    #[test]
    fn test_pure_node_is_a_leaf() {
        let features = vec![vec![1], vec![2], vec![3]];
        let tree = fit(&features, &[1, 1, 1], 2, TreeConfig::default());

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].class, Some(1));
        assert_eq!(tree.nodes[0].counts, vec![0, 3]);
    }

    #[test]
    fn test_identical_features_cannot_split() {
        let features = vec![vec![1, 1]; 3];
        let tree = fit(&features, &[0, 1, 1], 2, TreeConfig::default());

        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].class, Some(1));
    }

    #[test]
    fn test_fits_training_data_without_limits() {
        // xor-like pattern needs two levels
        let features = vec![vec![1, 1], vec![1, 2], vec![2, 1], vec![2, 2]];
        let labels = vec![0, 1, 1, 0];
        let tree = fit(&features, &labels, 2, TreeConfig::default());

        for (row, &label) in features.iter().zip(&labels) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
        assert!(tree.validate(2, 2).is_ok());
    }

    #[test]
    fn test_max_depth() {
        let features = vec![vec![1, 1], vec![1, 2], vec![2, 1], vec![2, 2]];
        let labels = vec![0, 1, 1, 0];
        let config = TreeConfig {
            max_depth: Some(1),
            ..TreeConfig::default()
        };
        let tree = fit(&features, &labels, 2, config);

        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_min_samples_leaf() {
        let features = vec![vec![1], vec![2], vec![3], vec![4], vec![5]];
        let labels = vec![0, 1, 1, 1, 1];
        let config = TreeConfig {
            min_samples_leaf: 2,
            ..TreeConfig::default()
        };
        let tree = fit(&features, &labels, 2, config);

        for node in tree.nodes.iter().filter(|n| n.is_leaf()) {
            assert!(node.samples() >= 2);
        }
    }

    #[test]
    fn test_negative_thresholds() {
        let features = vec![vec![-3], vec![-2]];
        let tree = fit(&features, &[0, 1], 2, TreeConfig::default());

        assert_eq!(tree.nodes[0].threshold, -3);
        assert_eq!(floor_midpoint(-3, 0), -2);
        assert_eq!(floor_midpoint(1, 4), 2);
    }

    #[test]
    fn test_tie_break_is_seeded_and_deterministic() {
        // both features separate the classes perfectly
        let features = vec![vec![1, 10], vec![2, 20], vec![3, 30], vec![4, 40]];
        let labels = vec![0, 0, 1, 1];

        let a = fit(&features, &labels, 2, TreeConfig::default());
        let b = fit(&features, &labels, 2, TreeConfig::default());
        assert_eq!(a, b);

        let rank = permutation(2, 42);
        assert_eq!(a.nodes[0].feature_idx as usize, rank[0]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let features = vec![vec![1], vec![2]];
        assert!(CartBuilder::new(&features, &[0], 2, TreeConfig::default()).is_err());
        assert!(CartBuilder::new(&features, &[0, 2], 2, TreeConfig::default()).is_err());
        assert!(CartBuilder::new(&[], &[], 2, TreeConfig::default()).is_err());

        let config = TreeConfig {
            min_samples_split: 1,
            ..TreeConfig::default()
        };
        assert!(CartBuilder::new(&features, &[0, 1], 2, config).is_err());
    }
}
