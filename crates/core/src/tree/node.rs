//! Decision tree structures for classification
//!
//! Integer features, integer thresholds, `<=` goes left. Every node keeps
//! the per-class sample counts seen while fitting.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0`, `left`/`right` index into the
/// node array and `class` is `None`. Leaves use `-1` for the three indices
/// and carry the predicted class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (pre-order position, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Split threshold; samples with `feature <= threshold` go left
    pub threshold: i64,

    /// Predicted class for leaf nodes
    pub class: Option<u32>,

    /// Training samples per class that reached this node
    pub counts: Vec<u32>,
}

impl Node {
    pub fn internal(
        id: i32,
        feature_idx: i32,
        threshold: i64,
        left: i32,
        right: i32,
        counts: Vec<u32>,
    ) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            class: None,
            counts,
        }
    }

    /// Leaf predicting the majority class of `counts` (lowest index on ties)
    pub fn leaf(id: i32, counts: Vec<u32>) -> Self {
        let class = majority_class(&counts);
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            class: Some(class),
            counts,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.class.is_some()
    }

    pub fn samples(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Index of the largest count, lowest index on ties
pub fn majority_class(counts: &[u32]) -> u32 {
    let mut best = 0usize;
    for (i, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = i;
        }
    }
    best as u32
}

/// Single classification tree (node 0 is the root)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk to the leaf reached by `features`
    pub fn leaf_for(&self, features: &[i64]) -> Result<&Node, ModelError> {
        let mut idx = 0usize;

        // a valid tree reaches a leaf in at most `nodes.len()` steps
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| ModelError::ValidationFailed(format!("node {idx} out of range")))?;

            if node.is_leaf() {
                return Ok(node);
            }

            let feature_idx = node.feature_idx as usize;
            let value = *features.get(feature_idx).ok_or(ModelError::FeatureCount {
                expected: feature_idx + 1,
                actual: features.len(),
            })?;

            let next = if value <= node.threshold { node.left } else { node.right };
            if next < 0 {
                return Err(ModelError::ValidationFailed(format!(
                    "node {idx} has negative child {next}"
                )));
            }
            idx = next as usize;
        }

        Err(ModelError::ValidationFailed("cycle in tree structure".to_string()))
    }

    /// Predicted class index
    pub fn predict(&self, features: &[i64]) -> Result<usize, ModelError> {
        let leaf = self.leaf_for(features)?;
        leaf.class
            .map(|c| c as usize)
            .ok_or_else(|| ModelError::ValidationFailed(format!("leaf {} has no class", leaf.id)))
    }

    /// Training class counts at the leaf reached by `features`
    pub fn predict_counts(&self, features: &[i64]) -> Result<&[u32], ModelError> {
        Ok(&self.leaf_for(features)?.counts)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Longest root-to-leaf path in edges
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize, depth: usize) -> usize {
            match nodes.get(idx) {
                Some(node) if !node.is_leaf() => {
                    walk(nodes, node.left as usize, depth + 1).max(walk(nodes, node.right as usize, depth + 1))
                }
                _ => depth,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0, 0)
        }
    }

    /// Validate tree structure against the model dimensions
    pub fn validate(&self, feature_count: usize, class_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.counts.len() != class_count {
                return Err(format!(
                    "Node {} has {} class counts, expected {}",
                    i,
                    node.counts.len(),
                    class_count
                ));
            }

            if node.is_leaf() {
                match node.class {
                    Some(class) if (class as usize) < class_count => {}
                    Some(class) => return Err(format!("Leaf node {i} has invalid class {class}")),
                    None => return Err(format!("Leaf node {i} has no class")),
                }
                continue;
            }

            // children always come after their parent, which rules out cycles
            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }
        }

        Ok(())
    }

    /// Plain-text rendering of the tree
    pub fn export_text(&self, feature_names: &[String], class_names: &[String]) -> String {
        let mut out = String::new();
        self.render_node(0, 0, feature_names, class_names, &mut out);
        out
    }

    fn render_node(
        &self,
        idx: usize,
        depth: usize,
        feature_names: &[String],
        class_names: &[String],
        out: &mut String,
    ) {
        let Some(node) = self.nodes.get(idx) else {
            return;
        };
        let indent = "|   ".repeat(depth);

        if node.is_leaf() {
            let class = node.class.unwrap_or_default() as usize;
            let name = class_names.get(class).map(String::as_str).unwrap_or("?");
            let _ = writeln!(out, "{indent}|--- class: {name} {:?}", node.counts);
            return;
        }

        let feature = feature_names
            .get(node.feature_idx as usize)
            .cloned()
            .unwrap_or_else(|| format!("feature_{}", node.feature_idx));

        let _ = writeln!(out, "{indent}|--- {feature} <= {}", node.threshold);
        self.render_node(node.left as usize, depth + 1, feature_names, class_names, out);
        let _ = writeln!(out, "{indent}|--- {feature} >  {}", node.threshold);
        self.render_node(node.right as usize, depth + 1, feature_names, class_names, out);
    }
}
