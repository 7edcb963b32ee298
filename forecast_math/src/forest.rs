//! Regression trees and bootstrap random forests
//!
//! Trees are grown CART-style: every split considers all features and picks
//! the threshold that minimises the summed squared error of the two children.
//! A forest averages trees grown on bootstrap resamples drawn from a seeded
//! generator, so a given seed always yields the same forest.

use crate::{ensure_finite, MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hyperparameters for [`RandomForest`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node
    pub min_samples_split: usize,
    /// Seed for the bootstrap generator
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single CART regression tree
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    error: f64,
}

impl RegressionTree {
    /// Grow a tree on the rows selected by `sample` (indices may repeat)
    fn grow(
        features: &[Vec<f64>],
        targets: &[f64],
        sample: Vec<usize>,
        params: &ForestParams,
    ) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            n_features: features[0].len(),
        };
        tree.build(features, targets, sample, 0, params);
        tree
    }

    /// Fit a tree on every row once
    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: &ForestParams) -> Result<Self> {
        validate(features, targets)?;
        Ok(Self::grow(
            features,
            targets,
            (0..targets.len()).collect(),
            params,
        ))
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        sample: Vec<usize>,
        depth: usize,
        params: &ForestParams,
    ) -> usize {
        let index = self.nodes.len();
        let mean = sample.iter().map(|&i| targets[i]).sum::<f64>() / sample.len() as f64;
        self.nodes.push(Node::Leaf { value: mean });

        let depth_reached = params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || sample.len() < params.min_samples_split.max(2) {
            return index;
        }

        let node_error: f64 = sample.iter().map(|&i| (targets[i] - mean).powi(2)).sum();
        if node_error <= 1e-12 {
            return index;
        }

        let Some(best) = best_split(features, targets, &sample, self.n_features) else {
            return index;
        };
        if best.error >= node_error {
            return index;
        }

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&i| features[i][best.feature] <= best.threshold);

        let left = self.build(features, targets, left_sample, depth + 1, params);
        let right = self.build(features, targets, right_sample, depth + 1, params);
        self.nodes[index] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };

        index
    }

    /// Predict the target for one feature row
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(MathError::InvalidInput(format!(
                "Expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }

        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return Ok(*value),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Number of leaves in the tree
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

fn best_split(
    features: &[Vec<f64>],
    targets: &[f64],
    sample: &[usize],
    n_features: usize,
) -> Option<SplitCandidate> {
    let total: f64 = sample.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = sample.iter().map(|&i| targets[i].powi(2)).sum();
    let n = sample.len();

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = sample.to_vec();

    for feature in 0..n_features {
        sorted.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for position in 1..n {
            let previous = sorted[position - 1];
            left_sum += targets[previous];
            left_sq += targets[previous].powi(2);

            let low = features[previous][feature];
            let high = features[sorted[position]][feature];
            if high <= low {
                continue;
            }

            let left_n = position as f64;
            let right_n = (n - position) as f64;
            let right_sum = total - left_sum;
            let right_sq = total_sq - left_sq;
            let error = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.as_ref().map_or(true, |b| error < b.error) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: (low + high) / 2.0,
                    error,
                });
            }
        }
    }

    best
}

fn validate(features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
    if features.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot grow a tree without observations".to_string(),
        ));
    }
    if features.len() != targets.len() {
        return Err(MathError::InvalidInput(format!(
            "Feature rows ({}) do not match target length ({})",
            features.len(),
            targets.len()
        )));
    }
    let width = features[0].len();
    if width == 0 || features.iter().any(|row| row.len() != width) {
        return Err(MathError::InvalidInput(
            "Feature rows must be non-empty and equally long".to_string(),
        ));
    }
    for row in features {
        ensure_finite(row, "Feature matrix")?;
    }
    ensure_finite(targets, "Targets")
}

/// Bagged ensemble of regression trees
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Grow `params.n_trees` trees on bootstrap resamples of the data
    pub fn fit(features: &[Vec<f64>], targets: &[f64], params: ForestParams) -> Result<Self> {
        if params.n_trees == 0 {
            return Err(MathError::InvalidInput(
                "A forest needs at least one tree".to_string(),
            ));
        }
        validate(features, targets)?;

        let n = targets.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::grow(features, targets, sample, &params)
            })
            .collect();

        Ok(Self { trees })
    }

    /// Average prediction across all trees
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(row)?;
        }
        Ok(sum / self.trees.len() as f64)
    }

    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
