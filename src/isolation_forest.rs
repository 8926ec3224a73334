// src/isolation_forest.rs
//! Isolation forest outlier model.
//!
//! Each tree isolates points by recursive random axis-aligned splits over a
//! random subsample. Points that end up alone after few splits are scored as
//! more anomalous. Scores follow the usual `2^(-E[h(x)] / c(n))` form, so they
//! fall in (0, 1] with higher meaning more anomalous.

use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};
use tracing::debug;

use crate::error::TimesheetError;

const MAX_SUBSAMPLE: usize = 256;
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Average path length of an unsuccessful search in a binary search tree
/// built from `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,  // value <= threshold
        right: Box<Node>, // value > threshold
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(rows: &[Vec<f64>], sample: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: Self::grow_node(rows, sample, 0, height_limit, rng),
        }
    }

    fn grow_node(
        rows: &[Vec<f64>],
        sample: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> Node {
        if sample.len() <= 1 || depth >= height_limit {
            return Node::Leaf { size: sample.len() };
        }

        // Only columns that still vary inside this node can separate points
        let width = rows[sample[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|feature| {
                let (min, max) = sample.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &row| (min.min(rows[row][feature]), max.max(rows[row][feature])),
                );
                (min < max).then_some((feature, min, max))
            })
            .collect();

        if candidates.is_empty() {
            return Node::Leaf { size: sample.len() };
        }

        let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(min..max);
        let (left, right): (Vec<usize>, Vec<usize>) = sample
            .into_iter()
            .partition(|&row| rows[row][feature] <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Self::grow_node(rows, left, depth + 1, height_limit, rng)),
            right: Box::new(Self::grow_node(rows, right, depth + 1, height_limit, rng)),
        }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

/// An ensemble of isolation trees fitted on one set of feature rows.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    width: usize,
}

impl IsolationForest {
    /// Fits `n_estimators` trees. The same `seed` always yields the same forest.
    pub fn fit(rows: &[Vec<f64>], n_estimators: usize, seed: u64) -> Result<Self, TimesheetError> {
        let model_fit = |reason: String| TimesheetError::ModelFit { reason };

        if n_estimators == 0 {
            return Err(model_fit("at least one tree is required".to_string()));
        }
        let width = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(model_fit("no feature rows to fit".to_string())),
        };
        if let Some(position) = rows.iter().position(|row| row.len() != width) {
            return Err(model_fit(format!(
                "row {} has {} features, expected {}",
                position,
                rows[position].len(),
                width
            )));
        }
        if rows.iter().flatten().any(|value| !value.is_finite()) {
            return Err(model_fit("feature rows contain non-finite values".to_string()));
        }

        let subsample_size = rows.len().min(MAX_SUBSAMPLE);
        let height_limit = (subsample_size as f64).log2().ceil() as usize;

        let mut seeder = StdRng::seed_from_u64(seed);
        let trees = (0..n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(seeder.gen());
                let sample = index::sample(&mut rng, rows.len(), subsample_size).into_vec();
                IsolationTree::grow(rows, sample, height_limit, &mut rng)
            })
            .collect();

        debug!(
            "Fitted isolation forest: trees={}, subsample={}, height_limit={}, features={}",
            n_estimators, subsample_size, height_limit, width
        );

        Ok(Self {
            trees,
            subsample_size,
            width,
        })
    }

    /// Anomaly score per row, in (0, 1]. Higher is more anomalous.
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, TimesheetError> {
        let normaliser = average_path_length(self.subsample_size);
        rows.iter()
            .map(|row| {
                if row.len() != self.width {
                    return Err(TimesheetError::ModelFit {
                        reason: format!(
                            "cannot score a row with {} features, model expects {}",
                            row.len(),
                            self.width
                        ),
                    });
                }
                let mean_path = self
                    .trees
                    .iter()
                    .map(|tree| tree.path_length(row))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                let score = 2f64.powf(-mean_path / normaliser);
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(TimesheetError::ModelFit {
                        reason: "anomaly score is not a finite number".to_string(),
                    })
                }
            })
            .collect()
    }
}

/// Linear-interpolated percentile of `values`, `fraction` in [0, 1].
fn percentile(values: &[f64], fraction: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = fraction * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

/// Binarises scores so that roughly `contamination` of them are outliers.
///
/// A row is an outlier iff its negated score lies strictly below the
/// `contamination` percentile of all negated scores. Tied scores always get
/// the same label, and a contamination of 0 flags nothing.
pub fn outlier_mask(scores: &[f64], contamination: f64) -> Vec<bool> {
    if scores.is_empty() {
        return Vec::new();
    }
    let negated: Vec<f64> = scores.iter().map(|score| -score).collect();
    let offset = percentile(&negated, contamination);
    negated.iter().map(|value| *value < offset).collect()
}
