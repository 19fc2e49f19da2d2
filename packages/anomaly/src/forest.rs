//! Seeded isolation forest for scoring daily feature vectors.
//!
//! Outliers sit in sparse regions of feature space, so random axis-aligned
//! splits isolate them in fewer steps than inliers. The score follows the
//! standard formulation: `s = 2^(-E[h(x)] / c(n))`, reported negated so
//! that lower always means more anomalous, matching the persisted
//! `anomaly_score` ordering.

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng as _};

/// Trees grown per forest.
const TREE_COUNT: usize = 100;
/// Rows sampled per tree; smaller inputs use every row.
const MAX_SUBSAMPLE: usize = 256;
/// Euler-Mascheroni constant, for the average unsuccessful-search depth.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Output of one scoring run over a feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScores {
    /// Per-row continuous score; lower means more anomalous.
    pub scores: Vec<f64>,
    /// Per-row decision from the contamination boundary.
    pub flags: Vec<bool>,
}

/// Capability interface for unsupervised outlier scoring.
///
/// Any model that maps a feature matrix to per-row scores and boolean
/// flags satisfies the detector's contract.
pub trait OutlierModel {
    /// Fits on `rows` and scores each row.
    fn fit_score(&self, rows: &[Vec<f64>]) -> OutlierScores;
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Isolation forest with a fixed random seed.
///
/// Deterministic for a given seed, contamination fraction, and row
/// ordering: the same input always yields the same scores and flags.
#[derive(Debug, Clone, Copy)]
pub struct IsolationForest {
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    /// Creates a forest flagging roughly `contamination` of the rows.
    #[must_use]
    pub const fn new(contamination: f64, seed: u64) -> Self {
        Self {
            contamination,
            seed,
        }
    }
}

impl OutlierModel for IsolationForest {
    fn fit_score(&self, rows: &[Vec<f64>]) -> OutlierScores {
        let n = rows.len();
        if n == 0 {
            return OutlierScores {
                scores: Vec::new(),
                flags: Vec::new(),
            };
        }

        let sample_size = n.min(MAX_SUBSAMPLE);
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees: Vec<Node> = (0..TREE_COUNT)
            .map(|_| {
                let indices: Vec<usize> = if n > sample_size {
                    rand::seq::index::sample(&mut rng, n, sample_size).into_vec()
                } else {
                    (0..n).collect()
                };
                build_tree(rows, indices, 0, max_depth, &mut rng)
            })
            .collect();

        let normalizer = average_path_length(sample_size).max(f64::MIN_POSITIVE);
        #[allow(clippy::cast_precision_loss)]
        let scores: Vec<f64> = rows
            .iter()
            .map(|row| {
                let mean_depth: f64 = trees
                    .iter()
                    .map(|tree| path_length(row, tree, 0.0))
                    .sum::<f64>()
                    / TREE_COUNT as f64;
                -(2f64.powf(-mean_depth / normalizer))
            })
            .collect();

        OutlierScores {
            flags: contamination_flags(&scores, self.contamination),
            scores,
        }
    }
}

/// Flags the `ceil(contamination * n)` lowest-scoring rows (at least one).
fn contamination_flags(scores: &[f64], contamination: f64) -> Vec<bool> {
    let n = scores.len();
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let flag_count = ((contamination * n as f64).ceil() as usize).clamp(1, n);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut flags = vec![false; n];
    for &idx in &order[..flag_count] {
        flags[idx] = true;
    }
    flags
}

fn build_tree(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= max_depth {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still vary on this subset can split it.
    let feature_count = rows[indices[0]].len();
    let splittable: Vec<usize> = (0..feature_count)
        .filter(|&f| {
            let (min, max) = feature_range(rows, &indices, f);
            max > min
        })
        .collect();
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let feature = splittable[rng.gen_range(0..splittable.len())];
    let (min, max) = feature_range(rows, &indices, feature);
    let value = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| rows[i][feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(build_tree(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(rows, right, depth + 1, max_depth, rng)),
    }
}

fn feature_range(rows: &[Vec<f64>], indices: &[usize], feature: usize) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &i in indices {
        let v = rows[i][feature];
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}

fn path_length(row: &[f64], node: &Node, depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + average_path_length(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            let next = if row[*feature] < *value { left } else { right };
            path_length(row, next, depth + 1.0)
        }
    }
}

/// Average unsuccessful-search path length in a binary tree of `n` rows.
#[allow(clippy::cast_precision_loss)]
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
        }
    }
}
