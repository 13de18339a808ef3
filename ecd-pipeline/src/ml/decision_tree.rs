//! C4.5 decision tree for numeric attributes
//!
//! - Binary splits `a <= t` / `a > t` on numeric attributes
//! - Split choice by gain ratio among candidates with at least average gain,
//!   with the log2(#thresholds)/N correction on numeric gain
//! - At least `min_num_obj` instances per branch
//! - Pessimistic-error subtree replacement pruning at `confidence_factor`
//! - One extracted rule per leaf for reporting

use super::ClassificationModel;
use crate::error::TrainingError;

/// Tree induction options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct C45Options {
    /// Pruning confidence, (0, 0.5]
    pub confidence_factor: f64,
    /// Minimum instances per branch
    pub min_num_obj: usize,
    /// Skip pruning
    pub unpruned: bool,
}

impl Default for C45Options {
    fn default() -> Self {
        Self {
            confidence_factor: 0.25,
            min_num_obj: 2,
            unpruned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TreeNode {
    Leaf {
        class: usize,
        distribution: Vec<usize>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        distribution: Vec<usize>,
    },
}

/// Candidate split on one feature
#[derive(Debug, Clone, Copy)]
struct CandidateSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    gain_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct C45Tree {
    options: C45Options,
    n_classes: usize,
    features: Vec<String>,
    root: Option<TreeNode>,
}

impl C45Tree {
    pub fn new(n_classes: usize, options: C45Options) -> Self {
        Self {
            options,
            n_classes,
            features: Vec::new(),
            root: None,
        }
    }

    pub fn num_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    fn build(&self, x: &[Vec<f64>], y: &[usize], indices: Vec<usize>) -> TreeNode {
        let distribution = self.distribution(y, &indices);
        let class = majority(&distribution);
        let n = indices.len();

        if distribution[class] == n || n < 2 * self.options.min_num_obj {
            return TreeNode::Leaf { class, distribution };
        }

        let info = entropy(&distribution);
        let candidates: Vec<CandidateSplit> = (0..self.features.len())
            .filter_map(|feature| self.best_split(x, y, &indices, feature, info))
            .filter(|c| c.gain > 0.0)
            .collect();

        if candidates.is_empty() {
            return TreeNode::Leaf { class, distribution };
        }

        let average_gain = candidates.iter().map(|c| c.gain).sum::<f64>() / candidates.len() as f64;
        let mut chosen: Option<CandidateSplit> = None;
        for candidate in candidates.iter().filter(|c| c.gain >= average_gain - 1e-9) {
            if chosen.map_or(true, |best| candidate.gain_ratio > best.gain_ratio) {
                chosen = Some(*candidate);
            }
        }
        let Some(split) = chosen else {
            return TreeNode::Leaf { class, distribution };
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[i][split.feature] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(x, y, left)),
            right: Box::new(self.build(x, y, right)),
            distribution,
        }
    }

    /// Best threshold on one feature by information gain
    fn best_split(
        &self,
        x: &[Vec<f64>],
        y: &[usize],
        indices: &[usize],
        feature: usize,
        info: f64,
    ) -> Option<CandidateSplit> {
        let n = indices.len();
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let total = self.distribution(y, &sorted);
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<(f64, f64, usize)> = None; // (gain, threshold, left size)
        let mut thresholds = 0usize;

        for position in 0..n - 1 {
            left[y[sorted[position]]] += 1;
            let here = x[sorted[position]][feature];
            let next = x[sorted[position + 1]][feature];
            if here >= next {
                continue;
            }
            let left_size = position + 1;
            let right_size = n - left_size;
            if left_size < self.options.min_num_obj || right_size < self.options.min_num_obj {
                continue;
            }
            thresholds += 1;

            let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
            let gain = info
                - (left_size as f64 / n as f64) * entropy(&left)
                - (right_size as f64 / n as f64) * entropy(&right);

            if best.map_or(true, |(g, _, _)| gain > g) {
                best = Some((gain, (here + next) / 2.0, left_size));
            }
        }

        let (gain, threshold, left_size) = best?;
        let corrected = gain - (thresholds as f64).log2() / n as f64;
        let split_info = entropy(&[left_size, n - left_size]);
        if split_info <= 0.0 {
            return None;
        }

        Some(CandidateSplit {
            feature,
            threshold,
            gain: corrected,
            gain_ratio: corrected / split_info,
        })
    }

    fn distribution(&self, y: &[usize], indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in indices {
            counts[y[i]] += 1;
        }
        counts
    }

    fn prune(&self, node: TreeNode) -> TreeNode {
        match node {
            TreeNode::Leaf { .. } => node,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                distribution,
            } => {
                let left = self.prune(*left);
                let right = self.prune(*right);
                let subtree_errors = self.estimated_errors(&left) + self.estimated_errors(&right);

                let class = majority(&distribution);
                let n = distribution.iter().sum::<usize>() as f64;
                let errors = n - distribution[class] as f64;
                let leaf_errors = errors + add_errors(n, errors, self.options.confidence_factor);

                if leaf_errors <= subtree_errors + 0.1 {
                    TreeNode::Leaf { class, distribution }
                } else {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left: Box::new(left),
                        right: Box::new(right),
                        distribution,
                    }
                }
            }
        }
    }

    fn estimated_errors(&self, node: &TreeNode) -> f64 {
        match node {
            TreeNode::Leaf { class, distribution } => {
                let n = distribution.iter().sum::<usize>() as f64;
                let errors = n - distribution[*class] as f64;
                errors + add_errors(n, errors, self.options.confidence_factor)
            }
            TreeNode::Split { left, right, .. } => {
                self.estimated_errors(left) + self.estimated_errors(right)
            }
        }
    }

    fn collect_rules(&self, node: &TreeNode, conditions: &mut Vec<String>, rules: &mut Vec<String>) {
        match node {
            TreeNode::Leaf { class, distribution } => {
                let n: usize = distribution.iter().sum();
                let errors = n - distribution[*class];
                let antecedent = if conditions.is_empty() {
                    "TRUE".to_string()
                } else {
                    conditions.join(" AND ")
                };
                rules.push(format!(
                    "IF {} THEN class = {} ({}/{})",
                    antecedent, class, n, errors
                ));
            }
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                let name = &self.features[*feature];
                conditions.push(format!("{} <= {:.4}", name, threshold));
                self.collect_rules(left, conditions, rules);
                conditions.pop();

                conditions.push(format!("{} > {:.4}", name, threshold));
                self.collect_rules(right, conditions, rules);
                conditions.pop();
            }
        }
    }
}

impl ClassificationModel for C45Tree {
    fn fit(&mut self, features: &[String], x: &[Vec<f64>], y: &[usize]) -> Result<(), TrainingError> {
        if x.is_empty() || features.is_empty() {
            return Err(TrainingError::EmptyMatrix);
        }
        self.features = features.to_vec();

        let root = self.build(x, y, (0..x.len()).collect());
        let root = if self.options.unpruned {
            root
        } else {
            self.prune(root)
        };
        self.root = Some(root);

        tracing::debug!(
            leaves = self.num_leaves(),
            depth = self.depth(),
            instances = x.len(),
            "C4.5 tree induced"
        );
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Vec<usize> {
        let Some(root) = &self.root else {
            return vec![0; x.len()];
        };
        x.iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { class, .. } => break *class,
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                            ..
                        } => {
                            node = if row[*feature] <= *threshold { left } else { right };
                        }
                    }
                }
            })
            .collect()
    }

    fn rules(&self) -> Option<Vec<String>> {
        let root = self.root.as_ref()?;
        let mut rules = Vec::new();
        self.collect_rules(root, &mut Vec::new(), &mut rules);
        Some(rules)
    }
}

/// Class with the most instances; ties resolve to the lower class
fn majority(distribution: &[usize]) -> usize {
    let mut best = 0;
    for (class, &count) in distribution.iter().enumerate() {
        if count > distribution[best] {
            best = class;
        }
    }
    best
}

/// Shannon entropy in bits
fn entropy(counts: &[usize]) -> f64 {
    let n: usize = counts.iter().sum();
    if n == 0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n as f64;
            -p * p.log2()
        })
        .sum()
}

/// Extra errors of the upper confidence bound on a leaf's error rate
fn add_errors(n: f64, errors: f64, confidence: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    if errors < 1.0 {
        let base = n * (1.0 - confidence.powf(1.0 / n));
        if errors == 0.0 {
            return base;
        }
        return base + errors * (add_errors(n, 1.0, confidence) - base);
    }
    if errors + 0.5 >= n {
        return (n - errors).max(0.0);
    }

    let z = normal_inverse(1.0 - confidence);
    let f = (errors + 0.5) / n;
    let r = (f + z * z / (2.0 * n)
        + z * (f / n - f * f / n + z * z / (4.0 * n * n)).sqrt())
        / (1.0 + z * z / n);
    r * n - errors
}

/// Inverse of the standard normal CDF (Acklam's rational approximation)
fn normal_inverse(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staircase() -> (Vec<String>, Vec<Vec<f64>>, Vec<usize>) {
        let features = vec!["score".to_string(), "noise".to_string()];
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let score = i as f64;
            x.push(vec![score, ((i * 7) % 5) as f64]);
            y.push(if i < 10 { 0 } else if i < 20 { 1 } else { 2 });
        }
        (features, x, y)
    }

    #[test]
    fn test_staircase_learned_exactly() {
        let (features, x, y) = staircase();
        let mut tree = C45Tree::new(3, C45Options::default());
        tree.fit(&features, &x, &y).unwrap();

        assert_eq!(tree.predict(&x), y);
        assert_eq!(tree.num_leaves(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_rules_cover_every_leaf() {
        let (features, x, y) = staircase();
        let mut tree = C45Tree::new(3, C45Options::default());
        tree.fit(&features, &x, &y).unwrap();

        let rules = tree.rules().unwrap();
        assert_eq!(rules.len(), tree.num_leaves());
        assert!(rules.iter().all(|r| r.starts_with("IF score")));
        assert!(rules.iter().any(|r| r.ends_with("THEN class = 0 (10/0)")));
    }

    #[test]
    fn test_pure_training_set_is_single_leaf() {
        let features = vec!["a".to_string()];
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let y = vec![1, 1, 1];

        let mut tree = C45Tree::new(3, C45Options::default());
        tree.fit(&features, &x, &y).unwrap();
        assert_eq!(tree.num_leaves(), 1);
        assert_eq!(tree.rules().unwrap(), vec!["IF TRUE THEN class = 1 (3/0)".to_string()]);
    }

    #[test]
    fn test_min_num_obj_limits_splits() {
        let features = vec!["a".to_string()];
        let x = vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]];
        let y = vec![0, 2, 2, 2];

        let options = C45Options {
            min_num_obj: 3,
            unpruned: true,
            ..C45Options::default()
        };
        let mut tree = C45Tree::new(3, options);
        tree.fit(&features, &x, &y).unwrap();
        // A single-instance branch is not allowed
        assert_eq!(tree.num_leaves(), 1);
    }

    #[test]
    fn test_normal_inverse_known_values() {
        assert!((normal_inverse(0.5)).abs() < 1e-9);
        assert!((normal_inverse(0.75) - 0.6744897501960817).abs() < 1e-6);
        assert!((normal_inverse(0.975) - 1.959963984540054).abs() < 1e-6);
    }

    #[test]
    fn test_add_errors_zero_errors() {
        // N * (1 - CF^(1/N)) for e = 0
        let extra = add_errors(10.0, 0.0, 0.25);
        assert!((extra - 10.0 * (1.0 - 0.25f64.powf(0.1))).abs() < 1e-12);
    }
}
