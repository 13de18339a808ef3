//! K-Means clustering (Euclidean distance, tolerance-based stopping)
//!
//! Centroids are seeded with k-means++ from a seeded `StdRng`, so a fixed
//! seed and input always give the same result. Several initializations are
//! run from the same generator and the lowest-inertia fit is kept.

use crate::error::ClusterError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// K-Means configuration
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    tolerance: f64,
    max_iterations: usize,
    n_init: usize,
    seed: u64,
}

/// Fitted clustering
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansModel {
    /// `centroids[cluster][dimension]`
    pub centroids: Vec<Vec<f64>>,
    /// Cluster index per input row
    pub assignments: Vec<usize>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    /// Lloyd iterations of the kept initialization
    pub iterations: usize,
}

impl KMeans {
    pub fn new(k: usize, tolerance: f64) -> Self {
        Self {
            k,
            tolerance,
            max_iterations: 300,
            n_init: 10,
            seed: 1,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    /// Cluster the rows of `data`
    pub fn fit(&self, data: &[Vec<f64>]) -> Result<KMeansModel, ClusterError> {
        if data.len() < self.k {
            return Err(ClusterError::InsufficientInstances {
                required: self.k,
                found: data.len(),
            });
        }
        if data.first().map_or(true, |row| row.is_empty()) {
            return Err(ClusterError::EmptyMatrix);
        }
        if data.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ClusterError::NonFinite);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansModel> = None;

        for _ in 0..self.n_init {
            let centroids = self.init_plus_plus(data, &mut rng);
            let model = self.lloyd(data, centroids);
            let better = best.as_ref().map_or(true, |b| model.inertia < b.inertia);
            if better {
                best = Some(model);
            }
        }

        best.ok_or(ClusterError::EmptyMatrix)
    }

    /// k-means++ seeding: each next centroid drawn with probability ∝ D²
    fn init_plus_plus(&self, data: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = data.len();
        let mut centroids = Vec::with_capacity(self.k);
        centroids.push(data[rng.gen_range(0..n)].clone());

        let mut nearest: Vec<f64> = data
            .iter()
            .map(|row| squared_distance(row, &centroids[0]))
            .collect();

        while centroids.len() < self.k {
            let total: f64 = nearest.iter().sum();
            let index = if total <= 0.0 {
                rng.gen_range(0..n)
            } else {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = n - 1;
                for (i, d) in nearest.iter().enumerate() {
                    cumulative += d;
                    if cumulative >= target && *d > 0.0 {
                        chosen = i;
                        break;
                    }
                }
                chosen
            };

            let centroid = data[index].clone();
            for (row, best) in data.iter().zip(nearest.iter_mut()) {
                let d = squared_distance(row, &centroid);
                if d < *best {
                    *best = d;
                }
            }
            centroids.push(centroid);
        }

        centroids
    }

    fn lloyd(&self, data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> KMeansModel {
        let dims = data[0].len();
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let assignments = assign(data, &centroids);

            let mut sums = vec![vec![0.0; dims]; self.k];
            let mut counts = vec![0usize; self.k];
            for (row, &cluster) in data.iter().zip(&assignments) {
                counts[cluster] += 1;
                for (sum, v) in sums[cluster].iter_mut().zip(row) {
                    *sum += v;
                }
            }

            let mut shift: f64 = 0.0;
            for cluster in 0..self.k {
                // Empty cluster keeps its previous centroid
                if counts[cluster] == 0 {
                    continue;
                }
                let updated: Vec<f64> = sums[cluster]
                    .iter()
                    .map(|s| s / counts[cluster] as f64)
                    .collect();
                shift = shift.max(squared_distance(&updated, &centroids[cluster]).sqrt());
                centroids[cluster] = updated;
            }

            if shift <= self.tolerance {
                break;
            }
        }

        let assignments = assign(data, &centroids);
        let inertia = data
            .iter()
            .zip(&assignments)
            .map(|(row, &c)| squared_distance(row, &centroids[c]))
            .sum();

        KMeansModel {
            centroids,
            assignments,
            inertia,
            iterations,
        }
    }
}

fn assign(data: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    data.iter().map(|row| nearest_centroid(row, centroids)).collect()
}

/// Ties resolve to the lowest cluster index
fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_distance {
            best_distance = d;
            best = i;
        }
    }
    best
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_groups() -> Vec<Vec<f64>> {
        vec![
            vec![1.0], vec![1.2], vec![0.8],
            vec![5.0], vec![5.1], vec![4.9],
            vec![10.0], vec![10.2], vec![9.8],
        ]
    }

    #[test]
    fn test_separated_groups_share_clusters() {
        let model = KMeans::new(3, 1e-4).fit(&three_groups()).unwrap();

        let a = &model.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[6], a[8]);
        assert_ne!(a[0], a[3]);
        assert_ne!(a[3], a[6]);
        assert_ne!(a[0], a[6]);
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = three_groups();
        let first = KMeans::new(3, 1e-4).with_seed(1).fit(&data).unwrap();
        let second = KMeans::new(3, 1e-4).with_seed(1).fit(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_too_few_instances() {
        let result = KMeans::new(3, 1e-4).fit(&[vec![1.0], vec![2.0]]);
        assert_eq!(
            result,
            Err(ClusterError::InsufficientInstances { required: 3, found: 2 })
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        let data = vec![vec![1.0], vec![f64::NAN], vec![3.0]];
        assert_eq!(KMeans::new(3, 1e-4).fit(&data), Err(ClusterError::NonFinite));
    }

    #[test]
    fn test_iteration_cap_respected() {
        // Zero tolerance never converges early
        let model = KMeans::new(3, 0.0)
            .with_max_iterations(2)
            .with_n_init(1)
            .fit(&three_groups())
            .unwrap();
        assert!(model.iterations <= 2);
    }

    #[test]
    fn test_limits_clamped_to_one() {
        let model = KMeans::new(3, 1e-4)
            .with_max_iterations(0)
            .with_n_init(0)
            .fit(&three_groups())
            .unwrap();
        assert_eq!(model.iterations, 1);
        assert_eq!(model.assignments.len(), 9);
    }
}
