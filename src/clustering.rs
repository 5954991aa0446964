//! Clustering capability used by the appearance stages.
//!
//! Team classification only needs one narrow operation - partition a
//! point set into `k` groups - so the concrete algorithm sits behind
//! the [`Clusterer`] trait and can be swapped out.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Result};

/// Result of clustering a point set.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// Cluster centroids (k x n_features).
    pub centroids: DMatrix<f64>,

    /// Cluster label per input point.
    pub labels: Vec<usize>,
}

impl Clustering {
    /// Index of the centroid nearest to `point`.
    pub fn predict(&self, point: &[f64]) -> usize {
        nearest_centroid(&self.centroids, point)
    }
}

/// Index of the row of `centroids` nearest to `point`.
pub fn nearest_centroid(centroids: &DMatrix<f64>, point: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for i in 0..centroids.nrows() {
        let mut dist = 0.0;
        for j in 0..centroids.ncols() {
            let diff = centroids[(i, j)] - point[j];
            dist += diff * diff;
        }
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Trait for clustering algorithms.
pub trait Clusterer {
    /// Partition `points` (n_samples x n_features) into `k` clusters.
    fn cluster(&self, points: &DMatrix<f64>, k: usize) -> Result<Clustering>;
}

/// Lloyd's k-means with k-means++ seeding.
///
/// Deterministic for a fixed seed; restarted `n_init` times and the
/// lowest-inertia run wins.
#[derive(Debug, Clone)]
pub struct KMeans {
    /// Number of restarts with different seedings.
    pub n_init: usize,

    /// Iteration cap per restart.
    pub max_iterations: usize,

    /// RNG seed for reproducible clustering.
    pub seed: u64,
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_init: 10,
            max_iterations: 100,
            seed: 42,
        }
    }
}

impl Clusterer for KMeans {
    fn cluster(&self, points: &DMatrix<f64>, k: usize) -> Result<Clustering> {
        let n = points.nrows();
        if k == 0 {
            return Err(Error::ClusteringError("k must be positive".to_string()));
        }
        if n < k {
            return Err(Error::ClusteringError(format!(
                "cannot form {} clusters from {} points",
                k, n
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Clustering)> = None;

        for _ in 0..self.n_init.max(1) {
            let (inertia, clustering) = self.run_once(points, k, &mut rng);
            if best.as_ref().map_or(true, |(b, _)| inertia < *b) {
                best = Some((inertia, clustering));
            }
        }

        Ok(best.expect("at least one restart ran").1)
    }
}

impl KMeans {
    /// One seeded run of Lloyd's algorithm; returns (inertia, result).
    fn run_once(&self, points: &DMatrix<f64>, k: usize, rng: &mut StdRng) -> (f64, Clustering) {
        let n = points.nrows();
        let d = points.ncols();

        let mut centroids = self.seed_plus_plus(points, k, rng);
        let mut labels = vec![0usize; n];

        for _ in 0..self.max_iterations {
            // Assignment step.
            let mut changed = false;
            for i in 0..n {
                let row: Vec<f64> = points.row(i).iter().copied().collect();
                let label = nearest_centroid(&centroids, &row);
                if label != labels[i] {
                    labels[i] = label;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            // Update step.
            let mut sums = DMatrix::zeros(k, d);
            let mut counts = vec![0usize; k];
            for i in 0..n {
                counts[labels[i]] += 1;
                for j in 0..d {
                    sums[(labels[i], j)] += points[(i, j)];
                }
            }
            for c in 0..k {
                if counts[c] == 0 {
                    // Re-seed an empty cluster on a random point.
                    let i = rng.gen_range(0..n);
                    for j in 0..d {
                        sums[(c, j)] = points[(i, j)];
                    }
                    counts[c] = 1;
                }
                for j in 0..d {
                    centroids[(c, j)] = sums[(c, j)] / counts[c] as f64;
                }
            }
        }

        let mut inertia = 0.0;
        for i in 0..n {
            for j in 0..d {
                let diff = points[(i, j)] - centroids[(labels[i], j)];
                inertia += diff * diff;
            }
        }

        (inertia, Clustering { centroids, labels })
    }

    /// k-means++ seeding: each next centroid is drawn with probability
    /// proportional to its squared distance to the nearest chosen one.
    fn seed_plus_plus(&self, points: &DMatrix<f64>, k: usize, rng: &mut StdRng) -> DMatrix<f64> {
        let n = points.nrows();
        let d = points.ncols();
        let mut centroids = DMatrix::zeros(k, d);

        let first = rng.gen_range(0..n);
        for j in 0..d {
            centroids[(0, j)] = points[(first, j)];
        }

        let mut dist_sq = vec![0.0f64; n];
        for chosen in 1..k {
            let mut total = 0.0;
            for i in 0..n {
                let mut best = f64::INFINITY;
                for c in 0..chosen {
                    let mut dist = 0.0;
                    for j in 0..d {
                        let diff = points[(i, j)] - centroids[(c, j)];
                        dist += diff * diff;
                    }
                    best = best.min(dist);
                }
                dist_sq[i] = best;
                total += best;
            }

            let next = if total <= 0.0 {
                rng.gen_range(0..n)
            } else {
                let mut target = rng.gen::<f64>() * total;
                let mut picked = n - 1;
                for (i, &w) in dist_sq.iter().enumerate() {
                    target -= w;
                    if target <= 0.0 {
                        picked = i;
                        break;
                    }
                }
                picked
            };
            for j in 0..d {
                centroids[(chosen, j)] = points[(next, j)];
            }
        }

        centroids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> DMatrix<f64> {
        DMatrix::from_row_slice(6, 2, &[
            0.0, 0.0, //
            0.5, 0.2, //
            0.1, 0.4, //
            10.0, 10.0, //
            10.4, 9.8, //
            9.7, 10.3, //
        ])
    }

    #[test]
    fn test_separates_two_blobs() {
        let result = KMeans::default().cluster(&two_blobs(), 2).unwrap();

        // First three points in one cluster, last three in the other.
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[0], result.labels[2]);
        assert_eq!(result.labels[3], result.labels[4]);
        assert_eq!(result.labels[3], result.labels[5]);
        assert_ne!(result.labels[0], result.labels[3]);
    }

    #[test]
    fn test_predict_matches_training_labels() {
        let points = two_blobs();
        let result = KMeans::default().cluster(&points, 2).unwrap();

        let near_origin = result.predict(&[0.2, 0.1]);
        let near_far = result.predict(&[10.1, 10.1]);
        assert_eq!(near_origin, result.labels[0]);
        assert_eq!(near_far, result.labels[3]);
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let points = two_blobs();
        let a = KMeans::default().cluster(&points, 2).unwrap();
        let b = KMeans::default().cluster(&points, 2).unwrap();
        assert_eq!(a.labels, b.labels);
    }

    #[test]
    fn test_too_few_points_is_error() {
        let points = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        assert!(KMeans::default().cluster(&points, 2).is_err());
    }

    #[test]
    fn test_k_equals_n() {
        let points = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 5.0, 5.0]);
        let result = KMeans::default().cluster(&points, 2).unwrap();
        assert_ne!(result.labels[0], result.labels[1]);
    }
}
