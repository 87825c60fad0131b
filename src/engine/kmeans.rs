//! Seeded batch k-means over 2-D feature points.
//!
//! k-means++ seeding drawn from a `StdRng` seeded once per fit, `n_init`
//! restarts, Lloyd iterations. The run with the lowest inertia wins, so the
//! same points and seed always produce the same labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::defaults::DISTINCT_POINT_EPSILON_SQ;

/// A point in feature space.
pub type Point = [f64; 2];

/// Batch k-means parameters.
#[derive(Debug, Clone, Copy)]
pub struct KMeans {
    pub k: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iterations: usize,
    /// Stop once total squared centroid movement falls to or below this
    pub tolerance: f64,
}

/// Result of a k-means fit. Every cluster has at least one member.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster index per input point
    pub labels: Vec<usize>,
    pub centroids: Vec<Point>,
    /// Sum of squared distances from each point to its centroid
    pub inertia: f64,
}

impl KMeansFit {
    /// Members of cluster `c`, as input indices.
    pub fn members(&self, c: usize) -> impl Iterator<Item = usize> + '_ {
        self.labels
            .iter()
            .enumerate()
            .filter(move |&(_, &l)| l == c)
            .map(|(i, _)| i)
    }
}

impl KMeans {
    /// Cluster `points` into `k` groups.
    ///
    /// Returns `None` when there are fewer than `k` distinct points, since
    /// some cluster would have to stay empty.
    pub fn fit(&self, points: &[Point]) -> Option<KMeansFit> {
        if self.k == 0 || count_distinct_up_to(points, self.k) < self.k {
            return None;
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.n_init.max(1) {
            let seeds = plus_plus_init(points, self.k, &mut rng);
            let fit = self.lloyd(points, seeds);
            if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }

        best
    }

    fn lloyd(&self, points: &[Point], mut centroids: Vec<Point>) -> KMeansFit {
        let mut labels = vec![0usize; points.len()];

        for _ in 0..self.max_iterations.max(1) {
            for (label, point) in labels.iter_mut().zip(points) {
                *label = nearest(point, &centroids);
            }
            repair_empty(points, &mut labels, &centroids, self.k);

            let updated = means(points, &labels, self.k);
            let shift: f64 = centroids
                .iter()
                .zip(&updated)
                .map(|(a, b)| sq_dist(a, b))
                .sum();
            centroids = updated;

            if shift <= self.tolerance {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(&labels)
            .map(|(p, &l)| sq_dist(p, &centroids[l]))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
        }
    }
}

/// Number of pairwise-distinct points, counted no further than `limit`.
///
/// Exact whenever the result is below `limit`.
pub fn count_distinct_up_to(points: &[Point], limit: usize) -> usize {
    let mut distinct: Vec<&Point> = Vec::with_capacity(limit);
    for p in points {
        if distinct.len() >= limit {
            break;
        }
        if distinct.iter().all(|q| sq_dist(p, q) > DISTINCT_POINT_EPSILON_SQ) {
            distinct.push(p);
        }
    }
    distinct.len()
}

/// Squared Euclidean distance.
fn sq_dist(a: &Point, b: &Point) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// Index of the closest centroid; ties go to the lower index.
fn nearest(point: &Point, centroids: &[Point]) -> usize {
    let mut best_k = 0usize;
    let mut best_dist = f64::MAX;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = sq_dist(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_k = i;
        }
    }
    best_k
}

/// k-means++ seeding: first center uniform, the rest proportional to D².
fn plus_plus_init(points: &[Point], k: usize, rng: &mut StdRng) -> Vec<Point> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| sq_dist(p, c))
                    .fold(f64::MAX, f64::min)
            })
            .collect();

        let total: f64 = distances.iter().sum();
        let threshold = rng.gen::<f64>() * total;

        let mut cumsum = 0.0;
        let mut chosen = None;
        for (i, &dist) in distances.iter().enumerate() {
            cumsum += dist;
            if dist > DISTINCT_POINT_EPSILON_SQ && cumsum >= threshold {
                chosen = Some(i);
                break;
            }
        }

        // Rounding can leave the threshold just past the last sum
        let idx = chosen.unwrap_or_else(|| farthest(&distances));
        centroids.push(points[idx]);
    }

    centroids
}

fn farthest(distances: &[f64]) -> usize {
    distances
        .iter()
        .enumerate()
        .fold((0usize, f64::MIN), |(bi, bd), (i, &d)| if d > bd { (i, d) } else { (bi, bd) })
        .0
}

/// Give every empty cluster the point lying farthest from its own centroid,
/// taken from a cluster that can spare one.
fn repair_empty(points: &[Point], labels: &mut [usize], centroids: &[Point], k: usize) {
    let mut sizes = vec![0usize; k];
    for &l in labels.iter() {
        sizes[l] += 1;
    }

    for c in 0..k {
        if sizes[c] > 0 {
            continue;
        }
        let donor = points
            .iter()
            .enumerate()
            .filter(|(i, _)| sizes[labels[*i]] > 1)
            .map(|(i, p)| (i, sq_dist(p, &centroids[labels[i]])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });

        if let Some((i, _)) = donor {
            sizes[labels[i]] -= 1;
            labels[i] = c;
            sizes[c] = 1;
        }
    }
}

/// Per-cluster mean of the member points.
fn means(points: &[Point], labels: &[usize], k: usize) -> Vec<Point> {
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];
    for (p, &l) in points.iter().zip(labels) {
        sums[l][0] += p[0];
        sums[l][1] += p[1];
        counts[l] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let n = n.max(1) as f64;
            [s[0] / n, s[1] / n]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize) -> KMeans {
        KMeans {
            k,
            seed: 42,
            n_init: 10,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }

    /// Four tight groups around the given centers, three points each.
    fn blobs(centers: &[Point]) -> Vec<Point> {
        centers
            .iter()
            .flat_map(|c| {
                [
                    [c[0] - 1.0, c[1]],
                    [c[0], c[1] + 1.0],
                    [c[0] + 1.0, c[1] - 1.0],
                ]
            })
            .collect()
    }

    #[test]
    fn test_separates_well_spaced_groups() {
        let points = blobs(&[[0.0, 0.0], [100.0, 0.0], [0.0, 100.0], [100.0, 100.0]]);
        let fit = params(4).fit(&points).unwrap();

        for group in fit.labels.chunks(3) {
            assert!(group.iter().all(|&l| l == group[0]), "group split: {:?}", fit.labels);
        }
        let mut firsts: Vec<usize> = fit.labels.chunks(3).map(|g| g[0]).collect();
        firsts.sort_unstable();
        firsts.dedup();
        assert_eq!(firsts.len(), 4);
    }

    #[test]
    fn test_same_seed_same_result() {
        let points = blobs(&[[3.0, 7.0], [40.0, 2.0], [11.0, 90.0], [60.0, 55.0]]);
        let a = params(4).fit(&points).unwrap();
        let b = params(4).fit(&points).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_cluster_non_empty() {
        // Exactly k distinct points plus duplicates
        let points = vec![
            [0.0, 0.0],
            [0.0, 0.0],
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [3.0, 0.0],
        ];
        let fit = params(4).fit(&points).unwrap();
        for c in 0..4 {
            assert!(fit.members(c).count() > 0, "cluster {c} empty: {:?}", fit.labels);
        }
    }

    #[test]
    fn test_too_few_distinct_points() {
        let points = vec![[0.0, 0.0], [0.0, 0.0], [1.0, 1.0], [2.0, 2.0]];
        assert_eq!(count_distinct_up_to(&points, 4), 3);
        assert!(params(4).fit(&points).is_none());
        assert!(params(0).fit(&points).is_none());
    }

    #[test]
    fn test_distinct_count_stops_at_limit() {
        let points: Vec<Point> = (0..1000).map(|i| [f64::from(i), 0.0]).collect();
        assert_eq!(count_distinct_up_to(&points, 4), 4);
        assert_eq!(count_distinct_up_to(&points[..2], 4), 2);
        assert_eq!(count_distinct_up_to(&points, 0), 0);
    }

    #[test]
    fn test_repair_moves_farthest_point() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [10.0, 0.0]];
        let centroids = vec![[0.5, 0.0], [100.0, 100.0]];
        let mut labels = vec![0, 0, 0];
        repair_empty(&points, &mut labels, &centroids, 2);
        assert_eq!(labels, vec![0, 0, 1]);
    }
}
