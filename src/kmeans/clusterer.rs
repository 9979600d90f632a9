use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    aggregators_helper::{args, float_value, AggregateError, Result},
    kmeans::weighted_index,
    ExecConfig,
};

const NAME: &str = "kmeans";

/// One output cluster. `mean_sq_dist` and `count` are only meaningful after
/// `KMeans::fit` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub center: Vec<f64>,
    pub mean_sq_dist: f64,
    pub count: usize,
}

impl Cluster {
    /// `center` followed by the mean squared distance and the point count, M + 2 values.
    pub fn to_row(&self) -> Vec<f64> {
        let mut row = self.center.clone();
        row.push(self.mean_sq_dist);
        row.push(self.count as f64);
        row
    }
}

/// K-means with k-means++ seeding and Lloyd iterations.
///
/// Randomness is injected so that a seeded rng reproduces the same clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
}

fn squared_dist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index and squared distance of the nearest center; the lowest index wins ties.
fn nearest(centers: &[Vec<f64>], point: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = squared_dist(c, point);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

impl KMeans {
    pub fn new(k: i64, max_iterations: i64) -> Result<Self> {
        if k <= 0 {
            return Err(AggregateError::invalid_argument(NAME, format!("K should be positive, got {k}")));
        }
        let max_iterations = usize::try_from(max_iterations).map_err(|_| {
            AggregateError::invalid_argument(NAME, format!("max_iterations should be nonnegative, got {max_iterations}"))
        })?;
        Ok(Self { k: k as usize, max_iterations })
    }

    pub fn k(&self) -> usize { self.k }

    pub fn fit<R: Rng + ?Sized>(&self, points: &[Vec<f64>], rng: &mut R) -> Result<Vec<Cluster>> {
        if points.len() < self.k {
            return Ok(points
                .iter()
                .map(|p| Cluster { center: p.clone(), mean_sq_dist: 0.0, count: 1 })
                .collect());
        }
        let dim = points[0].len();
        if let Some((i, p)) = points.iter().enumerate().find(|(_, p)| p.len() != dim) {
            return Err(AggregateError::invalid_argument(
                NAME,
                format!("point {i} has {} coordinates, expected {dim}", p.len()),
            ));
        }

        let mut centers = self.seed(points, rng);
        let mut assignments: Vec<Option<usize>> = vec![None; points.len()];
        let mut converged = false;

        for iteration in 0..self.max_iterations {
            let changed = assign(&centers, points, &mut assignments);
            trace!(iteration, changed, "kmeans assignment pass");
            if changed == 0 {
                converged = true;
                debug!(iterations = iteration + 1, k = self.k, n = points.len(), "kmeans converged");
                break;
            }
            update_centers(&mut centers, points, &assignments, dim);
        }
        if !converged {
            // centers moved after the last pass; stats must describe the final centers
            assign(&centers, points, &mut assignments);
            debug!(max_iterations = self.max_iterations, k = self.k, "kmeans hit the iteration bound");
        }

        let mut sums = vec![0.0_f64; self.k];
        let mut counts = vec![0_usize; self.k];
        for (point, a) in points.iter().zip(&assignments) {
            if let Some(c) = *a {
                sums[c] += squared_dist(&centers[c], point);
                counts[c] += 1;
            }
        }
        Ok(centers
            .into_iter()
            .zip(sums.into_iter().zip(counts))
            .map(|(center, (sum, count))| Cluster {
                center,
                mean_sq_dist: if count == 0 { 0.0 } else { sum / count as f64 },
                count,
            })
            .collect())
    }

    /// `fit` driven by the configured random source: `kmeans_seed` when set,
    /// a fresh OS seed otherwise.
    pub fn fit_with_config(&self, points: &[Vec<f64>], cfg: &ExecConfig) -> Result<Vec<Cluster>> {
        self.fit(points, &mut cfg.rng())
    }

    /// k-means++: first center uniform, each next one drawn with probability
    /// proportional to the squared distance to the closest chosen center.
    fn seed<R: Rng + ?Sized>(&self, points: &[Vec<f64>], rng: &mut R) -> Vec<Vec<f64>> {
        let mut centers = Vec::with_capacity(self.k);
        centers.push(points[rng.random_range(0..points.len())].clone());
        let mut dist2s: Vec<f64> = points.iter().map(|p| squared_dist(&centers[0], p)).collect();
        while centers.len() < self.k {
            let Some(next) = weighted_index(&dist2s, rng) else { break };
            let center = points[next].clone();
            for (d, p) in dist2s.iter_mut().zip(points) {
                *d = d.min(squared_dist(&center, p));
            }
            centers.push(center);
        }
        centers
    }
}

/// Reassigns every point to its nearest center and returns how many moved.
fn assign(centers: &[Vec<f64>], points: &[Vec<f64>], assignments: &mut [Option<usize>]) -> usize {
    let mut changed = 0;
    for (point, slot) in points.iter().zip(assignments.iter_mut()) {
        let (best, _) = nearest(centers, point);
        if *slot != Some(best) {
            *slot = Some(best);
            changed += 1;
        }
    }
    changed
}

/// Moves each center to the mean of its points. A center with no points keeps
/// its previous position.
fn update_centers(centers: &mut [Vec<f64>], points: &[Vec<f64>], assignments: &[Option<usize>], dim: usize) {
    let mut sums = vec![vec![0.0_f64; dim]; centers.len()];
    let mut counts = vec![0_usize; centers.len()];
    for (point, a) in points.iter().zip(assignments) {
        let Some(c) = *a else { continue };
        counts[c] += 1;
        for (s, x) in sums[c].iter_mut().zip(point) {
            *s += x;
        }
    }
    for ((center, sum), count) in centers.iter_mut().zip(sums).zip(counts) {
        if count > 0 {
            *center = sum.into_iter().map(|s| s / count as f64).collect();
        }
    }
}

/// JSON entry point for `kmeans(points, k, max_iterations)`.
///
/// Any null argument gives null. The result is an array of clusters, each the
/// center coordinates followed by the mean squared distance and the count.
pub fn kmeans_json<R: Rng + ?Sized>(points: &Value, k: &Value, max_iterations: &Value, rng: &mut R) -> Result<Value> {
    let (Some(raw), Some(k), Some(max_iterations)) = (
        args::opt_array(NAME, points)?,
        args::opt_i64(NAME, k)?,
        args::opt_i64(NAME, max_iterations)?,
    ) else {
        return Ok(Value::Null);
    };
    let model = KMeans::new(k, max_iterations)?;
    let points = raw.iter().map(|p| args::f64_list(NAME, p)).collect::<Result<Vec<_>>>()?;
    let clusters = model.fit(&points, rng)?;
    Ok(Value::Array(
        clusters
            .iter()
            .map(|c| Value::Array(c.to_row().into_iter().map(float_value).collect()))
            .collect(),
    ))
}
