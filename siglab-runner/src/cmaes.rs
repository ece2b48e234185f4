//! CMA-ES — covariance matrix adaptation evolution strategy.
//!
//! A (μ/μ_w, λ) strategy over the normalized `[0,1]^n` genotype space:
//! rank-weighted recombination, cumulative step-size adaptation, and
//! rank-one + rank-μ covariance updates. Sampling draws standard normals
//! via the Box-Muller transform from one seeded `StdRng`, so a run is fully
//! determined by its seed. Samples are clamped to the unit cube — bound
//! handling is projection, and the decoder treats it the same way.
//!
//! The eigendecomposition uses cyclic Jacobi rotations; at the dimension
//! counts involved here (tens) a fresh decomposition per generation is
//! cheap next to one backtest.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Search-distribution state.
#[derive(Debug, Clone)]
pub struct Cmaes {
    dim: usize,
    lambda: usize,
    mu: usize,
    weights: Vec<f64>,
    mu_eff: f64,

    cc: f64,
    cs: f64,
    c1: f64,
    cmu: f64,
    damps: f64,
    chi_n: f64,

    mean: Vec<f64>,
    sigma: f64,
    cov: Vec<Vec<f64>>,
    path_cov: Vec<f64>,
    path_sigma: Vec<f64>,

    generation: usize,
    rng: StdRng,
}

impl Cmaes {
    /// `x0` is the initial mean (inside the unit cube), `sigma0` the initial
    /// step size, `lambda` the population size.
    pub fn new(x0: Vec<f64>, sigma0: f64, lambda: usize, seed: u64) -> Self {
        let dim = x0.len();
        assert!(dim >= 1, "CMA-ES needs at least one dimension");
        assert!(lambda >= 4, "population size must be >= 4");
        assert!(sigma0 > 0.0, "sigma0 must be positive");

        let n = dim as f64;
        let mu = lambda / 2;

        // Log-rank recombination weights, normalized to sum 1.
        let raw: Vec<f64> = (0..mu)
            .map(|i| ((mu as f64) + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mu_eff / n) / (n + 4.0 + 2.0 * mu_eff / n);
        let cs = (mu_eff + 2.0) / (n + mu_eff + 5.0);
        let c1 = 2.0 / ((n + 1.3).powi(2) + mu_eff);
        let cmu = (1.0 - c1)
            .min(2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((n + 2.0).powi(2) + mu_eff));
        let damps = 1.0 + 2.0 * (((mu_eff - 1.0) / (n + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let chi_n = n.sqrt() * (1.0 - 1.0 / (4.0 * n) + 1.0 / (21.0 * n * n));

        let mut cov = vec![vec![0.0; dim]; dim];
        for (i, row) in cov.iter_mut().enumerate() {
            row[i] = 1.0;
        }

        Self {
            dim,
            lambda,
            mu,
            weights,
            mu_eff,
            cc,
            cs,
            c1,
            cmu,
            damps,
            chi_n,
            mean: x0,
            sigma: sigma0,
            cov,
            path_cov: vec![0.0; dim],
            path_sigma: vec![0.0; dim],
            generation: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn lambda(&self) -> usize {
        self.lambda
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Sample λ candidates, clamped to the unit cube.
    pub fn ask(&mut self) -> Vec<Vec<f64>> {
        let (basis, scales) = eigen_decompose(&self.cov);
        let mut samples = Vec::with_capacity(self.lambda);
        for _ in 0..self.lambda {
            // y = B · (D ∘ z), x = m + σ·y
            let z: Vec<f64> = (0..self.dim).map(|_| standard_normal(&mut self.rng)).collect();
            let mut x = self.mean.clone();
            for (row, xi) in x.iter_mut().enumerate() {
                let mut y = 0.0;
                for col in 0..self.dim {
                    y += basis[row][col] * scales[col] * z[col];
                }
                *xi = (*xi + self.sigma * y).clamp(0.0, 1.0);
            }
            samples.push(x);
        }
        samples
    }

    /// Update the distribution from a scored population (maximization).
    ///
    /// `solutions` must be exactly what `ask` returned; `fitness[i]` scores
    /// `solutions[i]`. Ranking is by descending fitness with index order
    /// breaking ties, so the update is deterministic.
    pub fn tell(&mut self, solutions: &[Vec<f64>], fitness: &[f64]) {
        assert_eq!(solutions.len(), self.lambda, "population size mismatch");
        assert_eq!(solutions.len(), fitness.len(), "fitness length mismatch");

        let mut order: Vec<usize> = (0..solutions.len()).collect();
        order.sort_by(|&a, &b| {
            fitness[b]
                .partial_cmp(&fitness[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let old_mean = self.mean.clone();
        let sigma = self.sigma;

        // Selected steps in sampling space: y_k = (x_k - m) / σ
        let selected: Vec<Vec<f64>> = order[..self.mu]
            .iter()
            .map(|&idx| {
                (0..self.dim)
                    .map(|d| (solutions[idx][d] - old_mean[d]) / sigma)
                    .collect()
            })
            .collect();

        let mut y_w = vec![0.0; self.dim];
        for (k, y) in selected.iter().enumerate() {
            for d in 0..self.dim {
                y_w[d] += self.weights[k] * y[d];
            }
        }

        // Mean update
        for d in 0..self.dim {
            self.mean[d] = old_mean[d] + sigma * y_w[d];
        }

        // Step-size path uses C^{-1/2}·y_w
        let (basis, scales) = eigen_decompose(&self.cov);
        let whitened = whiten(&basis, &scales, &y_w);
        let cs_norm = (self.cs * (2.0 - self.cs) * self.mu_eff).sqrt();
        for d in 0..self.dim {
            self.path_sigma[d] = (1.0 - self.cs) * self.path_sigma[d] + cs_norm * whitened[d];
        }

        let ps_norm = norm(&self.path_sigma);
        let expected = (1.0 - (1.0 - self.cs).powi(2 * (self.generation as i32 + 1))).sqrt();
        let h_sigma = if ps_norm / expected / self.chi_n < 1.4 + 2.0 / (self.dim as f64 + 1.0) {
            1.0
        } else {
            0.0
        };

        // Covariance path
        let cc_norm = (self.cc * (2.0 - self.cc) * self.mu_eff).sqrt();
        for d in 0..self.dim {
            self.path_cov[d] = (1.0 - self.cc) * self.path_cov[d] + h_sigma * cc_norm * y_w[d];
        }

        // Covariance update: decay + rank-one + rank-μ
        let delta_h = (1.0 - h_sigma) * self.cc * (2.0 - self.cc);
        let decay = 1.0 - self.c1 - self.cmu;
        for row in 0..self.dim {
            for col in 0..self.dim {
                let mut value = (decay + self.c1 * delta_h) * self.cov[row][col]
                    + self.c1 * self.path_cov[row] * self.path_cov[col];
                for (k, y) in selected.iter().enumerate() {
                    value += self.cmu * self.weights[k] * y[row] * y[col];
                }
                self.cov[row][col] = value;
            }
        }

        // Step-size adaptation
        self.sigma =
            (sigma * ((self.cs / self.damps) * (ps_norm / self.chi_n - 1.0)).exp()).clamp(1e-12, 1.0);

        self.generation += 1;
    }
}

/// One standard normal draw via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>(); // (0, 1], keeps the log finite
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// C^{-1/2}·v given the eigenbasis and per-axis scales (√eigenvalues).
fn whiten(basis: &[Vec<f64>], scales: &[f64], v: &[f64]) -> Vec<f64> {
    let dim = v.len();
    // Bᵀ·v
    let mut projected = vec![0.0; dim];
    for col in 0..dim {
        for row in 0..dim {
            projected[col] += basis[row][col] * v[row];
        }
    }
    // D⁻¹
    for (p, s) in projected.iter_mut().zip(scales) {
        *p /= s.max(1e-12);
    }
    // B·(D⁻¹·Bᵀ·v)
    let mut out = vec![0.0; dim];
    for row in 0..dim {
        for col in 0..dim {
            out[row] += basis[row][col] * projected[col];
        }
    }
    out
}

/// Symmetric eigendecomposition by cyclic Jacobi rotations.
///
/// Returns (basis, scales): `basis[row][col]` holds the col-th eigenvector,
/// `scales[col]` the square root of its (floored-positive) eigenvalue.
fn eigen_decompose(matrix: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let dim = matrix.len();
    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut basis = vec![vec![0.0; dim]; dim];
    for (i, row) in basis.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    const MAX_SWEEPS: usize = 64;
    const TOL: f64 = 1e-14;

    for _ in 0..MAX_SWEEPS {
        let mut off_diag = 0.0;
        for row in 0..dim {
            for col in (row + 1)..dim {
                off_diag += a[row][col] * a[row][col];
            }
        }
        if off_diag.sqrt() < TOL {
            break;
        }

        for p in 0..dim {
            for q in (p + 1)..dim {
                if a[p][q].abs() < TOL {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..dim {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..dim {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in basis.iter_mut() {
                    let bp = row[p];
                    let bq = row[q];
                    row[p] = c * bp - s * bq;
                    row[q] = s * bp + c * bq;
                }
            }
        }
    }

    let scales: Vec<f64> = (0..dim).map(|i| a[i][i].max(1e-20).sqrt()).collect();
    (basis, scales)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_seeds_sample_identically() {
        let mut a = Cmaes::new(vec![0.5; 6], 0.3, 8, 42);
        let mut b = Cmaes::new(vec![0.5; 6], 0.3, 8, 42);
        assert_eq!(a.ask(), b.ask());
    }

    #[test]
    fn different_seeds_sample_differently() {
        let mut a = Cmaes::new(vec![0.5; 6], 0.3, 8, 42);
        let mut b = Cmaes::new(vec![0.5; 6], 0.3, 8, 43);
        assert_ne!(a.ask(), b.ask());
    }

    #[test]
    fn samples_stay_in_the_unit_cube() {
        let mut cma = Cmaes::new(vec![0.5; 10], 0.8, 16, 7);
        for _ in 0..5 {
            for x in cma.ask() {
                assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
            }
        }
    }

    #[test]
    fn converges_on_a_quadratic_bowl() {
        // Maximize -(x - 0.7)²: the mean should migrate to ~0.7 per axis.
        let dim = 5;
        let mut cma = Cmaes::new(vec![0.2; dim], 0.3, 16, 42);
        for _ in 0..120 {
            let solutions = cma.ask();
            let fitness: Vec<f64> = solutions
                .iter()
                .map(|x| -x.iter().map(|v| (v - 0.7).powi(2)).sum::<f64>())
                .collect();
            cma.tell(&solutions, &fitness);
        }
        for &m in cma.mean() {
            assert!(
                (m - 0.7).abs() < 0.05,
                "mean should converge near 0.7, got {m}"
            );
        }
        assert!(cma.sigma() < 0.3, "step size should shrink near the optimum");
    }

    #[test]
    fn tell_is_deterministic_under_ties() {
        let run = || {
            let mut cma = Cmaes::new(vec![0.5; 4], 0.3, 8, 9);
            for _ in 0..10 {
                let solutions = cma.ask();
                let fitness = vec![1.0; solutions.len()]; // all tied
                cma.tell(&solutions, &fitness);
            }
            cma.mean().to_vec()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn eigen_decompose_recovers_a_diagonal() {
        let matrix = vec![vec![4.0, 0.0], vec![0.0, 9.0]];
        let (_, scales) = eigen_decompose(&matrix);
        let mut sorted = scales.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((sorted[0] - 2.0).abs() < 1e-10);
        assert!((sorted[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn eigen_decompose_handles_correlation() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3.
        let matrix = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let (basis, scales) = eigen_decompose(&matrix);
        let mut eigs: Vec<f64> = scales.iter().map(|s| s * s).collect();
        eigs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((eigs[0] - 1.0).abs() < 1e-10);
        assert!((eigs[1] - 3.0).abs() < 1e-10);
        // Basis columns are orthonormal.
        let dot = basis[0][0] * basis[0][1] + basis[1][0] * basis[1][1];
        assert!(dot.abs() < 1e-10);
    }

    #[test]
    fn standard_normal_has_sane_moments() {
        let mut rng = StdRng::seed_from_u64(1);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| standard_normal(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean} too far from 0");
        assert!((var - 1.0).abs() < 0.05, "variance {var} too far from 1");
    }
}
