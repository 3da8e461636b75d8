//! Pairwise distance metrics between observations (matrix rows).

use clap::ValueEnum;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Distance or dissimilarity measure between two observations.
///
/// Dice works on the raw values: matches are `sum(u * v)` and mismatches
/// count the positions where `u != v`. The other boolean measures
/// (rogerstanimoto, russellrao, sokalmichener, sokalsneath, yule) treat any
/// non-zero value as present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Braycurtis,
    Canberra,
    Chebyshev,
    Cityblock,
    Correlation,
    Cosine,
    Dice,
    #[default]
    Euclidean,
    Hamming,
    Jaccard,
    Jensenshannon,
    Minkowski,
    Rogerstanimoto,
    Russellrao,
    Seuclidean,
    Sokalmichener,
    Sokalsneath,
    Sqeuclidean,
    Yule,
}

/// Exponent used by [`DistanceMetric::Minkowski`].
pub const MINKOWSKI_P: f64 = 2.0;

#[derive(Debug, Default)]
struct BoolCounts {
    tt: f64,
    tf: f64,
    ft: f64,
    ff: f64,
}

fn bool_counts(u: ArrayView1<f64>, v: ArrayView1<f64>) -> BoolCounts {
    let mut c = BoolCounts::default();
    for (&a, &b) in u.iter().zip(v.iter()) {
        match (a != 0.0, b != 0.0) {
            (true, true) => c.tt += 1.0,
            (true, false) => c.tf += 1.0,
            (false, true) => c.ft += 1.0,
            (false, false) => c.ff += 1.0,
        }
    }
    c
}

fn cosine(u: ArrayView1<f64>, v: ArrayView1<f64>) -> f64 {
    let uv = u.dot(&v);
    let uu = u.dot(&u);
    let vv = v.dot(&v);
    let dist = 1.0 - uv / (uu * vv).sqrt();
    // Rounding can push identical directions slightly below zero.
    if dist < 0.0 {
        0.0
    } else {
        dist
    }
}

/// Kullback-Leibler terms with the 0 * ln(0 / y) = 0 convention.
fn rel_entr(x: f64, y: f64) -> f64 {
    if x == 0.0 && y >= 0.0 {
        0.0
    } else if x > 0.0 && y > 0.0 {
        x * (x / y).ln()
    } else {
        f64::INFINITY
    }
}

impl DistanceMetric {
    /// Distance between `u` and `v`.
    ///
    /// `variances` holds per-coordinate variances and is only read by
    /// [`DistanceMetric::Seuclidean`]. Undefined cases (zero vectors under
    /// cosine, constant vectors under correlation, ...) yield NaN.
    pub fn distance(&self, u: ArrayView1<f64>, v: ArrayView1<f64>, variances: &[f64]) -> f64 {
        let diffs = || u.iter().zip(v.iter()).map(|(&a, &b)| a - b);
        let n = u.len() as f64;

        match self {
            DistanceMetric::Euclidean => diffs().map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Sqeuclidean => diffs().map(|d| d * d).sum(),
            DistanceMetric::Minkowski => diffs()
                .map(|d| d.abs().powf(MINKOWSKI_P))
                .sum::<f64>()
                .powf(1.0 / MINKOWSKI_P),
            DistanceMetric::Cityblock => diffs().map(f64::abs).sum(),
            DistanceMetric::Chebyshev => diffs().map(f64::abs).fold(0.0, f64::max),
            DistanceMetric::Seuclidean => diffs()
                .zip(variances)
                .map(|(d, &var)| d * d / var)
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Cosine => cosine(u, v),
            DistanceMetric::Correlation => {
                let uc = &u - u.mean().unwrap_or(f64::NAN);
                let vc = &v - v.mean().unwrap_or(f64::NAN);
                cosine(uc.view(), vc.view())
            }
            DistanceMetric::Canberra => u
                .iter()
                .zip(v.iter())
                .map(|(&a, &b)| {
                    let denom = a.abs() + b.abs();
                    if denom == 0.0 {
                        0.0
                    } else {
                        (a - b).abs() / denom
                    }
                })
                .sum(),
            DistanceMetric::Braycurtis => {
                let num: f64 = diffs().map(f64::abs).sum();
                let den: f64 = u.iter().zip(v.iter()).map(|(&a, &b)| (a + b).abs()).sum();
                num / den
            }
            DistanceMetric::Jensenshannon => {
                let (su, sv) = (u.sum(), v.sum());
                let total: f64 = u
                    .iter()
                    .zip(v.iter())
                    .map(|(&a, &b)| {
                        let (p, q) = (a / su, b / sv);
                        let m = (p + q) / 2.0;
                        rel_entr(p, m) + rel_entr(q, m)
                    })
                    .sum();
                (total / 2.0).sqrt()
            }
            DistanceMetric::Hamming => {
                u.iter().zip(v.iter()).filter(|(a, b)| a != b).count() as f64 / n
            }
            DistanceMetric::Jaccard => {
                let (mut nonzero, mut unequal) = (0.0, 0.0);
                for (&a, &b) in u.iter().zip(v.iter()) {
                    if a != 0.0 || b != 0.0 {
                        nonzero += 1.0;
                        if a != b {
                            unequal += 1.0;
                        }
                    }
                }
                if nonzero == 0.0 {
                    0.0
                } else {
                    unequal / nonzero
                }
            }
            DistanceMetric::Dice => {
                let (mut ntt, mut ndiff) = (0.0, 0.0);
                for (&a, &b) in u.iter().zip(v.iter()) {
                    ntt += a * b;
                    if a != b {
                        ndiff += 1.0;
                    }
                }
                ndiff / (2.0 * ntt + ndiff)
            }
            DistanceMetric::Rogerstanimoto | DistanceMetric::Sokalmichener => {
                let c = bool_counts(u, v);
                let r = 2.0 * (c.tf + c.ft);
                r / (c.tt + c.ff + r)
            }
            DistanceMetric::Russellrao => {
                let c = bool_counts(u, v);
                (n - c.tt) / n
            }
            DistanceMetric::Sokalsneath => {
                let c = bool_counts(u, v);
                let r = 2.0 * (c.tf + c.ft);
                r / (c.tt + r)
            }
            DistanceMetric::Yule => {
                let c = bool_counts(u, v);
                let half_r = c.tf * c.ft;
                if half_r == 0.0 {
                    0.0
                } else {
                    2.0 * half_r / (c.tt * c.ff + half_r)
                }
            }
        }
    }

    pub fn is_euclidean(&self) -> bool {
        matches!(self, DistanceMetric::Euclidean)
    }
}

/// Square, symmetric matrix of distances between the rows of `data`.
pub fn pairwise_distances(data: ArrayView2<f64>, metric: DistanceMetric) -> Array2<f64> {
    let n = data.nrows();
    let variances: Vec<f64> = match metric {
        DistanceMetric::Seuclidean => data
            .axis_iter(Axis(1))
            .map(|col| col.var(1.0))
            .collect(),
        _ => Vec::new(),
    };

    let mut dist = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d = metric.distance(data.row(i), data.row(j), &variances);
            dist[[i, j]] = d;
            dist[[j, i]] = d;
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    fn d(metric: DistanceMetric, u: &[f64], v: &[f64]) -> f64 {
        metric.distance(arr1(u).view(), arr1(v).view(), &[])
    }

    #[test]
    fn test_geometric_metrics() {
        let (u, v) = ([0.0, 3.0, 0.0], [4.0, 0.0, 0.0]);
        assert_relative_eq!(d(DistanceMetric::Euclidean, &u, &v), 5.0);
        assert_relative_eq!(d(DistanceMetric::Minkowski, &u, &v), 5.0);
        assert_relative_eq!(d(DistanceMetric::Sqeuclidean, &u, &v), 25.0);
        assert_relative_eq!(d(DistanceMetric::Cityblock, &u, &v), 7.0);
        assert_relative_eq!(d(DistanceMetric::Chebyshev, &u, &v), 4.0);
        assert_relative_eq!(d(DistanceMetric::Cosine, &u, &v), 1.0);
        assert_relative_eq!(d(DistanceMetric::Canberra, &u, &v), 2.0);
        assert_relative_eq!(d(DistanceMetric::Braycurtis, &u, &v), 1.0);
    }

    #[test]
    fn test_correlation() {
        assert_relative_eq!(
            d(DistanceMetric::Correlation, &[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]),
            0.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            d(DistanceMetric::Correlation, &[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]),
            2.0,
            epsilon = 1e-12
        );
        // Constant rows have no correlation.
        assert!(d(DistanceMetric::Correlation, &[1.0, 1.0, 1.0], &[3.0, 2.0, 1.0]).is_nan());
    }

    #[test]
    fn test_boolean_metrics() {
        let (u, v) = ([1.0, 0.0, 2.0, 0.0], [1.0, 1.0, 0.0, 0.0]);
        // tt = 1, tf = 1, ft = 1, ff = 1
        assert_relative_eq!(d(DistanceMetric::Hamming, &u, &v), 0.5);
        assert_relative_eq!(d(DistanceMetric::Jaccard, &u, &v), 2.0 / 3.0);
        assert_relative_eq!(d(DistanceMetric::Dice, &u, &v), 0.5);
        assert_relative_eq!(d(DistanceMetric::Rogerstanimoto, &u, &v), 4.0 / 6.0);
        assert_relative_eq!(d(DistanceMetric::Russellrao, &u, &v), 0.75);
        assert_relative_eq!(d(DistanceMetric::Sokalsneath, &u, &v), 0.8);
        assert_relative_eq!(d(DistanceMetric::Yule, &u, &v), 1.0);
        assert_relative_eq!(d(DistanceMetric::Jaccard, &[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_dice_uses_raw_values() {
        // Matches 2*2 + 3*1 = 7, one unequal position.
        assert_relative_eq!(d(DistanceMetric::Dice, &[2.0, 3.0], &[2.0, 1.0]), 1.0 / 15.0);
        assert_relative_eq!(d(DistanceMetric::Dice, &[0.0, 4.0], &[0.0, 4.0]), 0.0);
    }

    #[test]
    fn test_jensenshannon_identical_is_zero() {
        assert_relative_eq!(
            d(DistanceMetric::Jensenshannon, &[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]),
            0.0,
            epsilon = 1e-12
        );
        let disjoint = d(DistanceMetric::Jensenshannon, &[1.0, 0.0], &[0.0, 1.0]);
        assert_relative_eq!(disjoint, std::f64::consts::LN_2.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_pairwise_is_symmetric_with_zero_diagonal() {
        let data = arr2(&[[1.0, 2.0], [4.0, 6.0], [0.0, 0.0]]);
        let dist = pairwise_distances(data.view(), DistanceMetric::Euclidean);
        assert_eq!(dist.dim(), (3, 3));
        assert_relative_eq!(dist[[0, 1]], 5.0);
        assert_eq!(dist, dist.t());
        assert!(dist.diag().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_seuclidean_uses_column_variance() {
        // Column variances: 4.5 and 0.5
        let data = arr2(&[[0.0, 0.0], [3.0, 1.0]]);
        let dist = pairwise_distances(data.view(), DistanceMetric::Seuclidean);
        assert_relative_eq!(dist[[0, 1]], (9.0 / 4.5 + 1.0 / 0.5_f64).sqrt(), epsilon = 1e-12);
    }
}
