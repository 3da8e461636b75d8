//! Independent two-sample t-test.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Variance assumption for the two-sample test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TTestKind {
    /// Student's test with pooled variance (equal variances assumed).
    #[default]
    Student,
    /// Welch's test with Satterthwaite degrees of freedom.
    Welch,
}

/// Outcome of a defined t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
    pub df: f64,
}

/// Two-sided p-value of `stat` under Student's t with `df` degrees of freedom.
pub fn two_sided_pvalue(stat: f64, df: f64) -> Option<f64> {
    if !stat.is_finite() || !(df > 0.0) {
        return None;
    }
    let t_dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some(2.0 * t_dist.cdf(-stat.abs()))
}

/// Compares the means of `a` and `b`; the statistic is positive when `a`
/// has the larger mean.
///
/// Returns `None` when the test is undefined: fewer than two observations
/// in a group, zero variance, or a non-finite statistic.
pub fn ttest_ind(a: &[f64], b: &[f64], kind: TTestKind) -> Option<TTest> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (mean1, mean2) = (a.iter().mean(), b.iter().mean());
    let (var1, var2) = (a.iter().variance(), b.iter().variance());

    let (std_err, df) = match kind {
        TTestKind::Student => {
            let df = n1 + n2 - 2.0;
            let pooled = ((n1 - 1.0) * var1 + (n2 - 1.0) * var2) / df;
            ((pooled * (1.0 / n1 + 1.0 / n2)).sqrt(), df)
        }
        TTestKind::Welch => {
            let (v1, v2) = (var1 / n1, var2 / n2);
            let df = (v1 + v2).powi(2) / (v1.powi(2) / (n1 - 1.0) + v2.powi(2) / (n2 - 1.0));
            ((v1 + v2).sqrt(), df)
        }
    };
    if !(std_err > 0.0) {
        return None;
    }

    let statistic = (mean1 - mean2) / std_err;
    let p_value = two_sided_pvalue(statistic, df)?;
    Some(TTest {
        statistic,
        p_value,
        df,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_student_matches_reference() {
        // Pooled variance 5/3, t = -2 / sqrt(5/6), df = 6.
        let t = ttest_ind(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0], TTestKind::Student).unwrap();
        assert_relative_eq!(t.statistic, -2.190890, epsilon = 1e-5);
        assert_relative_eq!(t.p_value, 0.07099, epsilon = 1e-4);
        assert_relative_eq!(t.df, 6.0);
    }

    #[test]
    fn test_welch_unequal_variances() {
        let a = [10.0, 12.0, 11.0, 13.0];
        let b = [1.0, 30.0, 2.0, 25.0, 4.0];
        let student = ttest_ind(&a, &b, TTestKind::Student).unwrap();
        let welch = ttest_ind(&a, &b, TTestKind::Welch).unwrap();
        assert!(welch.df < student.df);
        assert_relative_eq!(welch.statistic.signum(), student.statistic.signum());
    }

    #[test]
    fn test_zero_variance_is_undefined() {
        assert!(ttest_ind(&[5.0, 5.0, 5.0], &[5.0, 5.0], TTestKind::Student).is_none());
        assert!(ttest_ind(&[5.0, 5.0, 5.0], &[5.0, 5.0], TTestKind::Welch).is_none());
    }

    #[test]
    fn test_single_observation_is_undefined() {
        assert!(ttest_ind(&[1.0], &[2.0, 3.0], TTestKind::Student).is_none());
        assert!(ttest_ind(&[], &[2.0, 3.0], TTestKind::Welch).is_none());
    }

    #[test]
    fn test_pvalue_symmetric_and_bounded() {
        let p1 = two_sided_pvalue(2.0, 5.0).unwrap();
        let p2 = two_sided_pvalue(-2.0, 5.0).unwrap();
        assert_relative_eq!(p1, p2);
        assert!(p1 > 0.0 && p1 < 1.0);
        assert_relative_eq!(two_sided_pvalue(0.0, 5.0).unwrap(), 1.0);
        assert!(two_sided_pvalue(f64::INFINITY, 5.0).is_none());
        assert!(two_sided_pvalue(1.0, 0.0).is_none());
    }
}
