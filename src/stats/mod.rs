//! Statistical analysis module.
//!
//! Per-feature differential testing between two sample groups, plus
//! multiple-testing correction of the resulting p-values.

pub mod ttest;

pub use ttest::{ttest_ind, TTest, TTestKind};

use crate::count_table::CountTable;
use crate::metadata::GroupIndices;
use serde::{Deserialize, Serialize};

/// Test result for a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatResult {
    pub feature_id: String,
    pub statistic: f64,   // t statistic, treated minus control
    pub p_value: f64,     // Two-sided p-value
    pub neg_log10_p: f64, // -log10(p_value), the volcano y axis
    pub p_adjusted: f64,  // Benjamini-Hochberg over the retained features
}

/// Type alias for the collection of results from an analysis.
pub type AnalysisResults = Vec<StatResult>;

/// Runs a two-sample t-test on every feature of `table`.
///
/// Features whose test is undefined, or whose p-value underflows to zero so
/// that -log10(p) is infinite, are left out of the results. Output keeps
/// the table's row order.
pub fn run_ttest_genes(table: &CountTable, groups: &GroupIndices, kind: TTestKind) -> AnalysisResults {
    let counts = table.counts_matrix();
    let mut results = Vec::with_capacity(counts.nrows());

    for (row, feature_id) in counts.rows().into_iter().zip(table.feature_names()) {
        let treated: Vec<f64> = groups.treated.iter().map(|&c| row[c]).collect();
        let control: Vec<f64> = groups.control.iter().map(|&c| row[c]).collect();

        let Some(test) = ttest_ind(&treated, &control, kind) else {
            continue;
        };
        let neg_log10_p = -test.p_value.log10();
        if !neg_log10_p.is_finite() {
            continue;
        }
        results.push(StatResult {
            feature_id: feature_id.clone(),
            statistic: test.statistic,
            p_value: test.p_value,
            neg_log10_p,
            p_adjusted: test.p_value,
        });
    }

    let dropped = counts.nrows() - results.len();
    if dropped > 0 {
        log::warn!(
            "Dropped {} of {} features with an undefined t-test",
            dropped,
            counts.nrows()
        );
    }
    adjust_pvalues_bh(&mut results);
    results
}

/// Adjusts p-values for multiple testing using Benjamini-Hochberg method.
pub fn adjust_pvalues_bh(results: &mut [StatResult]) {
    let m = results.len();
    if m == 0 {
        return;
    }

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| results[a].p_value.total_cmp(&results[b].p_value));

    // Walk from the largest p-value down so adjusted values stay monotone.
    let mut last_padj = 1.0_f64;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let padj = results[idx].p_value * m as f64 / (rank + 1) as f64;
        let current = padj.min(last_padj).min(1.0);
        results[idx].p_adjusted = current;
        last_padj = current;
    }
}
