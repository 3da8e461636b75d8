//! Provides functions for normalizing count data.
//!
//! Each transform returns a new table together with the status messages a
//! host shows next to the chart.

use crate::count_table::CountTable;
use anyhow::Result;
use clap::ValueEnum;
use log::{info, warn};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

/// Column normalization applied before clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Raw values.
    #[default]
    None,
    /// Each sample divided by its total.
    Proportion,
    /// Centered log ratio.
    Clr,
}

/// A normalized table and the messages describing what was done to it.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: CountTable,
    pub messages: Vec<String>,
}

/// Normalizes the counts in a CountTable using the given mode.
pub fn normalize(table: &CountTable, mode: NormalizationMode) -> Result<Normalized> {
    let mut messages = Vec::new();
    let counts = match mode {
        NormalizationMode::None => table.counts_matrix().clone(),
        NormalizationMode::Proportion => normalize_proportion(table, &mut messages),
        NormalizationMode::Clr => normalize_clr(table, &mut messages),
    };
    info!("Applied '{:?}' normalization to {:?} matrix", mode, counts.dim());

    Ok(Normalized {
        table: table.with_counts(counts)?,
        messages,
    })
}

/// Divides every value by its column total, so each sample sums to 1.
///
/// Columns summing to zero are left as zeros.
fn normalize_proportion(table: &CountTable, messages: &mut Vec<String>) -> Array2<f64> {
    let mut counts = table.counts_matrix().clone();
    let library_sizes = counts.sum_axis(Axis(0)); // Sum counts per sample (column)

    for (c, (mut col, &total)) in counts
        .axis_iter_mut(Axis(1))
        .zip(library_sizes.iter())
        .enumerate()
    {
        if total > 0.0 {
            col /= total;
        } else {
            warn!("Sample {} has zero total counts; leaving it at zero.", table.sample_names[c]);
            messages.push(format!(
                "Sample {} has no counts and was left at zero.",
                table.sample_names[c]
            ));
        }
    }

    messages.push("Values were normalized to proportions (each sample sums to 1).".to_string());
    counts
}

/// Centered log ratio, scaled by the per-sample mean of finite log10 values.
///
/// 1. Take log10 of every value (zeros become -inf).
/// 2. Per column, average only the finite log values.
/// 3. Divide the column's log values by that average.
/// 4. Clip at the smallest finite value across the usable columns, so no
///    -inf reaches the distance computations.
///
/// A column without any finite log value, or whose average is zero, has no
/// usable reference; it is emitted as zeros, left out of the clip, and
/// reported in `messages`.
fn normalize_clr(table: &CountTable, messages: &mut Vec<String>) -> Array2<f64> {
    let mut values = table.counts_matrix().mapv(f64::log10);
    let mut degenerate = vec![false; values.ncols()];

    for (c, mut col) in values.axis_iter_mut(Axis(1)).enumerate() {
        let finite: Vec<f64> = col.iter().copied().filter(|v| v.is_finite()).collect();
        let mean = finite.iter().sum::<f64>() / finite.len() as f64;

        if finite.is_empty() || mean == 0.0 || !mean.is_finite() {
            warn!(
                "Sample {} has no usable log reference for CLR; setting it to zero.",
                table.sample_names[c]
            );
            messages.push(format!(
                "Sample {} has no log-scale reference and was set to zero.",
                table.sample_names[c]
            ));
            col.fill(0.0);
            degenerate[c] = true;
        } else {
            col /= mean;
        }
    }

    // Zeroed columns neither set the floor nor get clipped.
    let usable: Vec<usize> = (0..values.ncols()).filter(|&c| !degenerate[c]).collect();
    let floor = usable
        .iter()
        .flat_map(|&c| values.column(c).into_iter().copied())
        .filter(|v| v.is_finite())
        .fold(f64::INFINITY, f64::min);
    let floor = if floor.is_finite() { floor } else { 0.0 };
    for &c in &usable {
        values
            .column_mut(c)
            .mapv_inplace(|v| if v.is_finite() { v.max(floor) } else { floor });
    }

    messages.push(
        "Values were transformed by centered log ratio (log10 counts divided by the mean finite log value per sample)."
            .to_string(),
    );
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count_table::tests::create_test_table;
    use approx::assert_relative_eq;
    use ndarray::arr2;

    #[test]
    fn test_normalize_none() {
        let table = create_test_table(arr2(&[[1.0, 2.0], [3.0, 0.0]]));
        let normalized = normalize(&table, NormalizationMode::None).unwrap();
        assert_eq!(normalized.table, table);
        assert!(normalized.messages.is_empty());
    }

    #[test]
    fn test_proportion_columns_sum_to_one() {
        let table = create_test_table(arr2(&[
            [10.0, 20.0, 30.0],
            [5.0, 1.0, 15.0],
            [2.0, 40.0, 60.0],
        ]));
        let normalized = normalize(&table, NormalizationMode::Proportion).unwrap();

        for col in normalized.table.counts_matrix().columns() {
            assert_relative_eq!(col.sum(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(normalized.table.counts_matrix()[[0, 0]], 10.0 / 17.0);
        assert_eq!(normalized.messages.len(), 1);
    }

    #[test]
    fn test_proportion_zero_column() {
        let table = create_test_table(arr2(&[[0.0, 2.0], [0.0, 2.0]]));
        let normalized = normalize(&table, NormalizationMode::Proportion).unwrap();
        let counts = normalized.table.counts_matrix();
        assert!(counts.iter().all(|v| v.is_finite()));
        assert_eq!(counts.column(0).to_vec(), vec![0.0, 0.0]);
        assert_eq!(normalized.messages.len(), 2);
    }

    #[test]
    fn test_clr_scenario_has_no_infinities() {
        // Top three rows of [[0,10,20],[5,5,5],[100,1,1],[0,0,0]].
        let table = create_test_table(arr2(&[
            [0.0, 10.0, 20.0],
            [5.0, 5.0, 5.0],
            [100.0, 1.0, 1.0],
        ]));
        let normalized = normalize(&table, NormalizationMode::Clr).unwrap();
        let values = normalized.table.counts_matrix();

        assert!(values.iter().all(|v| v.is_finite()));
        // Column 0: logs [-inf, log10 5, 2], finite mean (log10 5 + 2) / 2.
        let mean0 = (5f64.log10() + 2.0) / 2.0;
        assert_relative_eq!(values[[1, 0]], 5f64.log10() / mean0, epsilon = 1e-12);
        assert_relative_eq!(values[[2, 0]], 2.0 / mean0, epsilon = 1e-12);
        // log10(1) = 0 is the smallest finite value, so the zero count clips to 0.
        assert_relative_eq!(values[[0, 0]], 0.0);
        assert_eq!(normalized.messages.len(), 1);
    }

    #[test]
    fn test_clr_all_zero_column_is_zeroed() {
        let table = create_test_table(arr2(&[[0.0, 10.0], [0.0, 100.0], [0.0, 1000.0]]));
        let normalized = normalize(&table, NormalizationMode::Clr).unwrap();
        let values = normalized.table.counts_matrix();

        assert!(values.iter().all(|v| v.is_finite()));
        assert_eq!(values.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
        // Column 1: logs [1, 2, 3] / 2.
        for (v, expected) in values.column(1).iter().zip([0.5, 1.0, 1.5]) {
            assert_relative_eq!(*v, expected, epsilon = 1e-12);
        }
        assert_eq!(normalized.messages.len(), 2);
    }

    #[test]
    fn test_clr_all_zero_matrix() {
        let table = create_test_table(Array2::zeros((2, 2)));
        let normalized = normalize(&table, NormalizationMode::Clr).unwrap();
        assert!(normalized.table.counts_matrix().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_clr_all_zero_column_does_not_move_floor() {
        let alone = create_test_table(arr2(&[[0.0], [10.0], [100.0]]));
        let with_sibling = create_test_table(arr2(&[[0.0, 0.0], [0.0, 10.0], [0.0, 100.0]]));
        let alone = normalize(&alone, NormalizationMode::Clr).unwrap().table;
        let with_sibling = normalize(&with_sibling, NormalizationMode::Clr).unwrap().table;

        // logs [-inf, 1, 2] / 1.5; the zero count clips to the column minimum.
        let clipped = alone.counts_matrix()[[0, 0]];
        assert_relative_eq!(clipped, 1.0 / 1.5, epsilon = 1e-12);
        assert_relative_eq!(with_sibling.counts_matrix()[[0, 1]], clipped, epsilon = 1e-12);
        assert_eq!(with_sibling.counts_matrix().column(0).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_clr_zero_mean_column_is_zeroed() {
        // log10 of [1, 0, 1] has finite values [0, 0], averaging to zero.
        let table = create_test_table(arr2(&[[1.0, 10.0], [0.0, 100.0], [1.0, 1000.0]]));
        let normalized = normalize(&table, NormalizationMode::Clr).unwrap();
        let values = normalized.table.counts_matrix();

        assert_eq!(values.column(0).to_vec(), vec![0.0, 0.0, 0.0]);
        for (v, expected) in values.column(1).iter().zip([0.5, 1.0, 1.5]) {
            assert_relative_eq!(*v, expected, epsilon = 1e-12);
        }
        assert_eq!(normalized.messages.len(), 2);
        assert!(normalized.messages[0].contains("S1"));
    }
}
