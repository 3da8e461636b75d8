//! Heatmap pipeline: top-N filter, normalization and clustered ordering.

use crate::cluster::leaf_order;
use crate::config::HeatmapConfig;
use crate::count_table::CountTable;
use crate::normalization::{normalize, Normalized};
use anyhow::{Context, Result};
use log::info;

/// A matrix ready to draw, plus the status text that goes with it.
#[derive(Debug, Clone)]
pub struct HeatmapOutput {
    /// Normalized values with rows and columns in dendrogram order.
    pub matrix: CountTable,
    pub messages: Vec<String>,
    /// `matrix` row `k` is row `row_order[k]` of the filtered, normalized table.
    pub row_order: Vec<usize>,
    pub col_order: Vec<usize>,
}

/// Keeps the `top_n` most abundant features, normalizes them, and reorders
/// rows and columns by hierarchical clustering.
///
/// Reordering only moves values; the set of features and samples in the
/// output equals the filtered input.
pub fn run_heatmap(counts: &CountTable, config: &HeatmapConfig) -> Result<HeatmapOutput> {
    config.validate()?;

    let filtered = counts.top_n_by_abundance(config.top_n)?;
    info!(
        "Kept {} of {} features for the heatmap",
        filtered.dimensions().0,
        counts.dimensions().0
    );

    let Normalized { table, messages } = normalize(&filtered, config.normalization)?;
    let values = table.counts_matrix();

    let row_order = leaf_order(values.view(), config.method, config.metric)
        .context("Failed to cluster features")?;
    let col_order = leaf_order(values.t(), config.method, config.metric)
        .context("Failed to cluster samples")?;

    let matrix = table.select_rows(&row_order)?.select_columns(&col_order)?;
    Ok(HeatmapOutput {
        matrix,
        messages,
        row_order,
        col_order,
    })
}
