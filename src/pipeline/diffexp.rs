//! Differential-expression pipeline: treated vs control t-tests per gene.

use crate::config::DiffExpConfig;
use crate::count_table::CountTable;
use crate::metadata::Metadata;
use crate::stats::{run_ttest_genes, AnalysisResults};
use anyhow::Result;
use log::info;

/// Compares treated and control samples for every gene in `counts`.
///
/// Genes with an undefined test are left out; an empty table yields an
/// empty result. Fails when the metadata labels don't line up with the
/// table's samples.
pub fn run_diffexp(counts: &CountTable, metadata: &Metadata, config: &DiffExpConfig) -> Result<AnalysisResults> {
    config.validate()?;
    let groups = metadata
        .partition()
        .resolve(counts, &config.treated_label, &config.control_label)?;
    info!(
        "Testing {} genes: {} '{}' vs {} '{}' samples ({:?})",
        counts.dimensions().0,
        groups.treated.len(),
        config.treated_label,
        groups.control.len(),
        config.control_label,
        config.test
    );

    let results = run_ttest_genes(counts, &groups, config.test);
    info!("{} genes have a defined test", results.len());
    Ok(results)
}
