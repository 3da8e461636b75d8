//! Input/Output operations module.
//!
//! Loads count and metadata tables from URLs or local paths, and writes
//! analysis outputs (test results, reordered matrices) as CSV.

pub mod remote;

pub use remote::{is_remote, CsvDownloader, FetchError};

use crate::count_table::CountTable;
use crate::metadata::Metadata;
use crate::stats::AnalysisResults;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Loads a counts matrix, reading at most `nrows` feature rows.
pub fn load_counts(downloader: &CsvDownloader, source: &str, nrows: Option<usize>) -> Result<CountTable> {
    let text = downloader.read_source(source)?;
    CountTable::from_csv_reader(text.as_bytes(), nrows)
        .with_context(|| format!("Failed to parse counts from '{}'", source))
}

/// Loads sample metadata grouped on `label_column`.
pub fn load_metadata(downloader: &CsvDownloader, source: &str, label_column: &str) -> Result<Metadata> {
    let text = downloader.read_source(source)?;
    Metadata::from_csv_reader(text.as_bytes(), label_column)
        .with_context(|| format!("Failed to parse metadata from '{}'", source))
}

/// Writes t-test results as CSV.
pub fn write_stat_results<W: Write>(results: &AnalysisResults, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "feature_id",
        "statistic",
        "p_value",
        "neg_log10_p",
        "p_adjusted",
    ])?;

    for result in results {
        writer.write_record([
            result.feature_id.clone(),
            result.statistic.to_string(),
            result.p_value.to_string(),
            result.neg_log10_p.to_string(),
            result.p_adjusted.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a CountTable as CSV: "Feature" followed by sample names, then one
/// row per feature.
pub fn write_count_table<W: Write>(table: &CountTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["Feature".to_string()];
    header.extend(table.sample_names().iter().cloned());
    writer.write_record(&header)?;

    for (feature, row) in table.feature_names().iter().zip(table.counts_matrix().rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(feature.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Creates `path` and hands a buffered writer to `write`.
pub fn write_to_path<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> Result<()>,
{
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write(BufWriter::new(file))
}
