//! Run configuration for both pipelines.
//!
//! Each pipeline takes one explicit, validated structure instead of reading
//! parameters ad hoc. The structures are plain data (`Hash + Eq`), so a
//! caching layer can key on them.

use crate::cluster::{DistanceMetric, LinkageMethod};
use crate::normalization::NormalizationMode;
use crate::stats::TTestKind;
use anyhow::{ensure, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub const DEFAULT_COUNTS_URL: &str = "https://github.com/BRITE-REU/programming-workshops/raw/master/source/workshops/02_R/files/airway_scaledcounts.csv";
pub const DEFAULT_METADATA_URL: &str = "https://github.com/BRITE-REU/programming-workshops/raw/master/source/workshops/02_R/files/airway_metadata.csv";

/// Bounds on the number of genes read for the differential test.
pub const MIN_ROW_LIMIT: usize = 100;
pub const MAX_ROW_LIMIT: usize = 38694;
pub const DEFAULT_ROW_LIMIT: usize = 100;

/// Bounds on the number of features kept for the heatmap.
pub const MIN_TOP_N: usize = 1;
pub const MAX_TOP_N: usize = 500;
pub const DEFAULT_TOP_N: usize = 50;

/// Parameters of the differential-expression explorer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffExpConfig {
    pub counts_source: String,
    pub metadata_source: String,
    /// Number of genes (rows) to read from the counts table.
    pub row_limit: usize,
    /// Metadata column holding the treatment label.
    pub label_column: String,
    pub treated_label: String,
    pub control_label: String,
    pub test: TTestKind,
}

impl Default for DiffExpConfig {
    fn default() -> Self {
        DiffExpConfig {
            counts_source: DEFAULT_COUNTS_URL.to_string(),
            metadata_source: DEFAULT_METADATA_URL.to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            label_column: "dex".to_string(),
            treated_label: "treated".to_string(),
            control_label: "control".to_string(),
            test: TTestKind::default(),
        }
    }
}

impl DiffExpConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_ROW_LIMIT..=MAX_ROW_LIMIT).contains(&self.row_limit),
            "Row limit must be between {} and {}, got {}",
            MIN_ROW_LIMIT,
            MAX_ROW_LIMIT,
            self.row_limit
        );
        ensure!(!self.counts_source.is_empty(), "Counts source is empty");
        ensure!(!self.metadata_source.is_empty(), "Metadata source is empty");
        ensure!(!self.label_column.is_empty(), "Label column is empty");
        ensure!(
            self.treated_label != self.control_label,
            "Treated and control labels must differ"
        );
        Ok(())
    }
}

/// Parameters of the clustered heatmap viewer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    pub counts_source: String,
    pub normalization: NormalizationMode,
    /// Number of most abundant features to display.
    pub top_n: usize,
    pub method: LinkageMethod,
    pub metric: DistanceMetric,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        HeatmapConfig {
            counts_source: DEFAULT_COUNTS_URL.to_string(),
            normalization: NormalizationMode::default(),
            top_n: DEFAULT_TOP_N,
            method: LinkageMethod::default(),
            metric: DistanceMetric::default(),
        }
    }
}

impl HeatmapConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (MIN_TOP_N..=MAX_TOP_N).contains(&self.top_n),
            "top_n must be between {} and {}, got {}",
            MIN_TOP_N,
            MAX_TOP_N,
            self.top_n
        );
        ensure!(!self.counts_source.is_empty(), "Counts source is empty");
        Ok(())
    }
}

/// Reads a JSON configuration file; missing fields take their defaults.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open config {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid config file {}", path.display()))
}
