//! Metadata handling module.
//!
//! Sample metadata maps every sample to a categorical label (for the airway
//! data, the `dex` column with values `treated`/`control`). The labels are
//! used to partition the columns of a [`CountTable`] into comparison groups.

use crate::count_table::CountTable;
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

/// Represents metadata for a collection of samples.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    /// Maps sample IDs to their label, in file order
    pub condition_map: IndexMap<String, String>,
    /// Remaining columns of the metadata table, per sample
    pub sample_attributes: HashMap<String, HashMap<String, String>>,
}

/// Grouping of sample identifiers by label value.
///
/// Groups are disjoint because every sample carries exactly one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPartition {
    groups: IndexMap<String, Vec<String>>,
}

/// Column indices of the two compared groups within one [`CountTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupIndices {
    pub treated: Vec<usize>,
    pub control: Vec<usize>,
}

impl Metadata {
    /// Creates a new, empty Metadata structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample with its label to the metadata
    pub fn add_sample(&mut self, sample_id: &str, condition: &str) {
        self.condition_map
            .insert(sample_id.to_string(), condition.to_string());
    }

    /// Adds an attribute for a specific sample
    pub fn add_sample_attribute(&mut self, sample_id: &str, attribute: &str, value: &str) {
        self.sample_attributes
            .entry(sample_id.to_string())
            .or_default()
            .insert(attribute.to_string(), value.to_string());
    }

    /// Returns all unique labels present in the metadata
    pub fn get_conditions(&self) -> Vec<String> {
        let mut conditions: Vec<String> = self.condition_map.values().cloned().collect();
        conditions.sort();
        conditions.dedup();
        conditions
    }

    /// Returns the number of samples in the metadata
    pub fn sample_count(&self) -> usize {
        self.condition_map.len()
    }

    /// Parses a metadata CSV document.
    ///
    /// The first column is the sample index; `label_column` names the
    /// categorical column used for grouping. All other columns are kept as
    /// sample attributes.
    pub fn from_csv_reader<R: Read>(reader: R, label_column: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = rdr.headers().context("Metadata CSV has no header row")?.clone();

        let label_col = headers
            .iter()
            .position(|h| h == label_column)
            .filter(|&idx| idx != 0)
            .ok_or_else(|| anyhow!("Metadata CSV missing label column '{}'", label_column))?;

        let mut metadata = Metadata::new();
        for (row_idx, result) in rdr.records().enumerate() {
            let record = result.with_context(|| format!("Malformed metadata row {}", row_idx + 1))?;
            let sample_id = record
                .get(0)
                .ok_or_else(|| anyhow!("Missing sample ID in metadata row {}", row_idx + 1))?;
            let condition = record
                .get(label_col)
                .ok_or_else(|| anyhow!("Missing '{}' for sample '{}'", label_column, sample_id))?;

            if sample_id.is_empty() {
                log::warn!("Skipping metadata row {} with empty sample ID.", row_idx + 1);
                continue;
            }
            if metadata.condition_map.contains_key(sample_id) {
                bail!("Sample '{}' appears more than once in metadata", sample_id);
            }
            metadata.add_sample(sample_id, condition);

            for (i, field) in record.iter().enumerate() {
                if i != 0 && i != label_col {
                    let header = headers.get(i).unwrap_or("unknown");
                    metadata.add_sample_attribute(sample_id, header, field);
                }
            }
        }

        if metadata.sample_count() == 0 {
            bail!("No valid sample entries found in metadata");
        }
        log::debug!(
            "Loaded metadata for {} samples with labels {:?}",
            metadata.sample_count(),
            metadata.get_conditions()
        );
        Ok(metadata)
    }

    /// Groups samples by their label, keeping metadata order within groups.
    pub fn partition(&self) -> LabelPartition {
        let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
        for (sample, label) in &self.condition_map {
            groups.entry(label.clone()).or_default().push(sample.clone());
        }
        LabelPartition { groups }
    }
}

impl LabelPartition {
    /// Sample identifiers carrying `label`.
    pub fn group(&self, label: &str) -> Option<&[String]> {
        self.groups.get(label).map(Vec::as_slice)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Resolves the treated and control groups to column indices of `table`.
    ///
    /// Fails when either label is absent, when a labelled sample is not a
    /// column of the table, or when a table column is not labelled with
    /// either `treated` or `control`.
    pub fn resolve(&self, table: &CountTable, treated: &str, control: &str) -> Result<GroupIndices> {
        if treated == control {
            bail!("Treated and control labels must differ, both are '{}'", treated);
        }
        for sample in table.sample_names() {
            let label = self
                .groups
                .iter()
                .find(|(_, g)| g.contains(sample))
                .map(|(label, _)| label.as_str())
                .ok_or_else(|| anyhow!("Sample '{}' in count table has no label in metadata", sample))?;
            if label != treated && label != control {
                bail!(
                    "Sample '{}' is labelled '{}', expected '{}' or '{}'",
                    sample,
                    label,
                    treated,
                    control
                );
            }
        }

        let columns = |label: &str| -> Result<Vec<usize>> {
            let group = self
                .group(label)
                .ok_or_else(|| anyhow!("No samples labelled '{}' in metadata", label))?;
            group
                .iter()
                .map(|sample| {
                    table.sample_map.get(sample).copied().ok_or_else(|| {
                        anyhow!("Sample '{}' labelled '{}' is not in the count table", sample, label)
                    })
                })
                .collect()
        };

        Ok(GroupIndices {
            treated: columns(treated)?,
            control: columns(control)?,
        })
    }
}
