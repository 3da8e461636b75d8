//! Defines structures and functions for handling count data.
//!
//! A count table holds a features x samples matrix (genes as rows,
//! sequencing samples as columns) together with the identifiers needed to
//! join values back to their feature and sample.

use anyhow::{anyhow, bail, Context, Result};
use itertools::Itertools;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

/// Represents a count table.
///
/// Counts are stored as `f64` so the same structure can carry normalized
/// values after a transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountTable {
    /// The core count data matrix (features x samples).
    pub counts: Array2<f64>,

    /// Mapping from feature index (row) to feature name (e.g. gene ID).
    pub feature_names: Vec<String>,
    pub feature_map: HashMap<String, usize>, // For quick lookup

    /// Mapping from sample index (column) to sample name.
    pub sample_names: Vec<String>,
    pub sample_map: HashMap<String, usize>, // For quick lookup
}

fn index_names(names: &[String], kind: &str) -> Result<HashMap<String, usize>> {
    let mut map = HashMap::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        if map.insert(name.clone(), idx).is_some() {
            bail!("Duplicate {} identifier '{}'", kind, name);
        }
    }
    Ok(map)
}

impl CountTable {
    /// Creates a new, empty CountTable.
    pub fn new() -> Self {
        CountTable {
            counts: Array2::zeros((0, 0)),
            feature_names: Vec::new(),
            feature_map: HashMap::new(),
            sample_names: Vec::new(),
            sample_map: HashMap::new(),
        }
    }

    /// Builds a CountTable from a matrix and its row/column identifiers.
    ///
    /// Fails when the identifier lists do not match the matrix shape or
    /// contain duplicates.
    pub fn from_parts(
        counts: Array2<f64>,
        feature_names: Vec<String>,
        sample_names: Vec<String>,
    ) -> Result<Self> {
        let (n_features, n_samples) = counts.dim();
        if feature_names.len() != n_features {
            bail!(
                "Expected {} feature names, got {}",
                n_features,
                feature_names.len()
            );
        }
        if sample_names.len() != n_samples {
            bail!(
                "Expected {} sample names, got {}",
                n_samples,
                sample_names.len()
            );
        }
        let feature_map = index_names(&feature_names, "feature")?;
        let sample_map = index_names(&sample_names, "sample")?;

        Ok(CountTable {
            counts,
            feature_names,
            feature_map,
            sample_names,
            sample_map,
        })
    }

    /// Parses a counts CSV document.
    ///
    /// The first row is the header; its first cell names the index column
    /// and the remaining cells are sample identifiers. Each following row is
    /// a feature identifier followed by one finite, non-negative count per sample.
    /// When `nrows` is given, at most that many feature rows are read.
    pub fn from_csv_reader<R: Read>(reader: R, nrows: Option<usize>) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers().context("Counts CSV has no header row")?.clone();
        if headers.len() < 2 {
            bail!("Counts CSV needs an index column and at least one sample column");
        }
        let sample_names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let n_samples = sample_names.len();

        let mut feature_names = Vec::new();
        let mut values = Vec::new();
        let limit = nrows.unwrap_or(usize::MAX);

        for (row_idx, result) in rdr.records().take(limit).enumerate() {
            let record = result.with_context(|| format!("Malformed counts row {}", row_idx + 1))?;
            if record.len() != n_samples + 1 {
                bail!(
                    "Counts row {} has {} fields, expected {}",
                    row_idx + 1,
                    record.len(),
                    n_samples + 1
                );
            }
            feature_names.push(record[0].to_string());
            for (col_idx, field) in record.iter().skip(1).enumerate() {
                let value: f64 = field.parse().map_err(|_| {
                    anyhow!(
                        "Invalid count '{}' for feature '{}', sample '{}'",
                        field,
                        &record[0],
                        sample_names[col_idx]
                    )
                })?;
                if !value.is_finite() || value < 0.0 {
                    bail!(
                        "Count for feature '{}', sample '{}' must be finite and non-negative, got {}",
                        &record[0],
                        sample_names[col_idx],
                        value
                    );
                }
                values.push(value);
            }
        }

        let counts = Array2::from_shape_vec((feature_names.len(), n_samples), values)?;
        log::debug!(
            "Parsed count table with {} features x {} samples",
            counts.nrows(),
            counts.ncols()
        );
        Self::from_parts(counts, feature_names, sample_names)
    }

    /// Returns a copy of this table with its values replaced.
    ///
    /// The new matrix must have the same shape as the current one.
    pub fn with_counts(&self, counts: Array2<f64>) -> Result<Self> {
        if counts.dim() != self.counts.dim() {
            bail!(
                "Replacement matrix has shape {:?}, expected {:?}",
                counts.dim(),
                self.counts.dim()
            );
        }
        Ok(CountTable {
            counts,
            ..self.clone()
        })
    }

    /// Retrieves the counts for a specific feature.
    pub fn get_feature_counts(&self, feature_name: &str) -> Option<ArrayView1<f64>> {
        self.feature_map
            .get(feature_name)
            .map(|&idx| self.counts.row(idx))
    }

    /// Retrieves the counts for a specific sample.
    pub fn get_sample_counts(&self, sample_name: &str) -> Option<ArrayView1<f64>> {
        self.sample_map
            .get(sample_name)
            .map(|&idx| self.counts.column(idx))
    }

    /// Returns the dimensions of the count table (features, samples).
    pub fn dimensions(&self) -> (usize, usize) {
        self.counts.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Returns a reference to the underlying count matrix.
    pub fn counts_matrix(&self) -> &Array2<f64> {
        &self.counts
    }

    /// Returns the list of feature names.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Returns the list of sample names.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// Total abundance of every feature across all samples.
    pub fn row_sums(&self) -> Vec<f64> {
        self.counts.sum_axis(Axis(1)).to_vec()
    }

    /// Returns a new table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.counts.nrows()) {
            bail!("Row index {} out of bounds for {} features", bad, self.counts.nrows());
        }
        let counts = self.counts.select(Axis(0), indices);
        let feature_names = indices.iter().map(|&i| self.feature_names[i].clone()).collect();
        Self::from_parts(counts, feature_names, self.sample_names.clone())
    }

    /// Returns a new table holding the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.counts.ncols()) {
            bail!("Column index {} out of bounds for {} samples", bad, self.counts.ncols());
        }
        let counts = self.counts.select(Axis(1), indices);
        let sample_names = indices.iter().map(|&i| self.sample_names[i].clone()).collect();
        Self::from_parts(counts, self.feature_names.clone(), sample_names)
    }

    /// Keeps the `n` most abundant features by total count.
    ///
    /// Ranking is descending on row sum; ties keep their original row order,
    /// so filtering an already-filtered table again is a no-op.
    pub fn top_n_by_abundance(&self, n: usize) -> Result<Self> {
        let sums = self.row_sums();
        let keep: Vec<usize> = (0..sums.len())
            .sorted_by(|&a, &b| sums[b].total_cmp(&sums[a]))
            .take(n)
            .collect();
        log::debug!("Keeping {} of {} features by abundance", keep.len(), sums.len());
        self.select_rows(&keep)
    }
}

// Default implementation for creating an empty table.
impl Default for CountTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::arr2;

    pub(crate) fn names(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    pub(crate) fn create_test_table(counts: Array2<f64>) -> CountTable {
        let (rows, cols) = counts.dim();
        CountTable::from_parts(counts, names("F", rows), names("S", cols)).unwrap()
    }

    #[test]
    fn test_new_count_table() {
        let table = CountTable::new();
        assert_eq!(table.dimensions(), (0, 0));
        assert!(table.feature_names.is_empty());
        assert!(table.sample_names.is_empty());
    }

    #[test]
    fn test_from_csv_reader() {
        let csv = "ensgene,S1,S2,S3\nG1,1,2,3\nG2,0,5.5,10\n";
        let table = CountTable::from_csv_reader(csv.as_bytes(), None).unwrap();

        assert_eq!(table.dimensions(), (2, 3));
        assert_eq!(table.sample_names(), &["S1", "S2", "S3"]);
        assert_eq!(table.feature_names(), &["G1", "G2"]);
        assert_eq!(table.get_feature_counts("G2").unwrap().to_vec(), vec![0.0, 5.5, 10.0]);
        assert_eq!(table.get_sample_counts("S1").unwrap().to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_row_limit() {
        let csv = "id,A,B\nG1,1,2\nG2,3,4\nG3,5,6\n";
        let limited = CountTable::from_csv_reader(csv.as_bytes(), Some(2)).unwrap();
        assert_eq!(limited.feature_names(), &["G1", "G2"]);

        // A limit past the end reads only what exists.
        let all = CountTable::from_csv_reader(csv.as_bytes(), Some(100)).unwrap();
        assert_eq!(all.dimensions(), (3, 2));
    }

    #[test]
    fn test_header_only_is_empty() {
        let table = CountTable::from_csv_reader("id,A,B\n".as_bytes(), None).unwrap();
        assert_eq!(table.dimensions(), (0, 2));
        assert!(table.is_empty());
    }

    #[test]
    fn test_invalid_counts_rejected() {
        assert!(CountTable::from_csv_reader("id,A\nG1,abc\n".as_bytes(), None).is_err());
        assert!(CountTable::from_csv_reader("id,A\nG1,-4\n".as_bytes(), None).is_err());
        assert!(CountTable::from_csv_reader("id,A\nG1,inf\n".as_bytes(), None).is_err());
        assert!(CountTable::from_csv_reader("id,A\nG1,NaN\n".as_bytes(), None).is_err());
        assert!(CountTable::from_csv_reader("id,A,B\nG1,1\n".as_bytes(), None).is_err());
        assert!(CountTable::from_csv_reader("id,A\nG1,1\nG1,2\n".as_bytes(), None).is_err());
    }

    #[test]
    fn test_top_n_by_abundance_stable_ties() {
        let table = create_test_table(arr2(&[
            [1.0, 1.0],   // 2
            [5.0, 5.0],   // 10
            [0.0, 2.0],   // 2
            [10.0, 10.0], // 20
        ]));
        let top = table.top_n_by_abundance(3).unwrap();
        assert_eq!(top.feature_names(), &["F4", "F2", "F1"]);
        assert_eq!(top.counts_matrix().row(0).to_vec(), vec![10.0, 10.0]);
    }

    #[test]
    fn test_top_n_idempotent() {
        let table = create_test_table(arr2(&[
            [3.0, 1.0],
            [2.0, 2.0],
            [0.0, 9.0],
            [1.0, 0.0],
            [4.0, 0.0],
        ]));
        let once = table.top_n_by_abundance(3).unwrap();
        let same = once.top_n_by_abundance(3).unwrap();
        let larger = once.top_n_by_abundance(10).unwrap();
        assert_eq!(once, same);
        assert_eq!(once, larger);
    }

    #[test]
    fn test_select_columns_reorders_without_changing_values() {
        let table = create_test_table(arr2(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]));
        let reordered = table.select_columns(&[2, 0, 1]).unwrap();
        assert_eq!(reordered.sample_names(), &["S3", "S1", "S2"]);
        assert_eq!(reordered.get_sample_counts("S1"), table.get_sample_counts("S1"));
        assert!(table.select_columns(&[3]).is_err());
    }

    #[test]
    fn test_with_counts_shape_checked() {
        let table = create_test_table(arr2(&[[1.0, 2.0]]));
        assert!(table.with_counts(arr2(&[[1.0], [2.0]])).is_err());
        let replaced = table.with_counts(arr2(&[[0.5, 0.5]])).unwrap();
        assert_eq!(replaced.feature_names(), table.feature_names());
    }
}
