use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use crate::cluster::{DistanceMetric, LinkageMethod};
use crate::config::{
    load_json, DiffExpConfig, HeatmapConfig, DEFAULT_COUNTS_URL, DEFAULT_METADATA_URL,
    DEFAULT_ROW_LIMIT, DEFAULT_TOP_N,
};
use crate::io::{load_counts, load_metadata, write_count_table, write_stat_results, write_to_path, CsvDownloader};
use crate::normalization::NormalizationMode;
use crate::pipeline::{run_diffexp, run_heatmap};
use crate::stats::TTestKind;
use crate::visualization::Visualizer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory for charts and exported tables
    #[arg(short, long, default_value = "results", global = true)]
    pub output: PathBuf,

    /// HTTP timeout in seconds for remote sources
    #[arg(long, default_value_t = 60, global = true)]
    pub timeout: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Test every gene for treated vs. control and draw a volcano plot
    Diffexp {
        /// Counts CSV (URL or path); first column holds gene IDs
        #[arg(long, default_value = DEFAULT_COUNTS_URL)]
        counts: String,

        /// Sample metadata CSV (URL or path); first column holds sample IDs
        #[arg(long, default_value = DEFAULT_METADATA_URL)]
        metadata: String,

        /// Number of genes to read from the counts table
        #[arg(short = 'n', long, default_value_t = DEFAULT_ROW_LIMIT)]
        rows: usize,

        /// Metadata column holding the treatment label
        #[arg(long, default_value = "dex")]
        label_column: String,

        #[arg(long, default_value = "treated")]
        treated: String,

        #[arg(long, default_value = "control")]
        control: String,

        #[arg(long, value_enum, default_value_t = TTestKind::Student)]
        test: TTestKind,

        /// Annotate this many of the most significant genes
        #[arg(long, default_value_t = 10)]
        label_top: usize,

        /// Also write the test results as CSV
        #[arg(long)]
        export: bool,

        /// JSON run configuration; replaces the flags above
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Draw the most abundant features as a clustered heatmap
    Heatmap {
        /// Counts CSV (URL or path); first column holds feature IDs
        #[arg(long, default_value = DEFAULT_COUNTS_URL)]
        counts: String,

        #[arg(long, value_enum, default_value_t = NormalizationMode::None)]
        normalization: NormalizationMode,

        /// Number of most abundant features to keep
        #[arg(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,

        /// Linkage method for hierarchical clustering
        #[arg(long, value_enum, default_value_t = LinkageMethod::Average)]
        method: LinkageMethod,

        /// Distance metric for hierarchical clustering
        #[arg(long, value_enum, default_value_t = DistanceMetric::Euclidean)]
        metric: DistanceMetric,

        /// Also write the reordered matrix as CSV
        #[arg(long)]
        export: bool,

        /// JSON run configuration; replaces the flags above
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn config_or<T: serde::de::DeserializeOwned>(path: Option<&Path>, from_flags: impl FnOnce() -> T) -> Result<T> {
    match path {
        Some(path) => {
            info!("Loading run configuration from {}", path.display());
            load_json(path)
        }
        None => Ok(from_flags()),
    }
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let downloader = CsvDownloader::new(Duration::from_secs(cli.timeout))?;
    let visualizer = Visualizer::new(&cli.output)?;

    match cli.command {
        Commands::Diffexp {
            counts,
            metadata,
            rows,
            label_column,
            treated,
            control,
            test,
            label_top,
            export,
            config,
        } => {
            let config = config_or(config.as_deref(), || DiffExpConfig {
                counts_source: counts,
                metadata_source: metadata,
                row_limit: rows,
                label_column,
                treated_label: treated,
                control_label: control,
                test,
            })?;
            config.validate()?;
            info!("Differential expression config: {:?}", config);

            let table = load_counts(&downloader, &config.counts_source, Some(config.row_limit))?;
            let metadata = load_metadata(&downloader, &config.metadata_source, &config.label_column)?;
            let results = run_diffexp(&table, &metadata, &config)?;

            let chart = visualizer.plot_volcano(&results, label_top, "volcano")?;
            println!("Generated volcano plot: {}", chart.display());

            if export {
                let path = visualizer.output_dir().join("ttest_results.csv");
                write_to_path(&path, |w| write_stat_results(&results, w))?;
                println!("Wrote test results: {}", path.display());
            }
            Ok(())
        }
        Commands::Heatmap {
            counts,
            normalization,
            top_n,
            method,
            metric,
            export,
            config,
        } => {
            let config = config_or(config.as_deref(), || HeatmapConfig {
                counts_source: counts,
                normalization,
                top_n,
                method,
                metric,
            })?;
            config.validate()?;
            info!("Heatmap config: {:?}", config);

            let table = load_counts(&downloader, &config.counts_source, None)?;
            let output = run_heatmap(&table, &config)?;

            let chart = visualizer.plot_heatmap(&output.matrix, "heatmap")?;
            println!("Generated heatmap: {}", chart.display());
            for message in &output.messages {
                println!("{}", message);
            }

            if export {
                let path = visualizer.output_dir().join("heatmap_matrix.csv");
                write_to_path(&path, |w| write_count_table(&output.matrix, w))?;
                println!("Wrote reordered matrix: {}", path.display());
            }
            Ok(())
        }
    }
}
