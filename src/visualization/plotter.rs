use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use thiserror::Error;

use crate::count_table::CountTable;
use crate::stats::StatResult;

#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Plot error: {0}")]
    PlotError(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for VisualizationError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        VisualizationError::PlotError(err.to_string())
    }
}

const VOLCANO_SIZE: (u32, u32) = (900, 650);
const LEGEND_WIDTH: u32 = 110;

/// Blue-white-red color scale with white at `mid`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergingScale {
    pub lo: f64,
    pub mid: f64,
    pub hi: f64,
}

const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
const NEUTRAL: (f64, f64, f64) = (247.0, 247.0, 247.0);
const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

fn blend(from: (f64, f64, f64), to: (f64, f64, f64), t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let channel = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(
        channel(from.0, to.0),
        channel(from.1, to.1),
        channel(from.2, to.2),
    )
}

impl DivergingScale {
    /// Scale for values in `lo..=hi`.
    ///
    /// Data spanning zero is centered on zero; otherwise on the middle of
    /// the range.
    pub fn new(lo: f64, hi: f64) -> Self {
        let mid = if lo < 0.0 && hi > 0.0 {
            0.0
        } else {
            (lo + hi) / 2.0
        };
        DivergingScale { lo, mid, hi }
    }

    /// Scale covering every finite value of `values`.
    pub fn from_values<'a>(values: impl IntoIterator<Item = &'a f64>) -> Self {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if lo > hi {
            Self::new(0.0, 0.0)
        } else {
            Self::new(lo, hi)
        }
    }

    pub fn color(&self, value: f64) -> RGBColor {
        if value < self.mid && self.mid > self.lo {
            blend(NEUTRAL, COLD, (self.mid - value) / (self.mid - self.lo))
        } else if value > self.mid && self.hi > self.mid {
            blend(NEUTRAL, HOT, (value - self.mid) / (self.hi - self.mid))
        } else {
            blend(NEUTRAL, NEUTRAL, 0.0)
        }
    }
}

/// Pads a data range by 5% on each side; a degenerate range widens to ±1.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        return (-1.0, 1.0);
    }
    if lo == hi {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

fn draw_placeholder<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    message: &str,
) -> Result<(), VisualizationError>
where
    DB::ErrorType: 'static,
{
    let mut chart = ChartBuilder::on(area)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .build_cartesian_2d(0..1, 0..1)?;
    chart.configure_mesh().disable_mesh().draw()?;

    let (w, h) = area.dim_in_pixel();
    area.draw_text(
        message,
        &TextStyle::from(("sans-serif", 20).into_font()).color(&BLACK),
        (w as i32 / 4, h as i32 / 2),
    )?;
    Ok(())
}

/// Renders pipeline outputs as SVG files
pub struct Visualizer {
    /// Output directory for visualizations
    output_dir: PathBuf,
}

impl Visualizer {
    /// Create a new visualizer
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, VisualizationError> {
        let output_path = output_dir.as_ref().to_path_buf();

        // Create output directory if it doesn't exist
        if !output_path.exists() {
            fs::create_dir_all(&output_path)?;
        }

        Ok(Visualizer {
            output_dir: output_path,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Scatter of t statistic against -log10 p-value, one point per gene.
    ///
    /// The `label_top` most significant genes are annotated with their IDs.
    pub fn plot_volcano(
        &self,
        results: &[StatResult],
        label_top: usize,
        file_stem: &str,
    ) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir.join(format!("{}.svg", file_stem));
        render_volcano(&output_file, results, label_top)?;
        Ok(output_file)
    }

    /// Color-scaled grid of `matrix`, rows top to bottom in table order.
    pub fn plot_heatmap(
        &self,
        matrix: &CountTable,
        file_stem: &str,
    ) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir.join(format!("{}.svg", file_stem));
        render_heatmap(&output_file, matrix)?;
        Ok(output_file)
    }
}

fn render_volcano(
    path: &Path,
    results: &[StatResult],
    label_top: usize,
) -> Result<(), VisualizationError> {
    let root = SVGBackend::new(path, VOLCANO_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = "Comparison of genes in treated vs. control";
    if results.is_empty() {
        draw_placeholder(&root, caption, "No genes with a defined t-test")?;
        root.present()?;
        return Ok(());
    }

    let (x_min, x_max) = padded_range(results.iter().map(|r| r.statistic));
    let (_, y_max) = padded_range(results.iter().map(|r| r.neg_log10_p));

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0.0..y_max.max(1.0))?;

    chart
        .configure_mesh()
        .x_desc("t-test statistic")
        .y_desc("p-value (-log10)")
        .draw()?;

    chart.draw_series(results.iter().map(|r| {
        Circle::new((r.statistic, r.neg_log10_p), 3, BLUE.mix(0.6).filled())
    }))?;

    let mut ranked: Vec<&StatResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.neg_log10_p.total_cmp(&a.neg_log10_p));
    chart.draw_series(ranked.into_iter().take(label_top).map(|r| {
        Text::new(
            r.feature_id.clone(),
            (r.statistic, r.neg_log10_p),
            ("sans-serif", 11).into_font().color(&BLACK),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn render_heatmap(path: &Path, matrix: &CountTable) -> Result<(), VisualizationError> {
    let (n_rows, n_cols) = matrix.dimensions();

    let width = (220 + 40 * n_cols as u32 + LEGEND_WIDTH).max(600);
    let height = (200 + 14 * n_rows as u32).max(400);
    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let caption = "Clustered heatmap";
    if n_rows == 0 || n_cols == 0 {
        draw_placeholder(&root, caption, "No features to display")?;
        root.present()?;
        return Ok(());
    }

    let scale = DivergingScale::from_values(matrix.counts_matrix().iter());
    let (main, legend) = root.split_horizontally(width - LEGEND_WIDTH);

    let mut chart = ChartBuilder::on(&main)
        .caption(caption, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(90)
        .y_label_area_size(150)
        .build_cartesian_2d(0..n_cols as i32, n_rows as i32..0)?;

    let (plot_w, plot_h) = chart.plotting_area().dim_in_pixel();
    let samples = matrix.sample_names();
    let features = matrix.feature_names();
    let label = |names: &[String], idx: i32| {
        usize::try_from(idx)
            .ok()
            .and_then(|i| names.get(i))
            .cloned()
            .unwrap_or_default()
    };
    let x_formatter = |x: &i32| label(samples, *x);
    let y_formatter = |y: &i32| label(features, *y);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(n_cols + 1)
        .y_labels(n_rows + 1)
        .x_label_offset((plot_w / n_cols as u32 / 2) as i32)
        .y_label_offset((plot_h / n_rows as u32 / 2) as i32)
        .x_label_formatter(&x_formatter)
        .y_label_formatter(&y_formatter)
        .x_label_style(
            ("sans-serif", 11)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_style(("sans-serif", 10))
        .draw()?;

    let counts = matrix.counts_matrix();
    chart.draw_series(counts.indexed_iter().map(|((r, c), &v)| {
        let (x, y) = (c as i32, r as i32);
        Rectangle::new([(x, y), (x + 1, y + 1)], scale.color(v).filled())
    }))?;

    draw_color_bar(&legend, &scale)?;

    root.present()?;
    Ok(())
}

fn draw_color_bar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    scale: &DivergingScale,
) -> Result<(), VisualizationError>
where
    DB::ErrorType: 'static,
{
    let (lo, hi) = if scale.hi > scale.lo {
        (scale.lo, scale.hi)
    } else {
        (scale.lo - 1.0, scale.hi + 1.0)
    };
    let mut bar = ChartBuilder::on(area)
        .margin(10)
        .margin_top(60)
        .margin_bottom(100)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, lo..hi)?;

    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_labels(6)
        .y_label_style(("sans-serif", 10))
        .draw()?;

    const STEPS: usize = 100;
    let step = (hi - lo) / STEPS as f64;
    bar.draw_series((0..STEPS).map(|i| {
        let from = lo + step * i as f64;
        Rectangle::new(
            [(0.0, from), (1.0, from + step)],
            scale.color(from + step / 2.0).filled(),
        )
    }))?;
    Ok(())
}
