//! SVG rendering of pipeline outputs.

pub mod plotter;

pub use plotter::{DivergingScale, VisualizationError, Visualizer};
