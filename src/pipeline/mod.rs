//! The two transform pipelines.
//!
//! Both are pure functions of their inputs and configuration: they never
//! fetch, render or keep state, so a host can call them repeatedly and cache
//! them on their arguments.

pub mod diffexp;
pub mod heatmap;

pub use diffexp::run_diffexp;
pub use heatmap::{run_heatmap, HeatmapOutput};
