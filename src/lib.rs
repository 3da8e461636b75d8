//! Differential-expression and clustered-heatmap explorer for RNA-seq count
//! tables.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod count_table;
pub mod io;
pub mod metadata;
pub mod normalization;
pub mod pipeline;
pub mod stats;
pub mod visualization;
