//! Batch driver for comparing guessing strategies.
//!
//! - `config`: YAML configuration and validation.
//! - `comparison`: runs every strategy and streams per-trial rows.
//! - `analytics`: summary statistics, Markdown tables and charts.
//! - `telemetry`: digest of the structured log written during a run.
//! - `display`: probability formatting helpers.
//! - `logging`: structured log setup.

pub mod analytics;
pub mod comparison;
pub mod config;
pub mod display;
pub mod logging;
pub mod telemetry;
