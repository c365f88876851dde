//! Data ingestion layer for the death-register pipeline.
//!
//! Responsible for locating and reading quarterly register files, filtering
//! out minors, folding the per-period tables into one dataset, counting
//! forenames and writing the results.

pub mod aggregator;
pub mod filter;
pub mod pipeline;
pub mod reader;
pub mod writer;

pub use registers_core as core;
