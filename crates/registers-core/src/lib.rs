//! Core types for the death-register pipeline.
//!
//! Holds the record model, the age-field disambiguator, the error taxonomy
//! and command-line configuration shared by the data and binary crates.

pub mod age;
pub mod error;
pub mod models;
pub mod settings;

pub use error::{RegisterError, Result};
