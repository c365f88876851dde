use clap::Parser;
use std::path::PathBuf;

use crate::error::{RegisterError, Result};
use crate::models::DEFAULT_SCHEMA_CUTOFF_YEAR;

/// Default minimum age kept in the dataset.
pub const DEFAULT_AGE_THRESHOLD: u32 = 18;

/// Register years must fit the four-digit `<year>` path component.
pub const REGISTER_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Normalize historical death registers and build a forename frequency table
#[derive(Parser, Debug, Clone)]
#[command(
    name = "death-registers",
    about = "Normalize historical death registers and build a forename frequency table",
    version
)]
pub struct Settings {
    /// Root directory holding `<year>/<year>-<quarter>.csv` files
    #[arg(long, env = "DEATH_REGISTERS_ROOT")]
    pub source_root: PathBuf,

    /// First register year to read
    #[arg(long, default_value = "1866")]
    pub start_year: i32,

    /// Last register year to read (inclusive)
    #[arg(long, default_value = "1992")]
    pub end_year: i32,

    /// Read every Nth year
    #[arg(long, default_value = "1")]
    pub step: usize,

    /// Records with a resolved age below this are dropped
    #[arg(long, default_value_t = DEFAULT_AGE_THRESHOLD)]
    pub threshold: u32,

    /// First year published as a single annual file
    #[arg(long, default_value_t = DEFAULT_SCHEMA_CUTOFF_YEAR)]
    pub schema_cutoff: i32,

    /// Forename frequency table output path
    #[arg(long, default_value = "names/correct_forenames.csv")]
    pub output: PathBuf,

    /// Optional path for the unified dataset as CSV
    #[arg(long)]
    pub dataset_output: Option<PathBuf>,

    /// Optional path for a JSON run summary
    #[arg(long)]
    pub summary_output: Option<PathBuf>,

    /// Forenames seen fewer times than this are left out of the table
    #[arg(long, default_value = "1")]
    pub min_count: u64,

    /// Worker threads used to load periods (defaults to the number of CPUs)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (appended to; stderr when absent)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Effective log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Validate the command line into an explicit [`PipelineConfig`].
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let config = PipelineConfig {
            source_root: self.source_root.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            step: self.step,
            age_threshold: self.threshold,
            schema_cutoff_year: self.schema_cutoff,
            min_forename_count: self.min_count,
            jobs: self.jobs,
        };
        config.validate()?;
        Ok(config)
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Everything the ingestion pipeline needs, passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_root: PathBuf,
    pub start_year: i32,
    pub end_year: i32,
    pub step: usize,
    pub age_threshold: u32,
    pub schema_cutoff_year: i32,
    pub min_forename_count: u64,
    /// `None` lets the thread pool pick its own size.
    pub jobs: Option<usize>,
}

impl PipelineConfig {
    /// Config with the documented defaults for everything but the year range.
    pub fn new(source_root: impl Into<PathBuf>, start_year: i32, end_year: i32) -> Self {
        Self {
            source_root: source_root.into(),
            start_year,
            end_year,
            step: 1,
            age_threshold: DEFAULT_AGE_THRESHOLD,
            schema_cutoff_year: DEFAULT_SCHEMA_CUTOFF_YEAR,
            min_forename_count: 1,
            jobs: None,
        }
    }

    /// Reject settings that cannot describe a run.  Touches no files.
    pub fn validate(&self) -> Result<()> {
        for (label, year) in [("start", self.start_year), ("end", self.end_year)] {
            if !REGISTER_YEARS.contains(&year) {
                return Err(RegisterError::Config(format!(
                    "{label} year {year} is outside {}-{}",
                    REGISTER_YEARS.start(),
                    REGISTER_YEARS.end()
                )));
            }
        }
        if self.end_year < self.start_year {
            return Err(RegisterError::Config(format!(
                "end year {} is before start year {}",
                self.end_year, self.start_year
            )));
        }
        if self.step == 0 {
            return Err(RegisterError::Config(
                "year step must be a positive integer".to_string(),
            ));
        }
        if self.jobs == Some(0) {
            return Err(RegisterError::Config(
                "jobs must be a positive integer".to_string(),
            ));
        }
        if self.min_forename_count == 0 {
            return Err(RegisterError::Config(
                "min-count must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }

    /// Years covered by the run, ascending.
    pub fn years(&self) -> Vec<i32> {
        (self.start_year..=self.end_year)
            .step_by(self.step.max(1))
            .collect()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
