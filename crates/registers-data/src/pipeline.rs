//! Main ingestion pipeline.
//!
//! For every requested year, loads the four quarters (aliasing the ones that
//! have no file of their own), filters out minors, then folds everything into
//! one [`Dataset`] and its [`ForenameFrequencyTable`].
//!
//! Years are loaded on a rayon pool.  Each year is one task, so quarter 1 is
//! always materialized before its aliases are built, and results are merged
//! into an ordered map so completion order never reaches the output.

use std::time::Instant;

use chrono::Utc;
use rayon::prelude::*;
use registers_core::models::PeriodKey;
use registers_core::settings::PipelineConfig;
use registers_core::{RegisterError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregator::{Dataset, DatasetAggregator, ForenameFrequencyTable, PeriodTable, PeriodTables};
use crate::filter::filter_minors;
use crate::reader::{PeriodLoad, PeriodLoader};

// ── Public types ──────────────────────────────────────────────────────────────

/// Counters describing one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// ISO-8601 timestamp when this summary was generated.
    pub generated_at: String,
    pub start_year: i32,
    pub end_year: i32,
    pub step: usize,
    pub age_threshold: u32,
    pub schema_cutoff_year: i32,
    /// Years actually visited after applying the step.
    pub years_processed: usize,
    /// Periods read from their own file.
    pub periods_loaded: usize,
    /// Periods that reused quarter 1 of their year.
    pub periods_aliased: usize,
    /// Rows read across all loaded files.
    pub rows_read: usize,
    /// Rows surviving the minor filter across all loaded files.
    pub rows_kept: usize,
    /// Records in the unified dataset.
    pub dataset_records: usize,
    /// Distinct forenames in the frequency table.
    pub distinct_forenames: usize,
    /// Wall-clock seconds spent loading and filtering periods.
    pub load_time_seconds: f64,
}

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub periods: PeriodTables,
    pub dataset: Dataset,
    pub forenames: ForenameFrequencyTable,
    pub summary: RunSummary,
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run the full pipeline described by `config`.
///
/// 1. Validate the configuration (no file is touched when this fails).
/// 2. Load, normalize and filter every period of every requested year.
/// 3. Aggregate the period tables into one dataset.
/// 4. Count forenames.
///
/// Any period failure aborts the whole run.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineOutput> {
    config.validate()?;

    let loader = PeriodLoader::from_config(config);
    let years = config.years();

    // ── Step 1: Load periods ──────────────────────────────────────────────────
    let load_start = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs.unwrap_or(0))
        .build()
        .map_err(|e| RegisterError::Config(format!("failed to start loader pool: {e}")))?;

    let year_loads: Vec<YearLoad> = pool.install(|| {
        years
            .par_iter()
            .map(|&year| load_year(&loader, year, config.age_threshold))
            .collect::<Result<Vec<_>>>()
    })?;
    let load_time = load_start.elapsed().as_secs_f64();

    let mut periods = PeriodTables::new();
    let mut rows_read = 0usize;
    let mut rows_kept = 0usize;
    for load in year_loads {
        rows_read += load.rows_read;
        rows_kept += load.rows_kept;
        periods.extend(load.tables);
    }

    // ── Step 2: Aggregate ─────────────────────────────────────────────────────
    let dataset = DatasetAggregator::aggregate(&periods, config.schema_cutoff_year);

    // ── Step 3: Forenames ─────────────────────────────────────────────────────
    let forenames = DatasetAggregator::forename_frequencies(&dataset)
        .with_min_count(config.min_forename_count);

    let periods_aliased = periods.values().filter(|t| t.is_alias()).count();
    let summary = RunSummary {
        generated_at: Utc::now().to_rfc3339(),
        start_year: config.start_year,
        end_year: config.end_year,
        step: config.step,
        age_threshold: config.age_threshold,
        schema_cutoff_year: config.schema_cutoff_year,
        years_processed: years.len(),
        periods_loaded: periods.len() - periods_aliased,
        periods_aliased,
        rows_read,
        rows_kept,
        dataset_records: dataset.len(),
        distinct_forenames: forenames.len(),
        load_time_seconds: load_time,
    };

    info!(
        years = summary.years_processed,
        loaded = summary.periods_loaded,
        aliased = summary.periods_aliased,
        rows_read = summary.rows_read,
        records = summary.dataset_records,
        forenames = summary.distinct_forenames,
        "pipeline complete"
    );

    Ok(PipelineOutput {
        periods,
        dataset,
        forenames,
        summary,
    })
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Filtered tables for the four quarters of one year.
struct YearLoad {
    tables: Vec<(PeriodKey, PeriodTable)>,
    rows_read: usize,
    rows_kept: usize,
}

fn load_year(loader: &PeriodLoader, year: i32, threshold: u32) -> Result<YearLoad> {
    let mut tables: Vec<(PeriodKey, PeriodTable)> = Vec::with_capacity(4);
    let mut rows_read = 0usize;
    let mut rows_kept = 0usize;

    for key in PeriodKey::quarters_of(year) {
        let table = match loader.load_period(key)? {
            PeriodLoad::Loaded(records) => {
                let read = records.len();
                let kept = filter_minors(records, threshold);
                debug!("Period {}: {} read, {} kept", key, read, kept.len());
                rows_read += read;
                rows_kept += kept.len();
                PeriodTable::loaded(kept)
            }
            PeriodLoad::AliasOf(source) => tables
                .iter()
                .find(|(k, _)| *k == source)
                .map(|(_, table)| table.alias(source))
                .ok_or_else(|| {
                    RegisterError::Config(format!(
                        "period {key} aliases {source}, which was not loaded"
                    ))
                })?,
        };
        tables.push((key, table));
    }

    Ok(YearLoad {
        tables,
        rows_read,
        rows_kept,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use registers_core::models::AgeValue;
    use std::path::Path;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    const SAMPLE_ROWS: &str = "surname,givenname,age\n\
                               child,tom,10\n\
                               adult, John Henry ,18\n\
                               elder,mary ann,45\n";

    fn write_period(root: &Path, year: i32, quarter: u8, content: &str) {
        let dir = root.join(year.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{year}-{quarter}.csv")), content).unwrap();
    }

    fn write_full_year(root: &Path, year: i32, content: &str) {
        for quarter in 1..=4 {
            write_period(root, year, quarter, content);
        }
    }

    fn config(root: &Path, start: i32, end: i32) -> PipelineConfig {
        let mut config = PipelineConfig::new(root, start, end);
        config.jobs = Some(2);
        config
    }

    // ── run_pipeline ──────────────────────────────────────────────────────────

    #[test]
    fn test_end_to_end_pre_cutoff_years() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, SAMPLE_ROWS);
        write_full_year(dir.path(), 1901, SAMPLE_ROWS);

        let output = run_pipeline(&config(dir.path(), 1900, 1901)).unwrap();

        // 8 files, 2 adults each.
        assert_eq!(output.dataset.len(), 16);
        assert!(output
            .dataset
            .records()
            .iter()
            .all(|r| matches!(r.age, AgeValue::Known(18) | AgeValue::Known(45))));
        assert_eq!(output.summary.periods_loaded, 8);
        assert_eq!(output.summary.periods_aliased, 0);
        assert_eq!(output.summary.rows_read, 24);
        assert_eq!(output.summary.rows_kept, 16);

        assert_eq!(output.forenames.get("john"), Some(8));
        assert_eq!(output.forenames.get("mary"), Some(8));
        assert_eq!(output.forenames.get("tom"), None);
    }

    #[test]
    fn test_dataset_is_ordered_by_year_then_quarter() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, SAMPLE_ROWS);
        write_full_year(dir.path(), 1901, SAMPLE_ROWS);

        let output = run_pipeline(&config(dir.path(), 1900, 1901)).unwrap();
        let keys: Vec<PeriodKey> = output.dataset.records().iter().map(|r| r.period).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.first().map(|k| k.to_string()).as_deref(), Some("1900-1"));
        assert_eq!(keys.last().map(|k| k.to_string()).as_deref(), Some("1901-4"));
    }

    #[test]
    fn test_post_cutoff_year_counted_once() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1983, SAMPLE_ROWS);
        write_period(dir.path(), 1984, 1, SAMPLE_ROWS);

        let output = run_pipeline(&config(dir.path(), 1983, 1984)).unwrap();

        // 4 files for 1983 plus the single 1984 file, never 4 copies of it.
        assert_eq!(output.dataset.len(), 2 * 5);
        assert_eq!(output.summary.periods_loaded, 5);
        assert_eq!(output.summary.periods_aliased, 3);
        assert_eq!(output.periods.len(), 8);

        let q1 = output.periods[&PeriodKey::new(1984, 1).unwrap()].records();
        let q3 = output.periods[&PeriodKey::new(1984, 3).unwrap()].records();
        assert!(std::ptr::eq(q1, q3));
    }

    #[test]
    fn test_post_cutoff_birth_dates_resolved() {
        let dir = TempDir::new().unwrap();
        write_period(
            dir.path(),
            1990,
            1,
            "surname,givenname,age\nA,Ann,8Mr1893\nB,Bea,3Ja1980\nC,Cy,??\n",
        );

        let output = run_pipeline(&config(dir.path(), 1990, 1990)).unwrap();
        let ages: Vec<AgeValue> = output.dataset.records().iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![AgeValue::Known(97)]);
    }

    #[test]
    fn test_step_skips_years() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, SAMPLE_ROWS);
        // 1901 deliberately absent: step 2 must never ask for it.
        write_full_year(dir.path(), 1902, SAMPLE_ROWS);

        let mut cfg = config(dir.path(), 1900, 1902);
        cfg.step = 2;
        let output = run_pipeline(&cfg).unwrap();
        assert_eq!(output.summary.years_processed, 2);
        assert_eq!(output.dataset.len(), 16);
    }

    #[test]
    fn test_missing_quarter_aborts_run() {
        let dir = TempDir::new().unwrap();
        write_period(dir.path(), 1900, 1, SAMPLE_ROWS);
        write_period(dir.path(), 1900, 2, SAMPLE_ROWS);
        write_period(dir.path(), 1900, 4, SAMPLE_ROWS);

        let err = run_pipeline(&config(dir.path(), 1900, 1900)).unwrap_err();
        match err {
            RegisterError::FileAccess { path, .. } => assert!(path.ends_with("1900/1900-3.csv")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_aborts_run() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, "surname,age\nA,40\n");

        let err = run_pipeline(&config(dir.path(), 1900, 1900)).unwrap_err();
        assert!(matches!(err, RegisterError::MissingColumn { .. }));
    }

    #[test]
    fn test_invalid_config_fails_before_file_access() {
        // The root does not exist; a Config error proves no file was opened.
        let err = run_pipeline(&config(Path::new("/nonexistent/registers"), 1950, 1900))
            .unwrap_err();
        assert!(matches!(err, RegisterError::Config(_)));

        let mut cfg = config(Path::new("/nonexistent/registers"), 1900, 1950);
        cfg.step = 0;
        assert!(matches!(run_pipeline(&cfg), Err(RegisterError::Config(_))));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, SAMPLE_ROWS);

        let mut cfg = config(dir.path(), 1900, 1900);
        cfg.age_threshold = 40;
        let output = run_pipeline(&cfg).unwrap();
        assert_eq!(output.dataset.len(), 4);
        assert!(output.dataset.records().iter().all(|r| r.age.is_at_least(40)));
    }

    #[test]
    fn test_rerun_is_identical() {
        let dir = TempDir::new().unwrap();
        write_full_year(dir.path(), 1900, SAMPLE_ROWS);
        write_period(dir.path(), 1990, 1, SAMPLE_ROWS);

        let mut cfg = config(dir.path(), 1900, 1990);
        cfg.step = 90;
        let first = run_pipeline(&cfg).unwrap();

        cfg.jobs = Some(1);
        let second = run_pipeline(&cfg).unwrap();

        assert_eq!(first.dataset, second.dataset);
        assert_eq!(first.forenames, second.forenames);
    }
}
