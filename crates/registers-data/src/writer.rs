//! Output files: the forename table, the unified dataset and the run summary.
//!
//! Every file is built in memory and then written to a temporary sibling that
//! is renamed into place, so a failed run never leaves a half-written table.

use std::path::Path;

use registers_core::{RegisterError, Result};

use crate::aggregator::{Dataset, ForenameFrequencyTable};
use crate::pipeline::RunSummary;

/// Write `forename,count` rows sorted by forename, UTF-8.
pub fn write_forename_table(path: &Path, table: &ForenameFrequencyTable) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["forename", "count"])?;
    for (forename, count) in table.iter() {
        writer.write_record([forename, count.to_string().as_str()])?;
    }
    write_atomic(path, &finish(writer, path)?)
}

/// Write the unified dataset in aggregation order.
///
/// `age` is the raw field as read; `clean_age` is the resolved age.
pub fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["year", "quarter", "surname", "givenname", "age", "clean_age"])?;
    for record in dataset.records() {
        writer.write_record([
            record.period.year().to_string().as_str(),
            record.period.quarter().to_string().as_str(),
            record.surname.as_str(),
            record.given_name.as_str(),
            record.raw_age.as_str(),
            record.age.to_string().as_str(),
        ])?;
    }
    write_atomic(path, &finish(writer, path)?)
}

/// Write the run summary as pretty-printed JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| RegisterError::Output {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;
    write_atomic(path, json.as_bytes())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn finish(writer: csv::Writer<Vec<u8>>, path: &Path) -> Result<Vec<u8>> {
    writer.into_inner().map_err(|e| RegisterError::Output {
        path: path.to_path_buf(),
        source: e.into_error(),
    })
}

/// Write `bytes` to a temp file next to `path`, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let output_err = |source: std::io::Error| RegisterError::Output {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(output_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    std::fs::write(&tmp, bytes).map_err(output_err)?;
    std::fs::rename(&tmp, path).map_err(output_err)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
