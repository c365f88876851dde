//! Period file location and loading.
//!
//! Register files live at `<root>/<year>/<year>-<quarter>.csv` and are encoded
//! in ISO-8859-15.  Before the schema cutoff every quarter has its own file;
//! from the cutoff onwards only `<year>-1.csv` exists and quarters 2-4 alias it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use encoding_rs::{Encoding, ISO_8859_15};
use registers_core::age::resolve_age;
use registers_core::models::{NormalizedRecord, PeriodKey, RawRecord};
use registers_core::settings::PipelineConfig;
use registers_core::{RegisterError, Result};
use tracing::{debug, info};

/// Header names every period file must carry (case-sensitive).
pub const SURNAME_COLUMN: &str = "surname";
pub const GIVEN_NAME_COLUMN: &str = "givenname";
pub const AGE_COLUMN: &str = "age";

// ── Public API ────────────────────────────────────────────────────────────────

/// Outcome of loading one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodLoad {
    /// The period had its own file; records are normalized with ages attached.
    Loaded(Vec<NormalizedRecord>),
    /// No file exists for the period; it reuses the table of the given key.
    AliasOf(PeriodKey),
}

/// Locates and normalizes period files under an explicit source root.
#[derive(Debug, Clone)]
pub struct PeriodLoader {
    source_root: PathBuf,
    schema_cutoff_year: i32,
    encoding: &'static Encoding,
}

impl PeriodLoader {
    pub fn new(source_root: impl Into<PathBuf>, schema_cutoff_year: i32) -> Self {
        Self {
            source_root: source_root.into(),
            schema_cutoff_year,
            encoding: ISO_8859_15,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.source_root.clone(), config.schema_cutoff_year)
    }

    /// `<root>/<year>/<year>-<quarter>.csv`
    pub fn period_path(&self, key: PeriodKey) -> PathBuf {
        self.source_root
            .join(format!("{:04}", key.year()))
            .join(format!("{:04}-{}.csv", key.year(), key.quarter()))
    }

    /// Load `key`, or report which period it aliases.
    ///
    /// A missing or unreadable file, a broken delimited structure and an
    /// absent required column are all fatal.  Unparseable ages are not: they
    /// resolve to `Unknown` and are left for the minor filter.
    pub fn load_period(&self, key: PeriodKey) -> Result<PeriodLoad> {
        if !key.has_source_file(self.schema_cutoff_year) {
            info!("Mapping {}..", key);
            return Ok(PeriodLoad::AliasOf(key.first_quarter()));
        }

        let path = self.period_path(key);
        info!("Reading {}..", path.display());

        let raw = read_period_file(&path, self.encoding)?;
        let records: Vec<NormalizedRecord> = raw
            .into_iter()
            .map(|record| {
                let age = resolve_age(&record.age, key.year());
                NormalizedRecord::from_raw(key, record, age)
            })
            .collect();

        debug!("Period {}: {} records loaded", key, records.len());
        Ok(PeriodLoad::Loaded(records))
    }
}

/// Read every row of a period file as text.
///
/// Blank or missing cells become empty strings.  A row with more cells than
/// the header is rejected, since the extra cells shift every later column.
/// The whole file is decoded
/// with `encoding` and no BOM sniffing, so a stray UTF-8 BOM is kept as text.
pub fn read_period_file(path: &Path, encoding: &'static Encoding) -> Result<Vec<RawRecord>> {
    let bytes = std::fs::read(path).map_err(|source| RegisterError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let (text, _) = encoding.decode_without_bom_handling(&bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let malformed = |source: csv::Error| RegisterError::Malformed {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(malformed)?.clone();
    let columns = ColumnLayout::resolve(&headers, path)?;

    let width = headers.len();
    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(malformed)?;
        if row.len() > width {
            return Err(RegisterError::RowWidth {
                path: path.to_path_buf(),
                line: row.position().map(|pos| pos.line()).unwrap_or_default(),
                expected: width,
                found: row.len(),
            });
        }
        records.push(columns.to_raw_record(&row));
    }
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Header positions of the required columns plus the pass-through ones.
struct ColumnLayout {
    surname: usize,
    given_name: usize,
    age: usize,
    other: Vec<(usize, String)>,
}

impl ColumnLayout {
    fn resolve(headers: &StringRecord, path: &Path) -> Result<Self> {
        let position = |column: &str| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| RegisterError::MissingColumn {
                    path: path.to_path_buf(),
                    column: column.to_string(),
                })
        };

        let surname = position(SURNAME_COLUMN)?;
        let given_name = position(GIVEN_NAME_COLUMN)?;
        let age = position(AGE_COLUMN)?;

        let other = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| ![surname, given_name, age].contains(idx))
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        Ok(Self {
            surname,
            given_name,
            age,
            other,
        })
    }

    fn to_raw_record(&self, row: &StringRecord) -> RawRecord {
        let cell = |idx: usize| row.get(idx).unwrap_or_default().to_string();

        let mut other = BTreeMap::new();
        for (idx, name) in &self.other {
            other.entry(name.clone()).or_insert_with(|| cell(*idx));
        }

        RawRecord {
            surname: cell(self.surname),
            given_name: cell(self.given_name),
            age: cell(self.age),
            other,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
