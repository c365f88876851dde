use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{RegisterError, Result};

/// Year from which the registers are published as a single annual file.
pub const DEFAULT_SCHEMA_CUTOFF_YEAR: i32 = 1984;

/// Quarters of a register year, in aggregation order.
pub const QUARTERS: [u8; 4] = [1, 2, 3, 4];

/// Text written in place of an unresolved age.
pub const UNKNOWN_AGE_MARKER: &str = "NaN";

/// Resolved age of a register record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeValue {
    /// Age in whole years.
    Known(u32),
    /// The raw age field could not be resolved.
    Unknown,
}

impl AgeValue {
    /// `true` when the age is known and at least `threshold`.
    pub fn is_at_least(&self, threshold: u32) -> bool {
        matches!(self, AgeValue::Known(age) if *age >= threshold)
    }
}

impl fmt::Display for AgeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeValue::Known(age) => write!(f, "{age}"),
            AgeValue::Unknown => f.write_str(UNKNOWN_AGE_MARKER),
        }
    }
}

/// One `(year, quarter)` unit of source data.
///
/// Ordering is by year, then quarter, which is the aggregation order.
/// Keys are only built through [`PeriodKey::new`] or [`PeriodKey::quarters_of`],
/// so the quarter is always in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PeriodKey {
    year: i32,
    quarter: u8,
}

impl PeriodKey {
    /// Build a key, rejecting quarters outside `1..=4`.
    pub fn new(year: i32, quarter: u8) -> Result<Self> {
        if !QUARTERS.contains(&quarter) {
            return Err(RegisterError::Config(format!(
                "quarter {quarter} is out of range (expected 1-4)"
            )));
        }
        Ok(Self { year, quarter })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    /// The four periods of `year`, in quarter order.
    pub fn quarters_of(year: i32) -> [PeriodKey; 4] {
        QUARTERS.map(|quarter| PeriodKey { year, quarter })
    }

    /// Whether this period has its own source file under the given cutoff.
    ///
    /// Before the cutoff every quarter is published separately; from the
    /// cutoff onwards only quarter 1 exists and covers the whole year.
    pub fn has_source_file(&self, schema_cutoff_year: i32) -> bool {
        self.year < schema_cutoff_year || self.quarter == 1
    }

    /// Quarter 1 of the same year.
    pub fn first_quarter(&self) -> PeriodKey {
        PeriodKey {
            year: self.year,
            quarter: 1,
        }
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.quarter)
    }
}

/// One row of a period file, every cell kept as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub surname: String,
    pub given_name: String,
    /// Literal age in early registers, a compact birth date in later ones.
    pub age: String,
    /// Remaining columns keyed by header name.
    pub other: BTreeMap<String, String>,
}

/// A register record after name normalization and age resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    /// Period whose source file the record was read from.
    pub period: PeriodKey,
    /// Uppercased and trimmed.
    pub surname: String,
    /// Uppercased and trimmed.
    pub given_name: String,
    /// The age field exactly as read.
    pub raw_age: String,
    pub age: AgeValue,
    pub other: BTreeMap<String, String>,
}

impl NormalizedRecord {
    /// Normalize `raw`, attaching an already-resolved age.
    pub fn from_raw(period: PeriodKey, raw: RawRecord, age: AgeValue) -> Self {
        Self {
            period,
            surname: normalize_name(&raw.surname),
            given_name: normalize_name(&raw.given_name),
            raw_age: raw.age,
            age,
            other: raw.other,
        }
    }

    /// Lowercased first whitespace-delimited token of the given name.
    pub fn forename(&self) -> Option<String> {
        self.given_name
            .split_whitespace()
            .next()
            .map(|token| token.to_lowercase())
    }
}

/// Case-fold a name column to uppercase and strip surrounding whitespace.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── AgeValue ──────────────────────────────────────────────────────────────

    #[test]
    fn test_age_value_is_at_least() {
        assert!(AgeValue::Known(18).is_at_least(18));
        assert!(AgeValue::Known(45).is_at_least(18));
        assert!(!AgeValue::Known(17).is_at_least(18));
        assert!(!AgeValue::Unknown.is_at_least(0));
    }

    #[test]
    fn test_age_value_display() {
        assert_eq!(AgeValue::Known(57).to_string(), "57");
        assert_eq!(AgeValue::Unknown.to_string(), "NaN");
    }

    // ── PeriodKey ─────────────────────────────────────────────────────────────

    #[test]
    fn test_period_key_rejects_bad_quarter() {
        assert!(PeriodKey::new(1900, 0).is_err());
        assert!(PeriodKey::new(1900, 5).is_err());
        let key = PeriodKey::new(1900, 4).unwrap();
        assert_eq!((key.year(), key.quarter()), (1900, 4));
    }

    #[test]
    fn test_quarters_of_and_first_quarter() {
        let keys = PeriodKey::quarters_of(1901);
        let quarters: Vec<u8> = keys.iter().map(|k| k.quarter()).collect();
        assert_eq!(quarters, vec![1, 2, 3, 4]);
        assert!(keys.iter().all(|k| k.year() == 1901));
        assert_eq!(keys[3].first_quarter(), keys[0]);
    }

    #[test]
    fn test_period_key_ordering_is_year_then_quarter() {
        let mut keys = vec![
            PeriodKey::new(1901, 1).unwrap(),
            PeriodKey::new(1900, 4).unwrap(),
            PeriodKey::new(1900, 2).unwrap(),
        ];
        keys.sort();
        let labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["1900-2", "1900-4", "1901-1"]);
    }

    #[test]
    fn test_has_source_file_follows_cutoff() {
        let cutoff = DEFAULT_SCHEMA_CUTOFF_YEAR;
        assert!(PeriodKey::new(1983, 3).unwrap().has_source_file(cutoff));
        assert!(PeriodKey::new(1984, 1).unwrap().has_source_file(cutoff));
        assert!(!PeriodKey::new(1984, 2).unwrap().has_source_file(cutoff));
        assert!(!PeriodKey::new(1990, 4).unwrap().has_source_file(cutoff));
    }

    // ── NormalizedRecord ──────────────────────────────────────────────────────

    #[test]
    fn test_from_raw_uppercases_and_trims_names() {
        let raw = RawRecord {
            surname: "  smith ".to_string(),
            given_name: " Mary Ann".to_string(),
            age: " 45 ".to_string(),
            other: BTreeMap::new(),
        };
        let period = PeriodKey::new(1900, 1).unwrap();
        let record = NormalizedRecord::from_raw(period, raw, AgeValue::Known(45));

        assert_eq!(record.surname, "SMITH");
        assert_eq!(record.given_name, "MARY ANN");
        assert_eq!(record.raw_age, " 45 ");
        assert_eq!(record.forename().as_deref(), Some("mary"));
    }

    #[test]
    fn test_forename_of_blank_given_name_is_none() {
        let raw = RawRecord {
            given_name: "   ".to_string(),
            ..Default::default()
        };
        let period = PeriodKey::new(1900, 1).unwrap();
        let record = NormalizedRecord::from_raw(period, raw, AgeValue::Unknown);
        assert!(record.forename().is_none());
    }
}
