//! Folding per-period tables into one dataset, and forename counting.

use std::collections::BTreeMap;
use std::sync::Arc;

use registers_core::models::{NormalizedRecord, PeriodKey};

// ── PeriodTable ───────────────────────────────────────────────────────────────

/// The filtered records standing for one period.
#[derive(Debug, Clone)]
pub enum PeriodTable {
    /// Records read from the period's own file.
    Loaded(Arc<[NormalizedRecord]>),
    /// Shares the table of `source` instead of holding records of its own.
    Aliased {
        source: PeriodKey,
        records: Arc<[NormalizedRecord]>,
    },
}

impl PeriodTable {
    pub fn loaded(records: Vec<NormalizedRecord>) -> Self {
        PeriodTable::Loaded(records.into())
    }

    /// An alias of this table attributed to `source`; no records are copied.
    pub fn alias(&self, source: PeriodKey) -> Self {
        PeriodTable::Aliased {
            source,
            records: Arc::clone(self.shared()),
        }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        self.shared()
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, PeriodTable::Aliased { .. })
    }

    fn shared(&self) -> &Arc<[NormalizedRecord]> {
        match self {
            PeriodTable::Loaded(records) | PeriodTable::Aliased { records, .. } => records,
        }
    }
}

/// Period tables keyed, and therefore ordered, by year then quarter.
pub type PeriodTables = BTreeMap<PeriodKey, PeriodTable>;

// ── Dataset ───────────────────────────────────────────────────────────────────

/// The unified record set, in ascending year then quarter order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── ForenameFrequencyTable ────────────────────────────────────────────────────

/// Occurrences of each lowercase first forename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForenameFrequencyTable {
    counts: BTreeMap<String, u64>,
}

impl ForenameFrequencyTable {
    pub fn get(&self, forename: &str) -> Option<u64> {
        self.counts.get(forename).copied()
    }

    /// Number of distinct forenames.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Entries sorted by forename.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Drop forenames seen fewer than `min_count` times.
    pub fn with_min_count(mut self, min_count: u64) -> Self {
        self.counts.retain(|_, count| *count >= min_count);
        self
    }
}

// ── DatasetAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that folds period tables and derives forename counts.
pub struct DatasetAggregator;

impl DatasetAggregator {
    /// Concatenate period tables into one [`Dataset`].
    ///
    /// Years before `schema_cutoff_year` contribute all their quarters in
    /// order; later years contribute quarter 1 once, so aliased quarters are
    /// never counted twice.
    pub fn aggregate(periods: &PeriodTables, schema_cutoff_year: i32) -> Dataset {
        let records = periods
            .iter()
            .filter(|(key, _)| key.has_source_file(schema_cutoff_year))
            .flat_map(|(_, table)| table.records().iter().cloned())
            .collect();

        Dataset { records }
    }

    /// Count the lowercase first token of every record's given name.
    ///
    /// Records whose given name has no tokens are skipped.
    pub fn forename_frequencies(dataset: &Dataset) -> ForenameFrequencyTable {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for forename in dataset.records().iter().filter_map(NormalizedRecord::forename) {
            *counts.entry(forename).or_insert(0) += 1;
        }
        ForenameFrequencyTable { counts }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
