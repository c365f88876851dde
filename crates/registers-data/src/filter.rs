//! Removal of minors and unresolved ages.

use registers_core::models::NormalizedRecord;

/// Keep records whose age is known and at least `threshold`.
///
/// Surviving records keep their relative order.
pub fn filter_minors(records: Vec<NormalizedRecord>, threshold: u32) -> Vec<NormalizedRecord> {
    records
        .into_iter()
        .filter(|record| record.age.is_at_least(threshold))
        .collect()
}
