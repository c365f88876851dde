//! Age-field disambiguation.
//!
//! Early registers record a small literal age ("45").  Later registers put a
//! compact date of birth in the same column ("8Mr1893") whose only reliably
//! parseable part is the trailing four-digit year.  The field length is the
//! only cue distinguishing the two, so classification and arithmetic are kept
//! separate: [`classify_age_field`] decides which reading applies and
//! [`resolve_age`] turns that reading into an [`AgeValue`].

use crate::models::AgeValue;

/// Fields shorter than this many characters are read as a literal age.
pub const BIRTH_YEAR_MIN_LEN: usize = 4;

/// How a trimmed age field should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeEncoding<'a> {
    /// Short field holding the age itself.
    Literal(&'a str),
    /// Long field whose last four characters should be a birth year.
    BirthYearSuffix(&'a str),
}

/// Classify a trimmed age field by its character length.
pub fn classify_age_field(trimmed: &str) -> AgeEncoding<'_> {
    let len = trimmed.chars().count();
    if len < BIRTH_YEAR_MIN_LEN {
        return AgeEncoding::Literal(trimmed);
    }

    let suffix_start = trimmed
        .char_indices()
        .nth(len - BIRTH_YEAR_MIN_LEN)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    AgeEncoding::BirthYearSuffix(&trimmed[suffix_start..])
}

/// Resolve a raw age field for a record belonging to `reference_year`.
///
/// Never fails: anything that is not a non-negative literal age or a
/// four-digit birth year not after `reference_year` becomes
/// [`AgeValue::Unknown`].
pub fn resolve_age(raw: &str, reference_year: i32) -> AgeValue {
    match classify_age_field(raw.trim()) {
        AgeEncoding::Literal(text) => parse_literal_age(text),
        AgeEncoding::BirthYearSuffix(suffix) => age_from_birth_year(suffix, reference_year),
    }
}

fn parse_literal_age(text: &str) -> AgeValue {
    if !is_decimal(text) {
        return AgeValue::Unknown;
    }
    text.parse::<u32>()
        .map(AgeValue::Known)
        .unwrap_or(AgeValue::Unknown)
}

fn age_from_birth_year(suffix: &str, reference_year: i32) -> AgeValue {
    if !is_decimal(suffix) {
        return AgeValue::Unknown;
    }
    let Ok(birth_year) = suffix.parse::<i32>() else {
        return AgeValue::Unknown;
    };

    match reference_year
        .checked_sub(birth_year)
        .and_then(|years| u32::try_from(years).ok())
    {
        Some(age) => AgeValue::Known(age),
        None => AgeValue::Unknown,
    }
}

/// Non-empty and made only of ASCII decimal digits.
fn is_decimal(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
