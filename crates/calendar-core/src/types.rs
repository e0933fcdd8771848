//! Enumerated descriptions and row types shared across `year` and `day`.
//!
//! Feast level, fast level, and fast exception are stored as plain integers
//! (per the seed scenarios' integer interpretation — see the ambiguity note
//! in `day`) with human descriptions looked up separately, rather than as
//! typed enums with a `Display` impl, since the store rows that drive them
//! arrive as raw integers from an external table.

use serde::{Deserialize, Serialize};

/// Weekday constant, 0 = Sunday .. 6 = Saturday.
pub use crate::dateops::{FRIDAY, MONDAY, SATURDAY, SUNDAY, THURSDAY, TUESDAY, WEDNESDAY};

/// Sentinel float index meaning "no float in effect".
pub const NO_FLOAT: i32 = 499;

/// Human description of a feast level in `[-1, 8]`. Returns `"Unknown"` for
/// values outside that range, which should not occur from well-formed store
/// rows.
pub fn feast_level_description(level: i32) -> &'static str {
    match level {
        -1 => "No Liturgy",
        0 => "Liturgy",
        1 => "Presanctified",
        2 => "Black squigg",
        3 => "Red squigg",
        4 => "Red cross",
        5 => "Red cross half-circle",
        6 => "Red cross circle",
        7 => "Major feast Theotokos",
        8 => "Major feast Lord",
        _ => "Unknown",
    }
}

/// Human description of a fast level in `[0, 5]`.
pub fn fast_level_description(level: i32) -> &'static str {
    match level {
        0 => "No Fast",
        1 => "Fast",
        2 => "Lent",
        3 => "Apostles' Fast",
        4 => "Dormition Fast",
        5 => "Nativity Fast",
        _ => "Unknown",
    }
}

/// Human description of a fast exception in `[1, 11]`. `0` means "no
/// exception" and has no description.
pub fn fast_exception_description(exception: i32) -> &'static str {
    match exception {
        1 => "Wine & Oil",
        2 => "Fish, Wine & Oil",
        3 => "Wine & Oil (cannot be overridden by 2)",
        4 => "Fish, Wine & Oil (overrides 3)",
        5 => "Wine",
        6 => "Wine, Oil & Caviar",
        7 => "Meat Fast",
        8 => "Strict Fast (Wine & Oil)",
        9 => "Strict Fast",
        10 => "No overrides",
        11 => "Fast Free",
        _ => "",
    }
}

/// A single verse of scripture, as resolved from the bible store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub book: String,
    pub chapter: i32,
    pub verse: i32,
    pub content: String,
}

/// A scripture reading appointed to a day, with its resolved verse text
/// when a bible store was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub source: String,
    pub book: String,
    pub description: String,
    pub display: String,
    pub short_display: String,
    pub passage: Vec<Verse>,
}

/// A complete liturgical day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub weekday: i32,

    pub pdist: i32,
    pub jdn: i64,

    pub titles: Vec<String>,
    pub feasts: Vec<String>,
    pub saints: Vec<String>,
    pub service_notes: Vec<String>,

    pub feast_level: i32,
    pub fast_level: i32,
    pub fast_exception: i32,
    pub tone: i32,

    pub readings: Vec<Reading>,
}

impl Day {
    pub fn feast_level_description(&self) -> &'static str {
        feast_level_description(self.feast_level)
    }

    pub fn fast_level_description(&self) -> &'static str {
        fast_level_description(self.fast_level)
    }

    pub fn fast_exception_description(&self) -> &'static str {
        fast_exception_description(self.fast_exception)
    }
}

/// A single row returned by `CommemorationStore::query`, mirroring the
/// `days` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommemorationRow {
    pub pdist: i32,
    pub month: i32,
    pub day: i32,
    pub title: String,
    pub subtitle: String,
    pub feast_name: String,
    pub feast_level: i32,
    pub service_note: String,
    pub saint: String,
    pub fast: i32,
    pub fast_exception: i32,
}

/// A single row returned by `ReadingStore::query`, joining `readings` and
/// `pericopes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRow {
    pub pdist: i32,
    pub source: String,
    pub description: String,
    pub month: i32,
    pub day: i32,
    pub book: String,
    pub pericope: i32,
    pub ordering: i32,
    pub display: String,
    pub short_display: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feast_level_descriptions_cover_the_documented_range() {
        assert_eq!(feast_level_description(-1), "No Liturgy");
        assert_eq!(feast_level_description(8), "Major feast Lord");
        assert_eq!(feast_level_description(42), "Unknown");
    }

    #[test]
    fn fast_exception_descriptions_cover_the_documented_range() {
        assert_eq!(fast_exception_description(11), "Fast Free");
        assert_eq!(fast_exception_description(0), "");
    }
}
