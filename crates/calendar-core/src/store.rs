//! Query facades over the external, read-only commemoration/reading/bible
//! tables.
//!
//! These are plain synchronous traits rather than an async/`async-trait`
//! surface: the queries below are local SQLite lookups, not network calls,
//! so there is nothing for an async runtime to buy here. Concrete
//! implementations live in the `calendar-data` crate.

use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::scripture::PassageSpec;
use crate::types::{CommemorationRow, ReadingRow, Verse};

/// Selects commemoration rows matching the day's pdist, an active float
/// index, or its fixed month/day — see `days` in the external schema.
pub trait CommemorationStore: Send + Sync {
    fn query(
        &self,
        pdist: i32,
        float_index: Option<i32>,
        month: i32,
        day: i32,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommemorationRow>>;
}

/// Selects reading rows (joined with pericopes) matching the dynamic
/// predicate `DayFactory::add_readings` assembles.
pub trait ReadingStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn query(&self, predicate: &ReadingPredicate, cancel: &CancellationToken) -> Result<Vec<ReadingRow>>;
}

/// The disjunction of row-filters `add_readings` builds for one day. Kept
/// as a plain struct of optional clauses rather than raw SQL text, so
/// implementations can bind parameters instead of interpolating them.
#[derive(Debug, Clone, Default)]
pub struct ReadingPredicate {
    pub gospel_pdist: Option<i32>,
    pub epistle_pdist: Option<i32>,
    pub fixed_pdist: Option<i32>,
    pub float_pdist: Option<i32>,
    pub matins_gospel_pdist: Option<i32>,
    pub vespers_month_day: Option<(i32, i32)>,
    pub fixed_month_day: Option<(i32, i32)>,
    pub exclude_matins_gospel: bool,
    pub exclude_vespers: bool,
    pub exclude_departed: bool,
    pub exclude_theotokos: bool,
}

/// Resolves a parsed scripture reference to its verse text.
pub trait BibleStore: Send + Sync {
    fn lookup(&self, passages: &[PassageSpec], cancel: &CancellationToken) -> Result<Vec<Verse>>;
}
