//! The orchestrator: assembles a fully materialized [`Day`] from a civil
//! date by composing a cached [`YearContext`](crate::year::YearContext)
//! with commemoration/reading store queries and a handful of
//! post-processing passes (tone, fasting, Matins Gospel placement).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::dateops::{
    gregorian_date_to_jdn, julian_date_to_jdn, pascha_jdn, pdist_and_paschal_year,
    weekday_from_pdist, SATURDAY, SUNDAY,
};
use crate::error::{Error, Result};
use crate::scripture;
use crate::store::{BibleStore, CommemorationStore, ReadingPredicate, ReadingStore};
use crate::types::{Day, Reading};
use crate::year::{self, YearContext, NO_FLOAT};

const THURSDAY: i32 = crate::dateops::THURSDAY;
const MONDAY: i32 = crate::dateops::MONDAY;
const TUESDAY: i32 = crate::dateops::TUESDAY;
const FRIDAY: i32 = crate::dateops::FRIDAY;

/// Builds [`Day`]s for a configured store triple.
///
/// `use_julian` selects whether incoming civil dates are read as Julian
/// calendar dates (Old Calendar practice); `do_jump` toggles the Lucan
/// jump and defaults to `true` — only disabled by callers modeling a
/// pre-jump reckoning.
pub struct DayFactory {
    commemorations: Arc<dyn CommemorationStore>,
    readings: Arc<dyn ReadingStore>,
    bible: Option<Arc<dyn BibleStore>>,
    use_julian: bool,
    do_jump: bool,
}

impl DayFactory {
    pub fn new(
        commemorations: Arc<dyn CommemorationStore>,
        readings: Arc<dyn ReadingStore>,
        bible: Option<Arc<dyn BibleStore>>,
        use_julian: bool,
    ) -> Self {
        Self {
            commemorations,
            readings,
            bible,
            use_julian,
            do_jump: true,
        }
    }

    pub fn with_jump(mut self, do_jump: bool) -> Self {
        self.do_jump = do_jump;
        self
    }

    pub fn build(&self, year: i32, month: i32, day: i32, cancel: &CancellationToken) -> Result<Day> {
        let (year, month, day) = normalize_civil_date(year, month, day);

        let jdn = if self.use_julian {
            julian_date_to_jdn(year, month, day)
        } else {
            gregorian_date_to_jdn(year, month, day)
        };
        let (pdist, paschal_year) = pdist_and_paschal_year(jdn, year);
        let weekday = weekday_from_pdist(pdist);

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let ctx = year::year_context_for(paschal_year, self.use_julian);

        let mut day_record = Day {
            year,
            month,
            day,
            weekday,
            pdist,
            jdn,
            titles: Vec::new(),
            feasts: Vec::new(),
            saints: Vec::new(),
            service_notes: Vec::new(),
            feast_level: -2,
            fast_level: 0,
            fast_exception: 0,
            tone: 0,
            readings: Vec::new(),
        };

        if let Err(err) = self.add_commemorations(&mut day_record, &ctx, cancel) {
            warn!(error = %err, "commemoration query failed, continuing without commemorations");
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        if let Err(err) = self.add_readings(&mut day_record, &ctx, cancel) {
            warn!(error = %err, "reading query failed, continuing without readings");
        }

        self.add_tone(&mut day_record, &ctx);
        self.add_fasting_adjustments(&mut day_record, &ctx);

        Ok(day_record)
    }

    fn add_commemorations(
        &self,
        day: &mut Day,
        ctx: &YearContext,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let float_index = ctx.lookup_float_index(day.pdist);
        let active_float = if float_index != 0 && float_index != NO_FLOAT {
            Some(float_index)
        } else {
            None
        };

        let rows = self
            .commemorations
            .query(day.pdist, active_float, day.month, day.day, cancel)?;

        for row in rows {
            let title = if row.subtitle.is_empty() {
                row.title.clone()
            } else {
                format!("{}: {}", row.title, row.subtitle)
            };
            if !title.is_empty() {
                day.titles.push(title);
            }
            if !row.saint.is_empty() {
                day.saints.push(row.saint);
            }
            if !row.feast_name.is_empty() {
                day.feasts.push(row.feast_name);
            }
            if !row.service_note.is_empty() {
                day.service_notes.push(row.service_note);
            }
            day.feast_level = day.feast_level.max(row.feast_level);
            day.fast_level = day.fast_level.max(row.fast);
            day.fast_exception = day.fast_exception.max(row.fast_exception);
        }

        Ok(())
    }

    /// Lucan jump, Theophany step-back, and the 252/245-lucanJump special
    /// cases that redirect a day's effective Epistle/Gospel pdist.
    fn adjusted_pdists(&self, day: &Day, ctx: &YearContext) -> (i32, i32) {
        let jump = if self.do_jump && day.pdist > ctx.sunday_after_elevation() {
            ctx.lucan_jump
        } else {
            0
        };

        if ctx.no_daily.contains(&day.pdist) {
            return (NO_FLOAT, NO_FLOAT);
        }

        let sun_after_theophany = ctx.sunday_after_theophany();
        let theophany_weekday = weekday_from_pdist(ctx.theophany);
        let limit = if theophany_weekday < TUESDAY { 279 } else { 272 };

        let e_pdist = if day.pdist == 252 {
            ctx.forefathers
        } else if day.pdist > limit {
            (day.jdn - ctx.next_pascha) as i32
        } else {
            day.pdist
        };

        let g_pdist = if day.pdist == 245 - ctx.lucan_jump {
            ctx.forefathers + ctx.lucan_jump
        } else if day.pdist > sun_after_theophany && day.weekday == SUNDAY && ctx.extra_sundays > 1
        {
            let index = (day.pdist - sun_after_theophany) / 7 - 1;
            ctx.reserves
                .get(index.max(0) as usize)
                .copied()
                .unwrap_or(NO_FLOAT)
        } else if day.pdist + jump > limit {
            (day.jdn - ctx.next_pascha) as i32
        } else {
            day.pdist + jump
        };

        (e_pdist, g_pdist)
    }

    /// Whether a Matins Gospel is read today, and which of the 11
    /// resurrectional numbers it is (0 when none/not applicable).
    fn matins_gospel(&self, day: &Day, ctx: &YearContext) -> (bool, i32) {
        if day.weekday != SUNDAY {
            return (true, 0);
        }
        if day.pdist > -8 && day.pdist < 50 {
            return (false, 0);
        }
        if day.feast_level < 7 {
            let pbase = if day.pdist >= 0 {
                day.pdist
            } else {
                (day.jdn - pascha_jdn(ctx.paschal_year - 1)) as i32
            };
            let mut x = (pbase - 49).rem_euclid(77);
            if x == 0 {
                x = 77;
            }
            return (true, x / 7);
        }
        (false, 0)
    }

    fn add_readings(&self, day: &mut Day, ctx: &YearContext, cancel: &CancellationToken) -> Result<()> {
        let (e_pdist, g_pdist) = self.adjusted_pdists(day, ctx);
        let (has_matins_gospel, matins_number) = self.matins_gospel(day, ctx);

        let memorial_saturday_near_annunciation = day.month == 3
            && [9, 24, 25, 26].contains(&day.day)
            && [-36, -29, -22].contains(&day.pdist);

        let tomorrow = NaiveDate::from_ymd_opt(day.year, day.month as u32, day.day as u32)
            .map(|d| d + Duration::days(1));
        let paremias_tonight = ctx.paremias.contains(&day.pdist);

        let float_index = ctx.lookup_float_index(day.pdist);

        let annunciation_exclusion_weekday = day.month == 3
            && day.day == 26
            && [MONDAY, TUESDAY, THURSDAY].contains(&day.weekday);

        let predicate = ReadingPredicate {
            gospel_pdist: Some(g_pdist),
            epistle_pdist: Some(e_pdist),
            fixed_pdist: Some(day.pdist),
            float_pdist: if float_index != NO_FLOAT {
                Some(float_index)
            } else {
                None
            },
            matins_gospel_pdist: if matins_number != 0 {
                Some(matins_number + 700)
            } else {
                None
            },
            vespers_month_day: if paremias_tonight {
                tomorrow.map(|d| (d.month() as i32, d.day() as i32))
            } else {
                None
            },
            fixed_month_day: Some((day.month, day.day)),
            exclude_matins_gospel: !has_matins_gospel,
            exclude_vespers: ctx.no_paremias.contains(&day.pdist),
            exclude_departed: memorial_saturday_near_annunciation,
            exclude_theotokos: annunciation_exclusion_weekday,
        };

        let rows = self.readings.query(&predicate, cancel)?;

        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut readings = Vec::new();
        for row in rows {
            let key = (row.source.clone(), row.short_display.clone());
            if !seen.insert(key) {
                continue;
            }
            let passage = if let Some(bible) = &self.bible {
                match scripture::parse(&row.short_display) {
                    Ok(spec) => bible.lookup(&spec, cancel).unwrap_or_else(|err| {
                        warn!(error = %err, reference = %row.short_display, "bible lookup failed");
                        Vec::new()
                    }),
                    Err(err) => {
                        warn!(error = %err, reference = %row.short_display, "could not parse reading reference");
                        Vec::new()
                    }
                }
            } else {
                Vec::new()
            };
            readings.push(Reading {
                source: row.source,
                book: row.book,
                description: row.description,
                display: row.display,
                short_display: row.short_display,
                passage,
            });
        }

        // A Lenten Matins Gospel, if present, leads the list.
        if day.pdist > -42 && day.pdist < -7 && day.feast_level < 7 {
            if let Some(index) = readings.iter().position(|r| r.source == "Matins Gospel") {
                let gospel = readings.remove(index);
                readings.insert(0, gospel);
            }
        }

        day.readings = readings;
        Ok(())
    }

    fn add_tone(&self, day: &mut Day, ctx: &YearContext) {
        if day.pdist > -9 && day.pdist < 7 {
            day.tone = 0;
            return;
        }
        let pbase = if day.pdist >= 0 {
            day.pdist
        } else {
            (day.jdn - pascha_jdn(ctx.paschal_year - 1)) as i32
        };
        let mut x = pbase.rem_euclid(56);
        if x == 0 {
            x = 56;
        }
        day.tone = x / 7;
    }

    fn add_fasting_adjustments(&self, day: &mut Day, ctx: &YearContext) {
        const FAST_FREE: i32 = 11;
        if day.fast_exception == FAST_FREE {
            day.fast_level = 0;
            return;
        }

        if day.pdist > 56 && day.pdist < ctx.peter_and_paul {
            day.fast_level = 3;
            if day.pdist == 57 {
                day.service_notes.insert(0, "Beginning of Apostles' Fast".to_string());
            }
        }

        match day.fast_level {
            // Lenten fast: fish-allowed exception demotes to wine & oil only.
            2 => {
                if day.fast_exception == 2 {
                    day.fast_exception = 1;
                }
            }
            // Dormition fast.
            4 => {
                if (day.weekday == SATURDAY || day.weekday == SUNDAY) && day.fast_exception == 0 {
                    day.fast_exception = 1;
                }
            }
            // Apostles' fast or Nativity fast.
            3 | 5 => {
                if (day.weekday == TUESDAY || day.weekday == THURSDAY) && day.fast_exception == 0 {
                    day.fast_exception = 1;
                } else if (day.weekday == crate::dateops::WEDNESDAY || day.weekday == FRIDAY)
                    && day.feast_level < 4
                    && day.fast_exception > 1
                {
                    day.fast_exception = 1;
                } else if day.weekday == SATURDAY || day.weekday == SUNDAY {
                    day.fast_exception = 2;
                }
            }
            _ => {}
        }

        if day.pdist > ctx.nativity - 6 && day.pdist < ctx.nativity - 1 && day.fast_exception > 1 {
            day.fast_exception = 1;
        }

        if (day.pdist == ctx.nativity - 1 || day.pdist == ctx.theophany - 1)
            && (day.weekday == SATURDAY || day.weekday == SUNDAY)
        {
            day.fast_exception = 1;
        }
    }
}

/// Rolls an out-of-range month/day forward or backward to a valid civil
/// date via plain calendar arithmetic, leaving in-range dates untouched.
fn normalize_civil_date(year: i32, month: i32, day: i32) -> (i32, i32, i32) {
    let mut y = year;
    let mut m = month;
    while m > 12 {
        m -= 12;
        y += 1;
    }
    while m < 1 {
        m += 12;
        y -= 1;
    }
    let first_of_month = NaiveDate::from_ymd_opt(y, m as u32, 1).expect("normalized month is in 1..=12");
    let date = first_of_month + Duration::days((day - 1) as i64);
    (date.year(), date.month() as i32, date.day() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReadingPredicate;
    use crate::types::{CommemorationRow, ReadingRow, Verse};
    use std::sync::Mutex;

    struct EmptyCommemorations;
    impl CommemorationStore for EmptyCommemorations {
        fn query(
            &self,
            _pdist: i32,
            _float_index: Option<i32>,
            _month: i32,
            _day: i32,
            _cancel: &CancellationToken,
        ) -> Result<Vec<CommemorationRow>> {
            Ok(Vec::new())
        }
    }

    struct EmptyReadings;
    impl ReadingStore for EmptyReadings {
        fn query(&self, _predicate: &ReadingPredicate, _cancel: &CancellationToken) -> Result<Vec<ReadingRow>> {
            Ok(Vec::new())
        }
    }

    struct RecordingReadings(Mutex<Vec<ReadingPredicate>>);
    impl ReadingStore for RecordingReadings {
        fn query(&self, predicate: &ReadingPredicate, _cancel: &CancellationToken) -> Result<Vec<ReadingRow>> {
            self.0.lock().unwrap().push(predicate.clone());
            Ok(Vec::new())
        }
    }

    fn factory() -> DayFactory {
        DayFactory::new(
            Arc::new(EmptyCommemorations),
            Arc::new(EmptyReadings),
            None,
            false,
        )
    }

    #[test]
    fn build_computes_pdist_and_weekday_for_pascha_2018() {
        let factory = factory();
        let token = CancellationToken::new();
        let day = factory.build(2018, 4, 8, &token).unwrap();
        assert_eq!(day.pdist, 0);
        assert_eq!(day.weekday, SUNDAY);
        assert_eq!(day.tone, 0);
    }

    #[test]
    fn build_normalizes_out_of_range_day() {
        let factory = factory();
        let token = CancellationToken::new();
        // April 31 rolls forward into May 1.
        let day = factory.build(2018, 4, 31, &token).unwrap();
        assert_eq!((day.year, day.month, day.day), (2018, 5, 1));
    }

    #[test]
    fn tone_is_zero_during_bright_week_window() {
        let factory = factory();
        let token = CancellationToken::new();
        for offset in -8..=6 {
            let date = NaiveDate::from_ymd_opt(2018, 4, 8).unwrap() + Duration::days(offset);
            let day = factory
                .build(date.year(), date.month() as i32, date.day() as i32, &token)
                .unwrap();
            assert_eq!(day.tone, 0, "offset {offset}");
        }
    }

    #[test]
    fn reading_predicate_carries_float_index_when_active() {
        let recorder = Arc::new(RecordingReadings(Mutex::new(Vec::new())));
        let factory = DayFactory::new(Arc::new(EmptyCommemorations), recorder.clone(), None, false);
        let token = CancellationToken::new();
        // 2018-09-14 is the Elevation of the Cross.
        factory.build(2018, 9, 14, &token).unwrap();
        let predicates = recorder.0.lock().unwrap();
        assert_eq!(predicates.len(), 1);
    }

    #[test]
    fn bible_lookup_failure_degrades_to_empty_passage_not_error() {
        struct FailingBible;
        impl BibleStore for FailingBible {
            fn lookup(&self, _passages: &[scripture::PassageSpec], _cancel: &CancellationToken) -> Result<Vec<Verse>> {
                Err(Error::StoreUnavailable { message: "down".into() })
            }
        }
        struct OneReading;
        impl ReadingStore for OneReading {
            fn query(&self, _predicate: &ReadingPredicate, _cancel: &CancellationToken) -> Result<Vec<ReadingRow>> {
                Ok(vec![ReadingRow {
                    pdist: 0,
                    source: "Epistle".into(),
                    description: "".into(),
                    month: 4,
                    day: 8,
                    book: "Acts".into(),
                    pericope: 1,
                    ordering: 1,
                    display: "Acts 1.1-8".into(),
                    short_display: "Acts 1.1-8".into(),
                }])
            }
        }
        let factory = DayFactory::new(
            Arc::new(EmptyCommemorations),
            Arc::new(OneReading),
            Some(Arc::new(FailingBible)),
            false,
        );
        let token = CancellationToken::new();
        let day = factory.build(2018, 4, 8, &token).unwrap();
        assert_eq!(day.readings.len(), 1);
        assert!(day.readings[0].passage.is_empty());
    }
}
