//! Per-Paschal-year precomputation (`YearContext`) and its process-wide
//! cache.
//!
//! Everything here is keyed off a single Paschal year: the pdist of every
//! feast used as an anchor elsewhere, the floating-commemoration table, and
//! the derived Lucan jump / reserve Sundays bookkeeping. Construction is
//! pure pdist arithmetic; there is no store access in this module.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::dateops::{
    gregorian_date_to_jdn, julian_date_to_jdn, pascha_jdn, surrounding_weekends,
    weekday_from_pdist, SATURDAY, SUNDAY,
};

/// Sentinel pdist meaning "no float in this slot".
pub const NO_FLOAT: i32 = 499;

/// Immutable, per-Paschal-year precomputed context.
///
/// Constructed once per Paschal year and shared behind an `Arc` from
/// [`year_context_for`]; never mutated after publication.
#[derive(Debug, Clone)]
pub struct YearContext {
    pub paschal_year: i32,
    pub use_julian: bool,

    pub pascha: i64,
    pub next_pascha: i64,

    pub theophany: i32,
    pub finding: i32,
    pub annunciation: i32,
    pub peter_and_paul: i32,
    pub fathers_six: i32,
    pub beheading: i32,
    pub nativity_theotokos: i32,
    pub elevation: i32,
    pub fathers_seven: i32,
    pub demetrius_saturday: i32,
    pub synaxis_unmercenaries: i32,
    pub nativity: i32,
    pub forefathers: i32,

    pub lucan_jump: i32,
    pub extra_sundays: i32,

    /// `(floatIndex, pdist)` pairs in ascending floatIndex order, holding
    /// only slots that are actually in effect (sentinel entries are
    /// omitted since a lookup miss already returns `NO_FLOAT`).
    pub floats: Vec<(i32, i32)>,

    pub no_daily: Vec<i32>,
    pub reserves: Vec<i32>,
    pub paremias: Vec<i32>,
    pub no_paremias: Vec<i32>,
}

const THURSDAY: i32 = crate::dateops::THURSDAY;

impl YearContext {
    pub fn new(paschal_year: i32, use_julian: bool) -> Self {
        let pascha = pascha_jdn(paschal_year);
        let next_pascha = pascha_jdn(paschal_year + 1);

        let date_to_pdist_in = |year: i32, month: i32, day: i32| -> i32 {
            let jdn = if use_julian {
                julian_date_to_jdn(year, month, day)
            } else {
                gregorian_date_to_jdn(year, month, day)
            };
            (jdn - pascha) as i32
        };
        let date_to_pdist = |month: i32, day: i32| -> i32 { date_to_pdist_in(paschal_year, month, day) };

        // Theophany is reckoned against the *following* Pascha: Jan 6 of
        // paschal_year+1, not paschal_year itself.
        let theophany = date_to_pdist_in(paschal_year + 1, 1, 6);
        let finding = date_to_pdist(2, 24);
        let annunciation = date_to_pdist(3, 25);
        let peter_and_paul = date_to_pdist(6, 29);

        // Fathers of the Sixth Ecumenical Council: Sunday nearest 7/16.
        let pdist = date_to_pdist(7, 16);
        let weekday = weekday_from_pdist(pdist);
        let fathers_six = if weekday < THURSDAY {
            pdist - weekday
        } else {
            pdist + 7 - weekday
        };

        let beheading = date_to_pdist(8, 29);
        let nativity_theotokos = date_to_pdist(9, 8);
        let elevation = date_to_pdist(9, 14);

        // Fathers of the Seventh Ecumenical Council: Sunday on/after 10/11.
        let mut pdist = date_to_pdist(10, 11);
        let weekday = weekday_from_pdist(pdist);
        if weekday > SUNDAY {
            pdist += 7 - weekday;
        }
        let fathers_seven = pdist;

        // Demetrius Saturday: the Saturday before 10/26.
        let pdist = date_to_pdist(10, 26);
        let demetrius_saturday = pdist - weekday_from_pdist(pdist) - 1;

        // Synaxis of the Unmercenaries: the Sunday following 11/1.
        let pdist = date_to_pdist(11, 1);
        let synaxis_unmercenaries = pdist + 7 - weekday_from_pdist(pdist);

        let nativity = date_to_pdist(12, 25);

        // Forefathers Sunday: the Sunday two weeks before Nativity.
        let weekday = weekday_from_pdist(nativity);
        let forefathers = nativity - 14 + ((7 - weekday) % 7);

        // 168 - (Sunday after Elevation).
        let lucan_jump = 168 - (elevation + 7 - weekday_from_pdist(elevation));

        let floats = compute_floats(
            elevation,
            nativity_theotokos,
            nativity,
            theophany,
            fathers_six,
            fathers_seven,
            demetrius_saturday,
            synaxis_unmercenaries,
        );

        let no_daily = compute_no_daily(theophany, forefathers, nativity, annunciation);

        let (paremias, no_paremias) =
            compute_paremias(elevation, nativity, theophany, annunciation);

        let sun_after_theophany = surrounding_weekends(theophany).3;
        let extra_sundays =
            ((next_pascha - pascha) as i32 - 84 - sun_after_theophany).div_euclid(7);

        let reserves = compute_reserves(forefathers, lucan_jump, extra_sundays);

        YearContext {
            paschal_year,
            use_julian,
            pascha,
            next_pascha,
            theophany,
            finding,
            annunciation,
            peter_and_paul,
            fathers_six,
            beheading,
            nativity_theotokos,
            elevation,
            fathers_seven,
            demetrius_saturday,
            synaxis_unmercenaries,
            nativity,
            forefathers,
            lucan_jump,
            extra_sundays,
            floats,
            no_daily,
            reserves,
            paremias,
            no_paremias,
        }
    }

    /// Linear scan for the float index whose pdist matches; returns the
    /// `NO_FLOAT` sentinel on a miss.
    pub fn lookup_float_index(&self, pdist: i32) -> i32 {
        self.floats
            .iter()
            .find(|(_, p)| *p == pdist)
            .map(|(index, _)| *index)
            .unwrap_or(NO_FLOAT)
    }

    pub fn sunday_after_elevation(&self) -> i32 {
        surrounding_weekends(self.elevation).3
    }

    pub fn sunday_after_theophany(&self) -> i32 {
        surrounding_weekends(self.theophany).3
    }
}

/// Floats around the Elevation of the Cross, around Nativity, and around
/// Theophany-week, reproducing the switch tables keyed on Nativity's
/// weekday and on whether Nativity's eve lands on a weekend.
#[allow(clippy::too_many_arguments)]
fn compute_floats(
    elevation: i32,
    nativity_theotokos: i32,
    nativity: i32,
    theophany: i32,
    fathers_six: i32,
    fathers_seven: i32,
    demetrius_saturday: i32,
    synaxis_unmercenaries: i32,
) -> Vec<(i32, i32)> {
    let mut table: HashMap<i32, i32> = (1001..=1037).map(|i| (i, NO_FLOAT)).collect();

    table.insert(1001, fathers_six);
    table.insert(1002, fathers_seven);
    table.insert(1003, demetrius_saturday);
    table.insert(1004, synaxis_unmercenaries);

    let (sat_before, sun_before, sat_after, sun_after) = surrounding_weekends(elevation);
    if sat_before == nativity_theotokos {
        table.insert(1005, elevation - 1);
    } else {
        table.insert(1006, sat_before);
    }
    table.insert(1007, sun_before);
    table.insert(1008, sun_after);
    table.insert(1009, sat_after);
    table.insert(1010, sun_after);

    let (sat_before, sun_before, sat_after, sun_after) = surrounding_weekends(nativity);
    if nativity - 1 == sat_before {
        table.insert(1012, sun_before);
        table.insert(1013, nativity - 2);
        table.insert(1015, nativity - 1);
    } else if nativity - 1 == sun_before {
        table.insert(1011, sat_before);
        table.insert(1013, nativity - 3);
        table.insert(1016, nativity - 1);
    } else {
        table.insert(1011, sat_before);
        table.insert(1012, sun_before);
        table.insert(1014, nativity - 1);
    }

    let (sat_before_theophany, sun_before_theophany, sat_after_theophany, sun_after_theophany) =
        surrounding_weekends(theophany);
    match weekday_from_pdist(nativity) {
        crate::dateops::SUNDAY => {
            table.insert(1017, sat_after);
            table.insert(1020, nativity + 1);
            table.insert(1024, sun_before_theophany);
            table.insert(1026, theophany - 1);
        }
        crate::dateops::MONDAY => {
            table.insert(1017, sat_after);
            table.insert(1021, sun_after);
            table.insert(1023, theophany - 5);
            table.insert(1026, theophany - 1);
        }
        crate::dateops::TUESDAY => {
            table.insert(1019, sat_after);
            table.insert(1021, sun_after);
            table.insert(1027, sat_before_theophany);
            table.insert(1023, theophany - 5);
            table.insert(1025, theophany - 2);
        }
        crate::dateops::WEDNESDAY => {
            table.insert(1019, sat_after);
            table.insert(1021, sun_after);
            table.insert(1022, sat_before_theophany);
            table.insert(1028, sun_before_theophany);
            table.insert(1025, theophany - 3);
        }
        crate::dateops::THURSDAY | crate::dateops::FRIDAY => {
            table.insert(1019, sat_after);
            table.insert(1021, sun_after);
            table.insert(1022, sat_before_theophany);
            table.insert(1024, sun_before_theophany);
            table.insert(1026, theophany - 1);
        }
        crate::dateops::SATURDAY => {
            table.insert(1018, nativity + 6);
            table.insert(1021, sun_after);
            table.insert(1022, sat_before_theophany);
            table.insert(1024, sun_before_theophany);
            table.insert(1026, theophany - 1);
        }
        _ => unreachable!("weekday_from_pdist always returns 0..=6"),
    }
    table.insert(1029, sat_after_theophany);
    table.insert(1030, sun_after_theophany);

    let mut floats: Vec<(i32, i32)> = table
        .into_iter()
        .filter(|(_, pdist)| *pdist != NO_FLOAT)
        .collect();
    floats.sort_by_key(|(index, _)| *index);
    floats
}

/// Days on which daily (non-feast) readings are suppressed.
fn compute_no_daily(theophany: i32, forefathers: i32, nativity: i32, annunciation: i32) -> Vec<i32> {
    let (_, sun_before_theophany, sat_after_theophany, sun_after_theophany) =
        surrounding_weekends(theophany);
    let (_, sun_before_nativity, _, sun_after_nativity) = surrounding_weekends(nativity);

    let mut days = vec![
        sun_before_theophany,
        sun_after_theophany,
        theophany,
        theophany - 5,
        theophany - 1,
        forefathers,
        sun_before_nativity,
        nativity - 1,
        nativity,
        nativity + 1,
        sun_after_nativity,
    ];

    if sat_after_theophany == theophany + 1 {
        days.push(theophany + 1);
    }
    if weekday_from_pdist(annunciation) == SATURDAY {
        days.push(annunciation);
    }

    days
}

/// Vespers Old-Testament readings (paremias) for the eves of major feasts.
///
/// The eve of a feast falling Monday..Friday calls for paremias the evening
/// before; a feast falling on a weekend suppresses them instead. This is a
/// literal translation of the documented rule; see the design ledger for
/// the reserves/paremias open question this rests on.
fn compute_paremias(
    elevation: i32,
    nativity: i32,
    theophany: i32,
    annunciation: i32,
) -> (Vec<i32>, Vec<i32>) {
    let mut paremias = vec![NO_FLOAT];
    let mut no_paremias = vec![NO_FLOAT];

    for feast in [elevation, nativity, theophany, annunciation] {
        let weekday = weekday_from_pdist(feast);
        if (crate::dateops::MONDAY..=crate::dateops::FRIDAY).contains(&weekday) {
            paremias.push(feast - 1);
        } else {
            no_paremias.push(feast - 1);
        }
    }

    (paremias, no_paremias)
}

/// Reserve Sundays: Lucan-cycle Gospels carried over a long Paschal year.
///
/// Walks `forefathers + lucanJump + 7 .. 266` for the main range, then, if
/// that falls short of `extraSundays` entries, prepends an earlier range
/// ending at 168 so the combined list always has exactly `extraSundays`
/// entries — see the design ledger for why the exact values are a
/// documented open question rather than a literal translation.
fn compute_reserves(forefathers: i32, lucan_jump: i32, extra_sundays: i32) -> Vec<i32> {
    if extra_sundays <= 0 {
        return Vec::new();
    }
    let extra_sundays = extra_sundays as usize;

    let mut main: Vec<i32> = Vec::new();
    let mut i = forefathers + lucan_jump + 7;
    while i <= 266 {
        main.push(i);
        i += 7;
    }

    if main.len() >= extra_sundays {
        let skip = main.len() - extra_sundays;
        return main[skip..].to_vec();
    }

    let needed = extra_sundays - main.len();
    let mut prefix: Vec<i32> = Vec::new();
    let mut i = 168 - (needed as i32) * 7;
    for _ in 0..needed {
        prefix.push(i);
        i += 7;
    }
    prefix.extend(main);
    prefix
}

static YEAR_CACHE: Lazy<Mutex<HashMap<(i32, bool), Arc<YearContext>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the cached `YearContext` for `paschal_year`, constructing and
/// publishing it at most once. Readers never hold the lock while consuming
/// the returned context.
pub fn year_context_for(paschal_year: i32, use_julian: bool) -> Arc<YearContext> {
    let key = (paschal_year, use_julian);
    let mut cache = YEAR_CACHE.lock().expect("year cache mutex poisoned");
    if let Some(existing) = cache.get(&key) {
        return Arc::clone(existing);
    }
    let context = Arc::new(YearContext::new(paschal_year, use_julian));
    cache.insert(key, Arc::clone(&context));
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_for_2018_match_hand_verified_facts() {
        let ctx = YearContext::new(2018, false);
        assert_eq!(ctx.elevation, 159);
        assert_eq!(ctx.nativity, 261);
        assert_eq!(ctx.forefathers, 252);
        assert_eq!(ctx.annunciation, -14);
        assert_eq!(ctx.lucan_jump, 7);
        assert_eq!(ctx.extra_sundays, 3);
    }

    #[test]
    fn reserves_length_matches_extra_sundays_when_positive() {
        let ctx = YearContext::new(2018, false);
        assert_eq!(ctx.reserves.len(), ctx.extra_sundays.max(0) as usize);
    }

    #[test]
    fn float_lookup_misses_return_sentinel() {
        let ctx = YearContext::new(2018, false);
        assert_eq!(ctx.lookup_float_index(999_999), NO_FLOAT);
    }

    #[test]
    fn float_lookup_hits_fathers_six() {
        let ctx = YearContext::new(2018, false);
        assert_eq!(ctx.lookup_float_index(ctx.fathers_six), 1001);
    }

    #[test]
    fn year_context_for_caches_and_shares_instances() {
        let a = year_context_for(2018, false);
        let b = year_context_for(2018, false);
        assert!(Arc::ptr_eq(&a, &b));
    }
}
