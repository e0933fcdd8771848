//! Date arithmetic: conversions between civil dates, Julian Day Numbers
//! (JDN), and the signed "distance from Pascha" (pdist) that the rest of
//! the engine is keyed on.
//!
//! Most calculations here work in JDN or pdist rather than `chrono` types,
//! matching the way the rule engine in `year` and `day` consumes them.

use crate::error::{Error, Result};

pub const SUNDAY: i32 = 0;
pub const MONDAY: i32 = 1;
pub const TUESDAY: i32 = 2;
pub const WEDNESDAY: i32 = 3;
pub const THURSDAY: i32 = 4;
pub const FRIDAY: i32 = 5;
pub const SATURDAY: i32 = 6;

/// Compute the Julian-calendar month/day of Pascha for a given year using
/// the Meeus Julian algorithm.
pub fn pascha_of_year(year: i32) -> (i32, i32) {
    let a = year % 4;
    let b = year % 7;
    let c = year % 19;
    let d = (19 * c + 15) % 30;
    let e = (2 * a + 4 * b - d + 34) % 7;
    let month = (d + e + 114) / 31;
    let day = (d + e + 114) % 31 + 1;
    (month, day)
}

/// Julian Day Number of Pascha for a given year, computed directly from
/// the Julian-calendar date (not routed through a Gregorian conversion,
/// so it carries no [2001, 2099] restriction).
pub fn pascha_jdn(year: i32) -> i64 {
    let (month, day) = pascha_of_year(year);
    julian_date_to_jdn(year, month, day)
}

/// Convert the Julian-calendar date of Pascha to its Gregorian calendar
/// date. Valid only for years in [2001, 2099]; the 13-day Julian/Gregorian
/// offset is hard-coded and incorrect outside that window.
pub fn compute_gregorian_pascha(year: i32) -> Result<chrono::NaiveDate> {
    let (month, day) = pascha_of_year(year);
    julian_to_gregorian(year, month, day)
}

/// Add the 13-day Julian/Gregorian offset to a Julian-calendar civil date.
/// Only valid inside [2001, 2099].
pub fn julian_to_gregorian(year: i32, month: i32, day: i32) -> Result<chrono::NaiveDate> {
    if !(2001..=2099).contains(&year) {
        return Err(Error::OutOfRange { year });
    }
    let julian_date = chrono::NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .ok_or(Error::OutOfRange { year })?;
    Ok(julian_date + chrono::Duration::days(13))
}

/// Convert a Julian-calendar date to a Julian Day Number.
///
/// Integer division here truncates toward zero (Rust's native behavior
/// for `/` on signed integers), which is what the feast-anchor formulas
/// in `year` rely on for negative month offsets.
pub fn julian_date_to_jdn(year: i32, month: i32, day: i32) -> i64 {
    let (year, month, day) = (year as i64, month as i64, day as i64);
    367 * year - (7 * (year + 5001 + (month - 9) / 7)) / 4 + (275 * month) / 9 + day + 1_729_777
}

/// Convert a Gregorian-calendar date to a Julian Day Number. Mirrors PHP's
/// `gregoriantojd()`.
pub fn gregorian_date_to_jdn(year: i32, month: i32, day: i32) -> i64 {
    let (mut year, mut month) = (year as i64, month as i64);
    let day = day as i64;
    if month > 2 {
        month -= 3;
    } else {
        month += 9;
        year -= 1;
    }
    let century = year / 100;
    let ya = year - 100 * century;
    (146_097 * century) / 4 + (1461 * ya) / 4 + (153 * month + 2) / 5 + day + 1_721_119
}

/// Distance of a civil date from Pascha (pdist) and the Paschal year it
/// belongs to. If the raw distance is < -77, the date belongs to the
/// *previous* Paschal year's cycle.
pub fn pascha_distance(year: i32, month: i32, day: i32) -> (i32, i32) {
    let jdn = gregorian_date_to_jdn(year, month, day);
    pdist_and_paschal_year(jdn, year)
}

/// Same rule as [`pascha_distance`], but starting from an already-computed
/// JDN — shared by the Gregorian and Julian civil-date paths.
pub fn pdist_and_paschal_year(jdn: i64, year: i32) -> (i32, i32) {
    let mut paschal_year = year;
    let mut distance = (jdn - pascha_jdn(paschal_year)) as i32;

    if distance < -77 {
        paschal_year -= 1;
        distance = (jdn - pascha_jdn(paschal_year)) as i32;
    }

    (distance, paschal_year)
}

/// Weekday (0 = Sunday .. 6 = Saturday) for a given pdist.
pub fn weekday_from_pdist(distance: i32) -> i32 {
    (7 + distance % 7) % 7
}

/// The Saturday and Sunday immediately before, and immediately after, the
/// given pdist: `(saturday_before, sunday_before, saturday_after, sunday_after)`.
pub fn surrounding_weekends(distance: i32) -> (i32, i32, i32, i32) {
    let saturday_before = distance - weekday_from_pdist(distance) - 1;
    (
        saturday_before,
        saturday_before + 1,
        saturday_before + 7,
        saturday_before + 8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jdn_seed_scenarios() {
        assert_eq!(gregorian_date_to_jdn(2018, 1, 15), 2_458_134);
        assert_eq!(gregorian_date_to_jdn(2000, 5, 29), 2_451_694);
    }

    #[test]
    fn gregorian_pascha_known_years() {
        let cases = [
            (2008, 4, 27),
            (2009, 4, 19),
            (2010, 4, 4),
            (2011, 4, 24),
        ];
        for (year, month, day) in cases {
            let expected = chrono::NaiveDate::from_ymd_opt(year, month, day).unwrap();
            assert_eq!(compute_gregorian_pascha(year).unwrap(), expected, "Pascha {year}");
        }
    }

    #[test]
    fn gregorian_pascha_out_of_range() {
        assert!(matches!(
            compute_gregorian_pascha(2100),
            Err(Error::OutOfRange { year: 2100 })
        ));
    }

    #[test]
    fn pascha_distance_seed_scenarios() {
        assert_eq!(pascha_distance(2018, 5, 9), (31, 2018));
        assert_eq!(pascha_distance(2018, 1, 1), (260, 2017));
    }

    #[test]
    fn pascha_jdn_cross_checks_gregorian_conversion() {
        // Pascha 2018 is April 8 (Gregorian); both paths to its JDN agree.
        let via_julian = pascha_jdn(2018);
        let via_gregorian = gregorian_date_to_jdn(2018, 4, 8);
        assert_eq!(via_julian, via_gregorian);
    }

    #[test]
    fn weekday_from_pdist_matches_civil_weekday() {
        for offset in -70..280 {
            let wd = weekday_from_pdist(offset);
            assert!((0..=6).contains(&wd));
        }
        // Direct anchor: Sept 14 2018 (pdist 159 from Pascha 2018) was a Friday.
        assert_eq!(weekday_from_pdist(159), FRIDAY);
        // Dec 25 2018 (pdist 261) was a Tuesday.
        assert_eq!(weekday_from_pdist(261), TUESDAY);
    }

    #[test]
    fn surrounding_weekends_brackets_the_pdist() {
        let (sat_before, sun_before, sat_after, sun_after) = surrounding_weekends(159);
        assert_eq!(weekday_from_pdist(sat_before), SATURDAY);
        assert_eq!(weekday_from_pdist(sun_before), SUNDAY);
        assert_eq!(weekday_from_pdist(sat_after), SATURDAY);
        assert_eq!(weekday_from_pdist(sun_after), SUNDAY);
        assert!(sat_before < 159 && sun_before <= 159);
        assert!(sat_after > 159 && sun_after > 159);
    }
}
