//! Civil-date math over Unix timestamps.
//!
//! The daily quota rolls over on UTC calendar-date change, not on a rolling
//! 24h window; billing periods advance by one calendar month with day-of-
//! month clamping. Conversions use the standard days-from-civil algorithm
//! so no date-time dependency is needed.

/// Seconds in a day.
const SECS_PER_DAY: i64 = 86_400;

/// Current Unix time in seconds.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// UTC day number (days since the Unix epoch) for a timestamp.
pub fn day_number(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(SECS_PER_DAY)
}

/// Whether two timestamps fall on the same UTC calendar date.
pub fn same_utc_day(a: i64, b: i64) -> bool {
    day_number(a) == day_number(b)
}

/// Convert a Unix timestamp to a `(year, month, day)` UTC civil date.
pub fn civil_from_unix(unix_secs: i64) -> (i32, u32, u32) {
    let z = day_number(unix_secs) + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = (if m <= 2 { y + 1 } else { y }) as i32;
    (y, m, d)
}

/// Convert a UTC civil date to the Unix timestamp at 00:00:00 that day.
pub fn unix_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let y = i64::from(year) - i64::from(month <= 2);
    let era = y.div_euclid(400);
    let yoe = y.rem_euclid(400);
    let mp = i64::from(if month > 2 { month - 3 } else { month + 9 });
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe - 719_468) * SECS_PER_DAY
}

/// Number of days in a month.
fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 {
                29
            } else {
                28
            }
        }
        _ => unreachable!("month out of range"),
    }
}

/// Advance a timestamp by whole calendar months, clamping the day of month.
///
/// `Jan 31 + 1 month` lands on `Feb 28` (or 29), matching how billing
/// periods are computed. The time of day is preserved.
pub fn add_months(unix_secs: i64, months: u32) -> i64 {
    let (y, m, d) = civil_from_unix(unix_secs);
    let tod = unix_secs.rem_euclid(SECS_PER_DAY);

    let total = (y as i64) * 12 + i64::from(m) - 1 + i64::from(months);
    let ny = (total.div_euclid(12)) as i32;
    let nm = (total.rem_euclid(12)) as u32 + 1;
    let nd = d.min(days_in_month(ny, nm));

    unix_from_civil(ny, nm, nd) + tod
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-15 12:34:56 UTC
    const MID_MARCH: i64 = 1_710_506_096;

    #[test]
    fn civil_round_trip() {
        let (y, m, d) = civil_from_unix(MID_MARCH);
        assert_eq!((y, m, d), (2024, 3, 15));
        assert_eq!(unix_from_civil(y, m, d), MID_MARCH - MID_MARCH.rem_euclid(86_400));
    }

    #[test]
    fn epoch_is_january_first_1970() {
        assert_eq!(civil_from_unix(0), (1970, 1, 1));
        assert_eq!(unix_from_civil(1970, 1, 1), 0);
    }

    #[test]
    fn same_day_within_date_boundaries() {
        let midnight = unix_from_civil(2024, 3, 15);
        assert!(same_utc_day(midnight, midnight + 86_399));
        assert!(!same_utc_day(midnight, midnight + 86_400));
        assert!(!same_utc_day(midnight, midnight - 1));
    }

    #[test]
    fn add_month_simple() {
        let jan_10 = unix_from_civil(2024, 1, 10);
        assert_eq!(civil_from_unix(add_months(jan_10, 1)), (2024, 2, 10));
    }

    #[test]
    fn add_month_clamps_to_short_month() {
        let jan_31 = unix_from_civil(2024, 1, 31);
        // 2024 is a leap year
        assert_eq!(civil_from_unix(add_months(jan_31, 1)), (2024, 2, 29));

        let jan_31_2023 = unix_from_civil(2023, 1, 31);
        assert_eq!(civil_from_unix(add_months(jan_31_2023, 1)), (2023, 2, 28));
    }

    #[test]
    fn add_month_rolls_year() {
        let dec_15 = unix_from_civil(2023, 12, 15);
        assert_eq!(civil_from_unix(add_months(dec_15, 1)), (2024, 1, 15));
    }

    #[test]
    fn add_month_preserves_time_of_day() {
        let ts = unix_from_civil(2024, 5, 2) + 3_661; // 01:01:01
        let next = add_months(ts, 1);
        assert_eq!(next.rem_euclid(86_400), 3_661);
        assert_eq!(civil_from_unix(next), (2024, 6, 2));
    }

    #[test]
    fn pre_epoch_dates() {
        let ts = unix_from_civil(1969, 12, 31);
        assert!(ts < 0);
        assert_eq!(civil_from_unix(ts), (1969, 12, 31));
    }
}
