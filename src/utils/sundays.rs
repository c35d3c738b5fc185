use chrono::{Datelike, Duration, NaiveDate};

use crate::model::month::MonthName;

/// All Sundays of a month, ascending. Walks to the first Sunday on/after
/// the 1st, then steps 7 days while still inside the month. Pure; an
/// impossible calendar input yields an empty vec, never an error.
pub fn sundays_in_month(month: MonthName, year: i32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month.index(), 1) else {
        return Vec::new();
    };

    let offset = (7 - first.weekday().num_days_from_sunday()) % 7;
    let mut day = first + Duration::days(offset as i64);

    let mut sundays = Vec::with_capacity(5);
    while day.month() == month.index() {
        sundays.push(day);
        day += Duration::days(7);
    }
    sundays
}

/// String-boundary variant for callers holding a raw month name. An
/// unrecognized name is "no dates available", not a failure.
pub fn sundays_for(month_name: &str, year: i32) -> Vec<NaiveDate> {
    month_name
        .parse::<MonthName>()
        .map(|m| sundays_in_month(m, year))
        .unwrap_or_default()
}

/// Column name storing attendance for one calendar date: `d_YYYY_MM_DD`.
/// Full year+month+day is encoded so the id is unique across months and
/// years and decodes back to exactly one date.
pub fn attendance_field_id(date: NaiveDate) -> String {
    format!("d_{:04}_{:02}_{:02}", date.year(), date.month(), date.day())
}

/// Inverse of [`attendance_field_id`]. Returns None for anything that is
/// not a well-formed attendance column name.
pub fn parse_field_id(field: &str) -> Option<NaiveDate> {
    let rest = field.strip_prefix("d_")?;
    let mut parts = rest.splitn(3, '_');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whether an existing column stores attendance for `date`. Decides between
/// "update existing field" and "provision a new field".
pub fn is_field_for_date(field: &str, date: NaiveDate) -> bool {
    parse_field_id(field) == Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use strum::IntoEnumIterator;

    #[test]
    fn all_sundays_in_range_and_ascending() {
        for year in [2024, 2025, 2026] {
            for month in MonthName::iter() {
                let sundays = sundays_in_month(month, year);
                assert!(
                    sundays.len() == 4 || sundays.len() == 5,
                    "{month} {year}: {} sundays",
                    sundays.len()
                );
                for pair in sundays.windows(2) {
                    assert!(pair[0] < pair[1]);
                    assert_eq!(pair[1] - pair[0], Duration::days(7));
                }
                for day in &sundays {
                    assert_eq!(day.weekday(), Weekday::Sun);
                    assert_eq!(day.month(), month.index());
                    assert_eq!(day.year(), year);
                }
            }
        }
    }

    #[test]
    fn known_months() {
        // January 2026 starts on a Thursday
        assert_eq!(
            sundays_in_month(MonthName::January, 2026),
            [4, 11, 18, 25]
                .map(|d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap())
                .to_vec()
        );
        // February 2026 starts on a Sunday, non-leap year
        assert_eq!(
            sundays_in_month(MonthName::February, 2026),
            [1, 8, 15, 22]
                .map(|d| NaiveDate::from_ymd_opt(2026, 2, d).unwrap())
                .to_vec()
        );
        // May 2026 has five Sundays
        assert_eq!(sundays_in_month(MonthName::May, 2026).len(), 5);
    }

    #[test]
    fn unknown_month_name_is_empty() {
        assert!(sundays_for("Smarch", 2026).is_empty());
        assert!(sundays_for("", 2026).is_empty());
        assert_eq!(sundays_for("january", 2026).len(), 4);
    }

    #[test]
    fn field_id_round_trips() {
        for date in [
            NaiveDate::from_ymd_opt(2026, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 7).unwrap(),
            NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(),
        ] {
            let field = attendance_field_id(date);
            assert_eq!(parse_field_id(&field), Some(date));
            assert!(is_field_for_date(&field, date));
        }
    }

    #[test]
    fn field_ids_encode_full_date() {
        // Same day-of-month in different months must never collide.
        let jan = attendance_field_id(NaiveDate::from_ymd_opt(2026, 1, 7).unwrap());
        let feb = attendance_field_id(NaiveDate::from_ymd_opt(2026, 2, 7).unwrap());
        let prev_year = attendance_field_id(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap());
        assert_ne!(jan, feb);
        assert_ne!(jan, prev_year);
    }

    #[test]
    fn parse_field_id_rejects_non_attendance_columns() {
        assert_eq!(parse_field_id("name"), None);
        assert_eq!(parse_field_id("d_2026_13_01"), None);
        assert_eq!(parse_field_id("d_2026_02_30"), None);
        assert_eq!(parse_field_id("d_2026_01"), None);
        assert_eq!(parse_field_id("joined_on"), None);
    }
}
