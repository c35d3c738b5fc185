use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::utils::sundays;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, EnumIter, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum MonthName {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl MonthName {
    /// Calendar index, 1..=12. Used for chronological ordering of the
    /// month registry (year first, then this).
    pub fn index(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_index(index: u32) -> Option<Self> {
        use MonthName::*;
        match index {
            1 => Some(January),
            2 => Some(February),
            3 => Some(March),
            4 => Some(April),
            5 => Some(May),
            6 => Some(June),
            7 => Some(July),
            8 => Some(August),
            9 => Some(September),
            10 => Some(October),
            11 => Some(November),
            12 => Some(December),
            _ => None,
        }
    }
}

/// A workspace period: one calendar month with its own member table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MonthRef {
    pub name: MonthName,
    pub year: i32,
}

impl MonthRef {
    pub fn new(name: MonthName, year: i32) -> Self {
        Self { name, year }
    }

    /// Parse the `January_2026` identifier used in URLs and the registry.
    pub fn parse(id: &str) -> Option<Self> {
        let (name, year) = id.split_once('_')?;
        let name: MonthName = name.parse().ok()?;
        let year: i32 = year.parse().ok()?;
        if !(1970..=9999).contains(&year) {
            return None;
        }
        Some(Self { name, year })
    }

    /// Canonical identifier, e.g. `January_2026`.
    pub fn id(&self) -> String {
        format!("{}_{}", self.name, self.year)
    }

    /// Backing table name, e.g. `month_january_2026`.
    pub fn table_name(&self) -> String {
        format!("month_{}_{}", self.name.to_string().to_lowercase(), self.year)
    }

    pub fn sundays(&self) -> Vec<NaiveDate> {
        sundays::sundays_in_month(self.name, self.year)
    }
}

/// Row of the `months` registry table.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct MonthRecord {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "January")]
    pub month_name: String,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 1)]
    pub month_index: u32,

    #[schema(example = "month_january_2026")]
    pub table_name: String,
}

impl MonthRecord {
    pub fn month_ref(&self) -> Option<MonthRef> {
        let name: MonthName = self.month_name.parse().ok()?;
        Some(MonthRef::new(name, self.year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_ref_id_round_trips() {
        let m = MonthRef::new(MonthName::January, 2026);
        assert_eq!(m.id(), "January_2026");
        assert_eq!(MonthRef::parse(&m.id()), Some(m));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            MonthRef::parse("february_2025"),
            Some(MonthRef::new(MonthName::February, 2025))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(MonthRef::parse("Smarch_2026"), None);
        assert_eq!(MonthRef::parse("January-2026"), None);
        assert_eq!(MonthRef::parse("January_zzz"), None);
        assert_eq!(MonthRef::parse("January_26"), None);
    }

    #[test]
    fn table_name_is_lowercase() {
        let m = MonthRef::new(MonthName::September, 2025);
        assert_eq!(m.table_name(), "month_september_2025");
    }

    #[test]
    fn index_round_trips() {
        for i in 1..=12 {
            assert_eq!(MonthName::from_index(i).unwrap().index(), i);
        }
        assert_eq!(MonthName::from_index(0), None);
        assert_eq!(MonthName::from_index(13), None);
    }
}
