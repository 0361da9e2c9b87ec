//! Calendar months: the unit the cohort fold advances by.
//!
//! A `Month` is displayed and persisted by its last day (month-end
//! anchored), so `2024-02` renders as `2024-02-29`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Month {
    year:  i32,
    month: u32,
}

impl Month {
    /// Returns `None` unless `month` is in 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The month a calendar day falls in.
    pub fn containing(day: NaiveDate) -> Self {
        Self { year: day.year(), month: day.month() }
    }

    pub fn year(&self) -> i32  { self.year }
    pub fn month(&self) -> u32 { self.month }

    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn pred(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn end_date(&self) -> NaiveDate {
        // Months only come from valid dates, so the fallback never fires
        // inside chrono's supported range.
        let next = self.succ();
        NaiveDate::from_ymd_opt(next.year, next.month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day.year() == self.year && day.month() == self.month
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.end_date().format("%Y-%m-%d"))
    }
}

impl FromStr for Month {
    type Err = chrono::ParseError;

    /// Accepts any day of the month, `YYYY-MM-DD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map(Month::containing)
    }
}

impl From<Month> for String {
    fn from(m: Month) -> Self {
        m.to_string()
    }
}

impl TryFrom<String> for Month {
    type Error = chrono::ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_is_anchored_at_its_last_day() {
        assert_eq!(Month::containing(day(2024, 2, 3)).to_string(), "2024-02-29");
        assert_eq!(Month::containing(day(2023, 2, 3)).to_string(), "2023-02-28");
        assert_eq!(Month::containing(day(2024, 12, 1)).to_string(), "2024-12-31");
    }

    #[test]
    fn succ_and_pred_wrap_years() {
        let dec = Month::new(2023, 12).unwrap();
        assert_eq!(dec.succ(), Month::new(2024, 1).unwrap());
        assert_eq!(dec.succ().pred(), dec);
        assert!(Month::new(2023, 13).is_none());
    }

    #[test]
    fn parses_any_day_of_the_month() {
        let m: Month = "2024-04-30".parse().unwrap();
        assert_eq!(m, "2024-04-01".parse().unwrap());
        assert!(m.contains(day(2024, 4, 15)));
        assert!(!m.contains(day(2024, 5, 1)));
    }

    #[test]
    fn serializes_as_month_end_string() {
        let m = Month::new(2024, 1).unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"2024-01-31\"");
        let back: Month = serde_json::from_str("\"2024-01-31\"").unwrap();
        assert_eq!(back, m);
    }
}
