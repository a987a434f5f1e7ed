//! Date range presets for report filtering
//!
//! All boundaries are computed in the business timezone and compared
//! against `createdAt` (Unix millis). Both ends are inclusive.

use crate::models::{Order, Refund};
use chrono::{Days, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Anything filterable by creation time
pub trait Timestamped {
    fn created_at(&self) -> i64;
}

impl Timestamped for Order {
    fn created_at(&self) -> i64 {
        self.created_at
    }
}

impl Timestamped for Refund {
    fn created_at(&self) -> i64 {
        self.created_at
    }
}

/// Named report range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePreset {
    /// Local midnight to now
    Today,
    /// Rolling 7 days back from local midnight
    Week,
    /// Rolling 14 days back from local midnight
    Biweek,
    /// Rolling 30 days back from local midnight
    Month,
    #[default]
    All,
}

impl RangePreset {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" | "day" => Some(Self::Today),
            "week" => Some(Self::Week),
            "biweek" => Some(Self::Biweek),
            "month" => Some(Self::Month),
            "all" | "" => Some(Self::All),
            _ => None,
        }
    }

    fn days_back(&self) -> Option<u64> {
        match self {
            Self::Today => Some(0),
            Self::Week => Some(7),
            Self::Biweek => Some(14),
            Self::Month => Some(30),
            Self::All => None,
        }
    }
}

/// Inclusive `[start, end]` window in Unix millis; `None` means open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

/// Millis of 00:00 local time on `date`
pub fn local_midnight(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// Calendar date of a timestamp in `tz`
pub fn local_date(ts: i64, tz: Tz) -> NaiveDate {
    chrono::DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.with_timezone(&tz).date_naive())
        .unwrap_or_default()
}

impl DateRange {
    pub const ALL: DateRange = DateRange {
        start: None,
        end: None,
    };

    pub fn preset(preset: RangePreset, now: i64, tz: Tz) -> Self {
        let Some(days) = preset.days_back() else {
            return Self::ALL;
        };
        let today = local_date(now, tz);
        let from = today.checked_sub_days(Days::new(days)).unwrap_or(today);
        Self {
            start: Some(local_midnight(from, tz)),
            end: (preset == RangePreset::Today).then_some(now),
        }
    }

    /// One calendar day: 00:00:00.000 to 23:59:59.999 local
    pub fn day(date: NaiveDate, tz: Tz) -> Self {
        let start = local_midnight(date, tz);
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| local_midnight(next, tz) - 1)
            .unwrap_or(i64::MAX);
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts <= e)
    }

    pub fn filter<T: Timestamped + Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .filter(|i| self.contains(i.created_at()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;

    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        Kolkata
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn day_range_covers_whole_local_day() {
        let range = DateRange::day(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), Kolkata);
        assert!(range.contains(ist(2025, 3, 10, 0, 0)));
        assert!(range.contains(ist(2025, 3, 10, 23, 59)));
        assert!(!range.contains(ist(2025, 3, 9, 23, 59)));
        assert!(!range.contains(ist(2025, 3, 11, 0, 0)));
        assert_eq!(range.end.unwrap() - range.start.unwrap(), 86_400_000 - 1);
    }

    #[test]
    fn today_runs_from_local_midnight_to_now() {
        let now = ist(2025, 3, 10, 15, 30);
        let range = DateRange::preset(RangePreset::Today, now, Kolkata);
        assert_eq!(range.start, Some(ist(2025, 3, 10, 0, 0)));
        assert_eq!(range.end, Some(now));
    }

    #[test]
    fn week_is_rolling_seven_days_from_midnight() {
        let now = ist(2025, 3, 10, 15, 30);
        let range = DateRange::preset(RangePreset::Week, now, Kolkata);
        assert_eq!(range.start, Some(ist(2025, 3, 3, 0, 0)));
        assert!(range.contains(ist(2025, 3, 3, 0, 1)));
        assert!(!range.contains(ist(2025, 3, 2, 23, 59)));

        let month = DateRange::preset(RangePreset::Month, now, Kolkata);
        assert_eq!(month.start, Some(ist(2025, 2, 8, 0, 0)));
    }

    #[test]
    fn all_is_open() {
        let range = DateRange::preset(RangePreset::All, 0, Kolkata);
        assert_eq!(range, DateRange::ALL);
        assert!(range.contains(i64::MIN));
    }

    #[test]
    fn preset_parse() {
        assert_eq!(RangePreset::parse("Week"), Some(RangePreset::Week));
        assert_eq!(RangePreset::parse("day"), Some(RangePreset::Today));
        assert_eq!(RangePreset::parse(""), Some(RangePreset::All));
        assert_eq!(RangePreset::parse("year"), None);
    }
}
