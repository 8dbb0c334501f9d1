//! Resolve named time filters ("today", "weekend", ...) into concrete
//! date ranges.
//!
//! Every computation happens in one canonical timezone passed in by the
//! caller (normally `AppConfig::timezone`) so the server, the CLI, and the
//! map client agree on where a day starts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeFilter {
    #[default]
    Today,
    Weekend,
    ThisWeek,
    ThisMonth,
    Anytime,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::Today => "today",
            TimeFilter::Weekend => "weekend",
            TimeFilter::ThisWeek => "this-week",
            TimeFilter::ThisMonth => "this-month",
            TimeFilter::Anytime => "anytime",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown time filter: {0}")]
pub struct UnknownTimeFilter(String);

impl FromStr for TimeFilter {
    type Err = UnknownTimeFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(TimeFilter::Today),
            "weekend" => Ok(TimeFilter::Weekend),
            "this-week" => Ok(TimeFilter::ThisWeek),
            "this-month" => Ok(TimeFilter::ThisMonth),
            "anytime" => Ok(TimeFilter::Anytime),
            other => Err(UnknownTimeFilter(other.to_string())),
        }
    }
}

/// Inclusive range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

/// Far-future end used by open-ended filters.
fn sentinel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 31).expect("valid sentinel date")
}

pub fn resolve(filter: TimeFilter, now: DateTime<Utc>, tz: Tz) -> TimeWindow {
    let now = now.with_timezone(&tz);
    let today = now.date_naive();
    // 0 = Sunday .. 6 = Saturday
    let weekday = today.weekday().num_days_from_sunday() as i64;

    let (start, end) = match filter {
        TimeFilter::Today => (start_of_day(tz, today), end_of_day(tz, today)),
        TimeFilter::Weekend => {
            let saturday = match weekday {
                6 => today,
                0 => today - Duration::days(1),
                _ => today + Duration::days(6 - weekday),
            };
            let sunday = saturday + Duration::days(1);
            (start_of_day(tz, saturday), end_of_day(tz, sunday))
        }
        TimeFilter::ThisWeek => {
            let saturday = today + Duration::days(6 - weekday);
            (now, end_of_day(tz, saturday))
        }
        TimeFilter::ThisMonth => (now, end_of_day(tz, last_day_of_month(today))),
        TimeFilter::Anytime => (now, end_of_day(tz, sentinel_date())),
    };

    // Only reachable inside the last millisecond of a day
    let end = end.max(start);
    TimeWindow { start, end }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeCategory {
    Today,
    Weekend,
    Future,
}

/// Bucket an event start for marker coloring.
pub fn classify(starts_at: DateTime<Utc>, now: DateTime<Utc>, tz: Tz) -> TimeCategory {
    let day = starts_at.with_timezone(&tz).date_naive();
    let today = now.with_timezone(&tz).date_naive();
    if day == today {
        return TimeCategory::Today;
    }
    let weekend = resolve(TimeFilter::Weekend, now, tz);
    if day >= weekend.start.date_naive() && day <= weekend.end.date_naive() {
        return TimeCategory::Weekend;
    }
    TimeCategory::Future
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .expect("month has a last day")
}

fn start_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    localize(tz, date.and_time(chrono::NaiveTime::MIN))
}

fn end_of_day(tz: Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("valid end of day");
    localize(tz, naive)
}

/// Map a wall clock time to an instant. Ambiguous times take the earlier
/// instant, times inside a DST gap move forward to the first valid one.
fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = naive;
    for _ in 0..16 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => candidate += Duration::minutes(15),
        }
    }
    tz.from_utc_datetime(&naive)
}

/// Parse a timestamp typed into a form. RFC 3339 input keeps its offset,
/// bare `YYYY-MM-DDTHH:MM[:SS]` is read as wall clock time in `tz`.
pub fn parse_local_datetime(input: &str, tz: Tz) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| localize(tz, naive).with_timezone(&Utc))
}
