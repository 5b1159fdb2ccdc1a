//! Date windows for analytics queries

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use crate::analytics::AggregationError;

/// Length of the default window and of each dashboard comparison period
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Longest explicit range, in calendar days, a caller may request
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Inclusive time range `[from, to]`
///
/// An inverted window (`to < from`) is valid and simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Window {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// The `days` most recent periods of 24h ending at `now`
    pub fn ending_at(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            from: now - Duration::days(days),
            to: now,
        }
    }

    /// The last `days` calendar days, today included, covering whole days
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        let today = now.date_naive();
        let first = today - Duration::days(i64::from(days.max(1)) - 1);
        Self {
            from: start_of_day(first),
            to: end_of_day(today),
        }
    }

    /// The adjacent window of the same length that ends just before this one starts
    pub fn preceding(&self) -> Self {
        let length = self.to - self.from;
        Self {
            from: self.from - length,
            to: self.from - Duration::milliseconds(1),
        }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }

    pub fn is_inverted(&self) -> bool {
        self.to < self.from
    }

    /// Every calendar day touched by the window, ascending
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.to.date_naive();
        let inverted = self.is_inverted();
        self.from
            .date_naive()
            .iter_days()
            .take_while(move |day| !inverted && *day <= last)
    }
}

/// Resolve user supplied bounds into a concrete window.
///
/// Bounds are calendar dates (`YYYY-MM-DD`) or RFC 3339 timestamps. Any bound
/// that is present must parse. When either bound is missing the window falls
/// back to the trailing [`DEFAULT_WINDOW_DAYS`] ending at `now`. The upper
/// bound always extends to the last millisecond of its UTC day. Ranges longer
/// than [`MAX_WINDOW_DAYS`] are rejected; inverted ranges are not.
pub fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Window, AggregationError> {
    let from = non_empty(from).map(parse_bound).transpose()?;
    let to = non_empty(to).map(parse_bound).transpose()?;

    let (from, to) = match (from, to) {
        (Some(from), Some(to)) => (from, to),
        _ => (now - Duration::days(DEFAULT_WINDOW_DAYS), now),
    };

    let days = to.date_naive().signed_duration_since(from.date_naive()).num_days() + 1;
    if days > MAX_WINDOW_DAYS {
        return Err(AggregationError::RangeTooLong {
            days,
            max: MAX_WINDOW_DAYS,
        });
    }

    Ok(Window {
        from,
        to: end_of_day(to.date_naive()),
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_bound(raw: &str) -> Result<DateTime<Utc>, AggregationError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AggregationError::InvalidRange(raw.to_string()))
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Last millisecond of `date`; defined for every representable date
pub fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
        .and_utc()
}

/// Calendar-day grouping key, `YYYY-MM-DD` in UTC
pub fn date_key(timestamp: DateTime<Utc>) -> String {
    timestamp.date_naive().format("%Y-%m-%d").to_string()
}
