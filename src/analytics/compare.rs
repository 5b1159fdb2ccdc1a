//! Period-over-period comparison

use serde::Serialize;

use crate::analytics::breakdown::unique_visitors;
use crate::analytics::models::SessionRecord;

/// Round half up to a whole number (`-2.5` becomes `-2`)
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub fn round_one_decimal(value: f64) -> f64 {
    round_half_up(value * 10.0) / 10.0
}

/// A metric's current value and its relative change against the prior period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub current: f64,
    pub change_pct: f64,
}

/// Relative change in percent, unrounded.
///
/// A zero baseline yields 100 when the current value grew and 0 otherwise.
pub fn percent_change(current: f64, prior: f64) -> f64 {
    if prior == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - prior) / prior * 100.0
    }
}

pub fn compare_windows(current: f64, prior: f64) -> Comparison {
    Comparison {
        current,
        change_pct: round_one_decimal(percent_change(current, prior)),
    }
}

/// Absolute difference, used for metrics that already are percentages
pub fn point_change(current: f64, prior: f64) -> f64 {
    round_one_decimal(current - prior)
}

/// Share of sessions with exactly one page view, in percent (unrounded)
pub fn bounce_rate(sessions: &[SessionRecord]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let bounces = sessions.iter().filter(|s| s.is_bounce()).count();
    bounces as f64 / sessions.len() as f64 * 100.0
}

/// Mean session duration in seconds (unrounded)
pub fn average_duration(sessions: &[SessionRecord]) -> f64 {
    if sessions.is_empty() {
        return 0.0;
    }
    let total: i64 = sessions.iter().map(|s| s.duration_secs).sum();
    total as f64 / sessions.len() as f64
}

/// Raw metrics of one comparison period
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeriodMetrics {
    pub unique_visitors: u64,
    pub page_views: u64,
    pub sessions: u64,
    pub bounce_rate: f64,
    pub avg_duration_secs: f64,
}

impl PeriodMetrics {
    /// Metrics for the sessions that started in a period and the number of
    /// page views created in it
    pub fn from_rows(sessions: &[SessionRecord], page_views: u64) -> Self {
        Self {
            unique_visitors: unique_visitors(sessions).len() as u64,
            page_views,
            sessions: sessions.len() as u64,
            bounce_rate: bounce_rate(sessions),
            avg_duration_secs: average_duration(sessions),
        }
    }
}
