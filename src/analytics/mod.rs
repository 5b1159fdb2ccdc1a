//! Analytics aggregation
//!
//! Pure functions that turn visitor, session and page view rows into the
//! series, breakdowns and period comparisons shown on the dashboard. Nothing
//! in here performs I/O or keeps state: callers fetch rows for a window and
//! hand them over.

pub mod breakdown;
pub mod compare;
pub mod models;
pub mod report;
pub mod series;
pub mod window;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("invalid date range: '{0}' is not a date")]
    InvalidRange(String),

    #[error("date range spans {days} days, at most {max} are allowed")]
    RangeTooLong { days: i64, max: i64 },
}

pub use breakdown::{
    aggregate_by_category, breakdown, top_pages, unique_visitors, visitor_breakdown, Categorized,
    Dimension, TOP_PAGES_LIMIT,
};
pub use compare::{compare_windows, Comparison, PeriodMetrics};
pub use models::{
    CategoryCount, DailyCount, PageViewRecord, SessionRecord, Timestamped, TopPage, VisitorRecord,
};
pub use report::{DashboardStats, ExplorerReport, ExplorerSummary};
pub use series::{bucket_by_day, bucket_distinct_by_day};
pub use window::{resolve_window, Window, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
