//! Data models for analytics
//!
//! Input records are the explicit shape the aggregation functions consume.
//! They are built by the storage layer from joined rows and never mutated
//! here. Output records serialize with the field names the dashboard expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Visitor identity and the attributes used for breakdowns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorRecord {
    /// Store identifier
    pub id: i64,

    /// Country code (e.g., "US", "DE")
    pub country: String,

    /// Browser family (e.g., "Chrome")
    pub browser: String,

    /// Device class: "desktop", "mobile" or "tablet"
    pub device: String,

    /// Operating system
    pub os: String,
}

/// A session together with its visitor and how many pages it viewed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: i64,

    /// The visitor who owns the session
    pub visitor: VisitorRecord,

    pub started_at: DateTime<Utc>,

    pub ended_at: DateTime<Utc>,

    /// Session length in seconds
    pub duration_secs: i64,

    /// Number of page views recorded for the session
    pub page_view_count: u32,
}

impl SessionRecord {
    /// A bounce is a session with exactly one page view
    pub fn is_bounce(&self) -> bool {
        self.page_view_count == 1
    }
}

/// A single page view, carrying the visitor of its owning session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewRecord {
    pub id: i64,

    pub session_id: i64,

    /// Visitor of the owning session (used for distinct-visitor counts)
    pub visitor_id: i64,

    /// Request path (e.g., "/pricing")
    pub path: String,

    /// Referrer; `None` means direct traffic
    pub referrer: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// Records that can be placed on a timeline
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for SessionRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Timestamped for PageViewRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for DateTime<Utc> {
    fn timestamp(&self) -> DateTime<Utc> {
        *self
    }
}

/// One day of a dense time series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    /// Calendar day in UTC, formatted `YYYY-MM-DD`
    pub date: String,
    pub count: u64,
}

/// One category of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub key: String,
    pub count: u64,

    /// Share of the total, rounded to one decimal
    pub percentage: f64,
}

/// Page ranking entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPage {
    pub path: String,
    pub views: u64,
    pub unique_visitors: u64,
}
