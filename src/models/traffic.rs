//! Write-side shapes for traffic rows, used by seeding

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct NewVisitor {
    pub country: String,
    pub browser: String,
    pub device: String,
    pub os: String,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub visitor_id: i64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl NewSession {
    /// Whole seconds between start and end, never negative
    pub fn duration_secs(&self) -> i64 {
        (self.ended_at - self.started_at).num_seconds().max(0)
    }
}

#[derive(Debug, Clone)]
pub struct NewPageView {
    pub session_id: i64,
    pub path: String,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}
