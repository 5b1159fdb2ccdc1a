//! Dashboard and explorer payloads assembled from already fetched rows

use serde::Serialize;

use crate::analytics::breakdown::{breakdown, unique_visitors, Dimension};
use crate::analytics::compare::{
    compare_windows, point_change, round_half_up, round_one_decimal, PeriodMetrics,
};
use crate::analytics::models::{CategoryCount, DailyCount, PageViewRecord, SessionRecord};
use crate::analytics::series::bucket_by_day;
use crate::analytics::window::Window;

/// Headline numbers of the dashboard, current period against the prior one
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_visitors: u64,
    pub total_page_views: u64,
    /// Percent, one decimal
    pub bounce_rate: f64,
    /// Whole seconds
    pub avg_duration: u64,
    pub visitors_change: f64,
    pub page_views_change: f64,
    /// Percentage points, not a relative change
    pub bounce_rate_change: f64,
    pub duration_change: f64,
}

impl DashboardStats {
    pub fn compare(current: &PeriodMetrics, prior: &PeriodMetrics) -> Self {
        let visitors = compare_windows(current.unique_visitors as f64, prior.unique_visitors as f64);
        let page_views = compare_windows(current.page_views as f64, prior.page_views as f64);
        let duration = compare_windows(current.avg_duration_secs, prior.avg_duration_secs);

        Self {
            total_visitors: current.unique_visitors,
            total_page_views: current.page_views,
            bounce_rate: round_one_decimal(current.bounce_rate),
            avg_duration: round_half_up(current.avg_duration_secs).max(0.0) as u64,
            visitors_change: visitors.change_pct,
            page_views_change: page_views.change_pct,
            bounce_rate_change: point_change(current.bounce_rate, prior.bounce_rate),
            duration_change: duration.change_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerSummary {
    pub total_page_views: u64,
    pub total_sessions: u64,
    pub unique_visitors: u64,
}

/// Analytics explorer payload for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerReport {
    pub page_views_over_time: Vec<DailyCount>,
    pub devices: Vec<CategoryCount>,
    pub browsers: Vec<CategoryCount>,
    pub countries: Vec<CategoryCount>,
    pub operating_systems: Vec<CategoryCount>,
    pub summary: ExplorerSummary,
}

impl ExplorerReport {
    /// Build the report from the sessions started and page views created in `window`
    pub fn build(window: &Window, sessions: &[SessionRecord], page_views: &[PageViewRecord]) -> Self {
        let visitors = unique_visitors(sessions);

        Self {
            page_views_over_time: bucket_by_day(page_views, window),
            devices: breakdown(&visitors, Dimension::Device),
            browsers: breakdown(&visitors, Dimension::Browser),
            countries: breakdown(&visitors, Dimension::Country),
            operating_systems: breakdown(&visitors, Dimension::Os),
            summary: ExplorerSummary {
                total_page_views: page_views.len() as u64,
                total_sessions: sessions.len() as u64,
                unique_visitors: visitors.len() as u64,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::models::VisitorRecord;
    use chrono::{Duration, TimeZone, Utc};

    fn visitor(id: i64) -> VisitorRecord {
        VisitorRecord {
            id,
            country: "US".to_string(),
            browser: "Firefox".to_string(),
            device: "desktop".to_string(),
            os: "Linux".to_string(),
        }
    }

    fn session(id: i64, visitor_id: i64, duration_secs: i64, page_view_count: u32) -> SessionRecord {
        let started_at = Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap();
        SessionRecord {
            id,
            visitor: visitor(visitor_id),
            started_at,
            ended_at: started_at + Duration::seconds(duration_secs),
            duration_secs,
            page_view_count,
        }
    }

    #[test]
    fn dashboard_stats_for_mixed_sessions() {
        let sessions = vec![session(1, 1, 100, 1), session(2, 1, 200, 3), session(3, 2, 50, 1)];
        let current = PeriodMetrics::from_rows(&sessions, 5);
        let stats = DashboardStats::compare(&current, &PeriodMetrics::default());

        assert_eq!(stats.bounce_rate, 66.7);
        assert_eq!(stats.total_visitors, 2);
        assert_eq!(stats.avg_duration, 117);
        assert_eq!(stats.visitors_change, 100.0);
        assert_eq!(stats.bounce_rate_change, 66.7);
    }

    #[test]
    fn bounce_rate_change_is_in_points() {
        let current = PeriodMetrics {
            bounce_rate: 40.0,
            ..PeriodMetrics::default()
        };
        let prior = PeriodMetrics {
            bounce_rate: 30.0,
            ..PeriodMetrics::default()
        };

        assert_eq!(DashboardStats::compare(&current, &prior).bounce_rate_change, 10.0);
    }

    #[test]
    fn explorer_report_serializes_camel_case() {
        let window = Window::trailing_days(Utc.with_ymd_and_hms(2024, 4, 3, 0, 0, 0).unwrap(), 3);
        let report = ExplorerReport::build(&window, &[session(1, 1, 10, 1)], &[]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["pageViewsOverTime"].as_array().unwrap().len(), 3);
        assert_eq!(json["summary"]["uniqueVisitors"], 1);
        assert_eq!(json["devices"][0]["key"], "desktop");
        assert_eq!(json["devices"][0]["percentage"], 100.0);
    }
}
