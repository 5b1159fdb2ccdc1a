//! Behavioural properties of the aggregation core, checked through the public API

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use pulseboard::analytics::compare::percent_change;
use pulseboard::analytics::window::{end_of_day, start_of_day};
use pulseboard::analytics::{
    bucket_by_day, bucket_distinct_by_day, compare_windows, resolve_window, top_pages,
    visitor_breakdown, AggregationError, DashboardStats, Dimension, PageViewRecord,
    PeriodMetrics, SessionRecord, VisitorRecord, Window, TOP_PAGES_LIMIT,
};

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn visitor(id: i64, device: &str) -> VisitorRecord {
    VisitorRecord {
        id,
        country: "DE".to_string(),
        browser: "Safari".to_string(),
        device: device.to_string(),
        os: "macOS".to_string(),
    }
}

fn session(id: i64, visitor: VisitorRecord, duration_secs: i64, page_view_count: u32) -> SessionRecord {
    let started_at = at(2024, 5, 10, 8);
    SessionRecord {
        id,
        visitor,
        started_at,
        ended_at: started_at + Duration::seconds(duration_secs),
        duration_secs,
        page_view_count,
    }
}

fn page_view(id: i64, visitor_id: i64, path: &str, created_at: DateTime<Utc>) -> PageViewRecord {
    PageViewRecord {
        id,
        session_id: id,
        visitor_id,
        path: path.to_string(),
        referrer: None,
        created_at,
    }
}

#[test]
fn test_series_is_dense_and_consecutive() {
    let window = Window::new(start_of_day(date(2024, 2, 27)), end_of_day(date(2024, 3, 2)));
    let series = bucket_by_day::<PageViewRecord>(&[], &window);

    // 2024 is a leap year
    let dates: Vec<&str> = series.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(
        dates,
        vec!["2024-02-27", "2024-02-28", "2024-02-29", "2024-03-01", "2024-03-02"]
    );
    assert!(series.iter().all(|d| d.count == 0));
}

#[test]
fn test_inverted_window_yields_empty_series() {
    let window = Window::new(start_of_day(date(2024, 3, 5)), end_of_day(date(2024, 3, 1)));
    let views = vec![page_view(1, 1, "/", at(2024, 3, 3, 12))];

    assert!(window.is_inverted());
    assert!(bucket_by_day(&views, &window).is_empty());
}

#[test]
fn test_bucket_counts_are_conserved() {
    let window = Window::new(start_of_day(date(2024, 3, 1)), end_of_day(date(2024, 3, 3)));
    let views = vec![
        page_view(1, 1, "/", at(2024, 2, 29, 23)),
        page_view(2, 1, "/", at(2024, 3, 1, 0)),
        page_view(3, 2, "/", at(2024, 3, 1, 18)),
        page_view(4, 2, "/", at(2024, 3, 3, 23)),
        page_view(5, 3, "/", at(2024, 3, 4, 0)),
    ];

    let series = bucket_by_day(&views, &window);
    let total: u64 = series.iter().map(|d| d.count).sum();
    let inside = views.iter().filter(|v| window.contains(v.created_at)).count() as u64;

    assert_eq!(total, inside);
    assert_eq!(total, 3);
    assert_eq!(series[0].count, 2);
    assert_eq!(series[1].count, 0);
    assert_eq!(series[2].count, 1);
}

#[test]
fn test_distinct_bucketing_counts_each_visitor_once_per_day() {
    let window = Window::new(start_of_day(date(2024, 5, 10)), end_of_day(date(2024, 5, 11)));
    let sessions = vec![
        session(1, visitor(1, "desktop"), 10, 1),
        session(2, visitor(1, "desktop"), 10, 1),
        session(3, visitor(2, "mobile"), 10, 1),
    ];

    let series = bucket_distinct_by_day(&sessions, &window, |s| s.visitor.id);
    assert_eq!(series[0].count, 2);
    assert_eq!(series[1].count, 0);
}

#[test]
fn test_percentages_sum_to_one_hundred() {
    let sessions: Vec<SessionRecord> = (1..=7)
        .map(|id| {
            let device = match id % 3 {
                0 => "desktop",
                1 => "mobile",
                _ => "tablet",
            };
            session(id, visitor(id, device), 30, 2)
        })
        .collect();

    let devices = visitor_breakdown(&sessions, Dimension::Device);
    let sum: f64 = devices.iter().map(|c| c.percentage).sum();

    assert_eq!(devices.len(), 3);
    assert!((sum - 100.0).abs() <= 0.1 * devices.len() as f64);
    assert!(visitor_breakdown(&[], Dimension::Device).is_empty());
}

#[test]
fn test_zero_baseline_change() {
    assert_eq!(percent_change(5.0, 0.0), 100.0);
    assert_eq!(percent_change(0.0, 0.0), 0.0);
    assert_eq!(compare_windows(5.0, 0.0).change_pct, 100.0);
    assert_eq!(compare_windows(150.0, 100.0).change_pct, 50.0);
}

#[test]
fn test_bounce_rate_change_is_absolute() {
    let current = PeriodMetrics {
        bounce_rate: 40.0,
        ..PeriodMetrics::default()
    };
    let prior = PeriodMetrics {
        bounce_rate: 30.0,
        ..PeriodMetrics::default()
    };

    let stats = DashboardStats::compare(&current, &prior);
    assert_eq!(stats.bounce_rate_change, 10.0);
}

#[test]
fn test_top_pages_truncates_to_ten() {
    let mut views = Vec::new();
    let mut id = 0;
    for page in 0..15 {
        for _ in 0..=page {
            id += 1;
            views.push(page_view(id, id, &format!("/page-{page}"), at(2024, 5, 10, 9)));
        }
    }

    let ranked = top_pages(&views, TOP_PAGES_LIMIT);
    assert_eq!(ranked.len(), 10);
    assert_eq!(ranked[0].path, "/page-14");
    assert_eq!(ranked[0].views, 15);
    assert!(ranked.windows(2).all(|w| w[0].views >= w[1].views));
}

#[test]
fn test_mixed_sessions_end_to_end() {
    let a = visitor(1, "desktop");
    let b = visitor(2, "mobile");
    let sessions = vec![
        session(1, a.clone(), 100, 1),
        session(2, a, 200, 3),
        session(3, b, 50, 1),
    ];

    let stats = DashboardStats::compare(
        &PeriodMetrics::from_rows(&sessions, 5),
        &PeriodMetrics::default(),
    );

    assert_eq!(stats.bounce_rate, 66.7);
    assert_eq!(stats.total_visitors, 2);
    assert_eq!(stats.avg_duration, 117);
    assert_eq!(stats.total_page_views, 5);
}

#[test]
fn test_resolve_window_rejects_garbage() {
    let now = at(2024, 5, 10, 12);
    let err = resolve_window(Some("yesterday"), Some("2024-05-10"), now).unwrap_err();
    assert_eq!(err, AggregationError::InvalidRange("yesterday".to_string()));

    let window = resolve_window(Some("2024-05-01"), Some("2024-05-03"), now).unwrap();
    assert_eq!(window.days().count(), 3);
}
