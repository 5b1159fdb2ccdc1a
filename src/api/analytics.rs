//! Dashboard and analytics explorer handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::{
    breakdown, bucket_distinct_by_day, resolve_window, top_pages, visitor_breakdown,
    CategoryCount, DailyCount, DashboardStats, Dimension, ExplorerReport, PeriodMetrics,
    TopPage, Window, TOP_PAGES_LIMIT,
};

use super::handlers::AppState;
use super::ApiError;

/// Length of the dashboard charts and rankings, in calendar days
const DASHBOARD_CHART_DAYS: u32 = 30;

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeQuery {
    fn window(&self) -> Result<Window, ApiError> {
        Ok(resolve_window(
            self.from.as_deref(),
            self.to.as_deref(),
            Utc::now(),
        )?)
    }
}

#[derive(Debug, Serialize)]
pub struct BreakdownResponse {
    pub dimension: Dimension,
    pub from: chrono::DateTime<Utc>,
    pub to: chrono::DateTime<Utc>,
    pub breakdown: Vec<CategoryCount>,
}

/// Headline numbers for the current period against the one before it
pub async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, ApiError> {
    let current = Window::ending_at(Utc::now(), state.dashboard.comparison_window_days);
    let prior = current.preceding();
    let storage = &state.storage;

    let (current_sessions, prior_sessions, current_views, prior_views) = tokio::try_join!(
        storage.sessions_between(&current),
        storage.sessions_between(&prior),
        storage.count_page_views_between(&current),
        storage.count_page_views_between(&prior),
    )?;

    let stats = DashboardStats::compare(
        &PeriodMetrics::from_rows(&current_sessions, current_views),
        &PeriodMetrics::from_rows(&prior_sessions, prior_views),
    );
    Ok(Json(stats))
}

/// Unique visitors per day over the last 30 calendar days
pub async fn visitors_over_time(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DailyCount>>, ApiError> {
    let window = Window::trailing_days(Utc::now(), DASHBOARD_CHART_DAYS);
    let sessions = state.storage.sessions_between(&window).await?;

    Ok(Json(bucket_distinct_by_day(&sessions, &window, |s| {
        s.visitor.id
    })))
}

pub async fn traffic_sources(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let window = Window::trailing_days(Utc::now(), DASHBOARD_CHART_DAYS);
    let page_views = state.storage.page_views_between(&window).await?;

    Ok(Json(breakdown(&page_views, Dimension::Source)))
}

pub async fn dashboard_top_pages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TopPage>>, ApiError> {
    let window = Window::trailing_days(Utc::now(), DASHBOARD_CHART_DAYS);
    let page_views = state.storage.page_views_between(&window).await?;

    Ok(Json(top_pages(&page_views, TOP_PAGES_LIMIT)))
}

/// Full explorer report for `?from=&to=`
pub async fn explorer(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<ExplorerReport>, ApiError> {
    let window = params.window()?;
    let (sessions, page_views) = tokio::try_join!(
        state.storage.sessions_between(&window),
        state.storage.page_views_between(&window),
    )?;

    Ok(Json(ExplorerReport::build(&window, &sessions, &page_views)))
}

/// A single breakdown over the requested window
pub async fn dimension_breakdown(
    State(state): State<Arc<AppState>>,
    Path(dimension): Path<String>,
    Query(params): Query<RangeQuery>,
) -> Result<Json<BreakdownResponse>, ApiError> {
    let dimension = dimension.parse::<Dimension>().map_err(ApiError::BadRequest)?;
    let window = params.window()?;

    let breakdown = if dimension.is_visitor_attribute() {
        let sessions = state.storage.sessions_between(&window).await?;
        visitor_breakdown(&sessions, dimension)
    } else {
        let page_views = state.storage.page_views_between(&window).await?;
        breakdown(&page_views, dimension)
    };

    Ok(Json(BreakdownResponse {
        dimension,
        from: window.from,
        to: window.to,
        breakdown,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_query_rejects_malformed_dates() {
        let query = RangeQuery {
            from: Some("2024-13-01".to_string()),
            to: Some("2024-02-01".to_string()),
        };
        assert!(matches!(query.window(), Err(ApiError::InvalidRange(_))));
    }

    #[test]
    fn empty_range_query_uses_default_window() {
        let window = RangeQuery::default().window().unwrap();
        assert!(window.from < window.to);
    }
}
