use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, require_admin, AuthService};
use crate::config::{DashboardConfig, ServerConfig};
use crate::storage::Storage;

use super::analytics::{
    dashboard_stats, dashboard_top_pages, dimension_breakdown, explorer, traffic_sources,
    visitors_over_time,
};
use super::handlers::{
    change_password, health_check, list_settings, list_users, login, me, register,
    update_profile, update_setting, update_user_role, AppState,
};
use super::ApiError;

pub fn create_api_router(
    storage: Arc<dyn Storage>,
    auth_service: Arc<AuthService>,
    server: &ServerConfig,
    dashboard: DashboardConfig,
) -> Result<Router> {
    let state = Arc::new(AppState {
        storage,
        auth: Arc::clone(&auth_service),
        dashboard,
    });

    let admin_routes = Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/role", put(update_user_role))
        .route("/api/settings/{id}", put(update_setting))
        .route_layer(middleware::from_fn(require_admin));

    let protected_routes = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/api/dashboard/visitors", get(visitors_over_time))
        .route("/api/dashboard/sources", get(traffic_sources))
        .route("/api/dashboard/top-pages", get(dashboard_top_pages))
        .route("/api/analytics", get(explorer))
        .route("/api/analytics/breakdown/{dimension}", get(dimension_breakdown))
        .route("/api/account/profile", put(update_profile))
        .route("/api/account/password", put(change_password))
        .route("/api/settings", get(list_settings))
        .merge(admin_routes)
        .route_layer(middleware::from_fn(move |req: Request, next: Next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, req, next)
        }));

    let router = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .merge(protected_routes)
        .fallback(route_not_found)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(server.cors_allowed_origin.as_deref())?),
        );

    Ok(router)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found.".to_string())
}

/// Permissive CORS unless a single origin is configured
fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match allowed_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .with_context(|| format!("invalid CORS origin: {origin}"))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer.allow_origin(Any)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origin_must_be_a_header_value() {
        assert!(cors_layer(Some("https://pulseboard.io")).is_ok());
        assert!(cors_layer(Some("bad\norigin")).is_err());
        assert!(cors_layer(None).is_ok());
    }
}
