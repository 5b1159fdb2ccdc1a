//! JSON API: authentication, dashboard, analytics explorer and settings

pub mod analytics;
mod error;
pub mod handlers;
mod routes;

pub use error::{ApiError, ErrorResponse};
pub use handlers::AppState;
pub use routes::create_api_router;
