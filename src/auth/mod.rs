pub mod jwt;
pub mod password;

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::api::ApiError;
use crate::config::AuthConfig;
use crate::models::{Role, User};

/// Identity of the caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a session token for `user`
    pub fn issue_token(&self, user: &User) -> Result<String> {
        jwt::encode_jwt(
            &self.config.jwt_secret,
            self.config.token_ttl_days,
            user.id,
            &user.email,
            user.role,
        )
    }

    /// Validate a bearer token and return the identity it carries
    pub fn validate(&self, token: &str) -> Result<AuthUser> {
        let claims = jwt::decode_jwt(token, &self.config.jwt_secret)?;
        let id = claims
            .sub
            .parse::<i64>()
            .context("token subject is not a user id")?;

        Ok(AuthUser {
            id,
            email: claims.email,
            role: claims.role,
        })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Reject requests without a valid bearer token
pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return ApiError::Unauthorized("Access denied. No token provided.".to_string())
            .into_response();
    };

    match auth_service.validate(token) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            ApiError::Unauthorized("Invalid or expired token.".to_string()).into_response()
        }
    }
}

/// Reject authenticated callers that are not admins. Must run after [`auth_middleware`].
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        Some(user) if user.is_admin() => next.run(request).await,
        Some(user) => {
            debug!(user_id = user.id, "Admin route denied");
            ApiError::Forbidden.into_response()
        }
        None => ApiError::Unauthorized("Authentication required.".to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "test-secret".to_string(),
            token_ttl_days: 7,
        })
    }

    #[test]
    fn bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn validate_rejects_garbage() {
        assert!(service().validate("not.a.token").is_err());
    }

    #[test]
    fn issued_token_validates() {
        let user = User {
            id: 3,
            name: "Viewer User".to_string(),
            email: "viewer@pulseboard.io".to_string(),
            password_hash: String::new(),
            role: Role::Viewer,
            created_at: chrono::Utc::now(),
        };
        let service = service();
        let token = service.issue_token(&user).unwrap();

        let auth_user = service.validate(&token).unwrap();
        assert_eq!(auth_user.id, 3);
        assert!(!auth_user.is_admin());
    }
}
