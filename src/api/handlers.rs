use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::{AuthService, AuthUser};
use crate::config::DashboardConfig;
use crate::models::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, Role, Setting,
    UpdateProfileRequest, UpdateRoleRequest, UpdateSettingRequest, User,
};
use crate::storage::{Storage, StorageError};

use super::ApiError;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub auth: Arc<AuthService>,
    pub dashboard: DashboardConfig,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Serialize)]
pub struct SettingsResponse {
    pub settings: Vec<Setting>,
}

#[derive(Serialize)]
pub struct SettingResponse {
    pub setting: Setting,
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Create a viewer account and sign it in
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = payload.email.trim().to_lowercase();
    let name = payload.name.trim();
    if email.is_empty() || payload.password.is_empty() || name.is_empty() {
        return Err(ApiError::BadRequest(
            "Email, password, and name are required.".to_string(),
        ));
    }
    validate_password_strength(&payload.password)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let password_hash = hash_password(&payload.password)?;
    let user = match state
        .storage
        .create_user(name, &email, &password_hash, Role::Viewer)
        .await
    {
        Ok(user) => user,
        Err(StorageError::Conflict) => {
            return Err(ApiError::Conflict(
                "A user with this email already exists.".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, "Registered new user");
    let token = state.auth.issue_token(&user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required.".to_string(),
        ));
    }

    let invalid = || ApiError::Unauthorized("Invalid email or password.".to_string());
    let user = state
        .storage
        .get_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = state.auth.issue_token(&user)?;
    Ok(Json(AuthResponse { token, user }))
}

/// The signed-in user, read fresh from the store
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .storage
        .get_user(auth_user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;
    Ok(Json(UserResponse { user }))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(
            "Name and email are required".to_string(),
        ));
    }

    let user = state
        .storage
        .update_profile(auth_user.id, name, &email)
        .await
        .map_err(|e| match e {
            StorageError::NotFound => ApiError::NotFound("User not found".to_string()),
            other => other.into(),
        })?;
    Ok(Json(UserResponse { user }))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if payload.current_password.is_empty()
        || payload.new_password.is_empty()
        || payload.confirm_password.is_empty()
    {
        return Err(ApiError::BadRequest(
            "All password fields are required".to_string(),
        ));
    }
    if payload.new_password != payload.confirm_password {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }
    validate_password_strength(&payload.new_password)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user = state
        .storage
        .get_user(auth_user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if !verify_password(&payload.current_password, &user.password_hash) {
        return Err(ApiError::BadRequest(
            "Current password is incorrect".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.new_password)?;
    state.storage.update_password(user.id, &password_hash).await?;

    info!(user_id = user.id, "Password changed");
    Ok(Json(SuccessResponse {
        message: "Password updated".to_string(),
    }))
}

/// All users, oldest first (admin only)
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.storage.list_users().await?))
}

pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if user_id == auth_user.id {
        return Err(ApiError::BadRequest(
            "Cannot change your own role".to_string(),
        ));
    }
    let role = payload
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::BadRequest("Invalid role".to_string()))?;

    if !state.storage.update_role(user_id, role).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(user_id, role = %role, changed_by = auth_user.id, "Role updated");
    Ok(Json(SuccessResponse {
        message: "Role updated".to_string(),
    }))
}

pub async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = state.storage.list_settings().await?;
    Ok(Json(SettingsResponse { settings }))
}

/// Overwrite a setting's value (admin only)
pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(setting_id): Path<i64>,
    Json(payload): Json<UpdateSettingRequest>,
) -> Result<Json<SettingResponse>, ApiError> {
    let value = payload
        .as_text()
        .ok_or_else(|| ApiError::BadRequest("Value is required.".to_string()))?;

    let setting = state
        .storage
        .update_setting(setting_id, &value, Some(auth_user.id))
        .await
        .map_err(|e| match e {
            StorageError::NotFound => ApiError::NotFound("Setting not found.".to_string()),
            other => other.into(),
        })?;
    Ok(Json(SettingResponse { setting }))
}
