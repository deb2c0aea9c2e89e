use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::errors::{is_unique_violation, ApiError};
use crate::api::extract::ValidJson;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::api::response::{created, ok, ApiResult};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::user::{AdminUserCreate, UserResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/", post(create_user)).route("/me", get(me))
}

async fn me(CurrentUser(user): CurrentUser) -> ApiResult<UserResponse> {
    Ok(ok("Current user", UserResponse::from(&user)))
}

async fn create_user(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<AdminUserCreate>,
) -> ApiResult<UserResponse> {
    let username = payload.username.trim().to_lowercase();

    let taken = repositories::users::username_taken(state.db(), &username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if taken {
        return Err(ApiError::Conflict("Username is already taken".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username: &username,
            full_name: payload.full_name.trim(),
            hashed_password: &hashed_password,
            role: payload.role,
            is_active: payload.is_active,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Username is already taken".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = ?user.role, "User created");

    Ok(created("User created", UserResponse::from(&user)))
}
