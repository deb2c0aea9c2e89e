use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::api::errors::{is_unique_violation, ApiError};
use crate::api::extract::ValidJson;
use crate::api::guards::CurrentUser;
use crate::api::response::{created, ok, ApiResult};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::schemas::auth::{LoginRequest, SignupRequest, TokenResponse};
use crate::schemas::user::UserResponse;

/// Max attempts per window for auth endpoints (login/signup).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn signup(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<SignupRequest>,
) -> ApiResult<TokenResponse> {
    let username = payload.username.trim().to_lowercase();
    enforce_rate_limit(&state, "signup", &username, "Too many signup attempts, try again later")
        .await?;

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
            role: UserRole::Student,
            is_active: true,
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

    tracing::info!(user_id = %user.id, "User signed up");

    Ok(created("Account created", issue_token(&state, &user)?))
}

async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let username = payload.username.trim().to_lowercase();
    enforce_rate_limit(&state, "login", &username, "Too many login attempts, try again later")
        .await?;

    let user = repositories::users::find_by_username(state.db(), &username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;
    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Inactive user"));
    }

    Ok(ok("Logged in", issue_token(&state, &user)?))
}

async fn me(CurrentUser(user): CurrentUser) -> ApiResult<UserResponse> {
    Ok(ok("Current user", UserResponse::from(&user)))
}

async fn enforce_rate_limit(
    state: &AppState,
    action: &str,
    username: &str,
    message: &'static str,
) -> Result<(), ApiError> {
    let rate_key = format!("rl:{action}:{username}");
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Rate limit check failed; allowing request");
            true
        });

    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests(message))
    }
}

fn issue_token(state: &AppState, user: &User) -> Result<TokenResponse, ApiError> {
    let access_token = security::create_access_token(&user.id, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(TokenResponse {
        access_token,
        token_type: "bearer",
        expires_in: state.settings().security().access_token_expire_minutes * 60,
        user: UserResponse::from(user),
    })
}
