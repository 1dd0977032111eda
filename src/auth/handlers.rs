use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::{
        claims::Identity,
        dto::{LoginRequest, LoginResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        services::{self, AuthError},
    },
    error::AppError,
    extract::ApiJson,
    response::ApiResponse,
    state::AppState,
    users::dto::non_empty,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, AppError> {
    let (Some(email), Some(password)) = (non_empty(payload.email), non_empty(payload.password))
    else {
        return Err(AppError::Validation("Email and password are required".into()));
    };

    let keys = JwtKeys::from_ref(&state);
    let out = services::login(&state.db, &keys, email.trim(), &password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials => AppError::InvalidCredentials,
            other => AppError::internal("Error logging in", other),
        })?;

    Ok(ApiResponse::with_data(
        StatusCode::OK,
        "Login successful",
        LoginResponse {
            token: out.token,
            user: out.user,
        },
    ))
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(identity): AuthUser) -> ApiResponse<Identity> {
    ApiResponse::with_data(StatusCode::OK, "OK", identity)
}
