use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::services::{self, is_valid_email, AuthError},
    error::AppError,
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
    state::AppState,
    users::{
        dto::{non_empty, CreateUserRequest, CreatedUser, UpdateUserRequest, UserQuery},
        repo_types::{PublicUser, RepoError, UpdateOutcome, User},
    },
};

const DUPLICATE_EMAIL: &str = "User with this email already exists";
const USER_NOT_FOUND: &str = "User not found";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/:id", put(update_user).delete(delete_user))
}

pub fn info_routes() -> Router<AppState> {
    Router::new().route("/info/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<ApiResponse<CreatedUser>, AppError> {
    let id = services::register(&state.db, payload)
        .await
        .map_err(|e| match e {
            AuthError::Missing(msg) => AppError::Validation(msg.into()),
            AuthError::InvalidEmail => AppError::Validation("Invalid email".into()),
            AuthError::DuplicateEmail => AppError::Conflict {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: DUPLICATE_EMAIL.into(),
            },
            other => AppError::internal("Error creating user", other),
        })?;

    Ok(ApiResponse::with_data(
        StatusCode::CREATED,
        "User created successfully",
        CreatedUser { id },
    ))
}

/// Without `email` lists every user; with it, returns that single user.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(q): Query<UserQuery>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let data = match non_empty(q.email) {
        Some(email) => {
            let user = User::find_by_email(&state.db, email.trim())
                .await
                .map_err(|e| AppError::internal("Error retrieving users", e))?
                .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))?;
            serde_json::to_value(PublicUser::from(user))
        }
        None => {
            let users = User::list_all(&state.db)
                .await
                .map_err(|e| AppError::internal("Error retrieving users", e))?;
            serde_json::to_value(users)
        }
    }
    .map_err(|e| AppError::internal("Error retrieving users", e))?;

    Ok(ApiResponse::with_data(StatusCode::OK, "OK", data))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<()>, AppError> {
    let affected = User::delete_by_id(&state.db, id)
        .await
        .map_err(|e| AppError::internal("Error deleting user", e))?;
    if affected == 0 {
        warn!(user_id = id, "delete of unknown user");
        return Err(AppError::NotFound(USER_NOT_FOUND.into()));
    }
    info!(user_id = id, "user deleted");
    Ok(ApiResponse::message(StatusCode::OK, "User deleted successfully"))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<ApiResponse<()>, AppError> {
    let changes = payload.into_changes();
    if changes.is_empty() {
        return Err(AppError::Validation(
            "At least one of new email, first name, or last name is required".into(),
        ));
    }
    if let Some(email) = changes.email.as_deref() {
        if !is_valid_email(email) {
            warn!(user_id = id, email, "update with invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
    }

    let outcome = User::update_partial(&state.db, id, changes)
        .await
        .map_err(|e| match e {
            RepoError::NotFound => AppError::NotFound(USER_NOT_FOUND.into()),
            RepoError::DuplicateEmail => AppError::Conflict {
                status: StatusCode::BAD_REQUEST,
                message: DUPLICATE_EMAIL.into(),
            },
            other => AppError::internal("Error updating user details", other),
        })?;

    match outcome {
        UpdateOutcome::NoChanges => Err(AppError::NoChanges),
        UpdateOutcome::Updated(_) => {
            info!(user_id = id, "user updated");
            Ok(ApiResponse::message(StatusCode::OK, "User updated successfully"))
        }
    }
}
