use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, warn};

use super::{
    jwt::JwtKeys,
    password::{self, PasswordError},
};
use crate::users::{
    dto::{non_empty, CreateUserRequest},
    repo_types::{PublicUser, RepoError, User},
};

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was absent or empty; carries the client message.
    #[error("{0}")]
    Missing(&'static str),
    #[error("Invalid email")]
    InvalidEmail,
    /// Unknown email and wrong password map to the same error.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error("storage: {0}")]
    Storage(#[source] RepoError),
    #[error("password: {0}")]
    Password(#[from] PasswordError),
    #[error("crypto: {0}")]
    Crypto(#[source] anyhow::Error),
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::DuplicateEmail => AuthError::DuplicateEmail,
            other => AuthError::Storage(other),
        }
    }
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: PublicUser,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Verify credentials and issue a session token.
pub async fn login(
    db: &SqlitePool,
    keys: &JwtKeys,
    email: &str,
    plain: &str,
) -> Result<LoginOutcome, AuthError> {
    let Some(user) = User::find_by_email(db, email).await? else {
        warn!(email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    let hash = user.password_hash.clone();
    let plain = plain.to_owned();
    let ok = run_blocking(move || password::verify_password(&plain, &hash)).await?;
    if !ok {
        warn!(email, user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let token = keys.sign(user.id, &user.email).map_err(AuthError::Crypto)?;
    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(LoginOutcome {
        token,
        user: user.into(),
    })
}

/// Validate a registration request, hash the password and store the user.
pub async fn register(db: &SqlitePool, req: CreateUserRequest) -> Result<i64, AuthError> {
    let email = non_empty(req.email.map(|e| e.trim().to_owned()))
        .ok_or(AuthError::Missing("Email is required"))?;
    let plain = non_empty(req.password).ok_or(AuthError::Missing("Password is required"))?;
    let first_name =
        non_empty(req.first_name).ok_or(AuthError::Missing("First name is required"))?;
    let last_name = non_empty(req.last_name).ok_or(AuthError::Missing("Last name is required"))?;

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::InvalidEmail);
    }

    let hash = run_blocking(move || password::hash_password(&plain)).await?;
    let id = User::create(db, &email, &hash, &first_name, &last_name).await?;
    info!(user_id = id, email = %email, "user registered");
    Ok(id)
}

/// Argon2 is CPU-bound; keep it off the async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    let out = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Crypto(e.into()))??;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::extract::FromRef;

    fn request(email: &str, password: &str, first: &str, last: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: Some(email.into()),
            password: Some(password.into()),
            first_name: Some(first.into()),
            last_name: Some(last.into()),
        }
    }

    #[test]
    fn email_check() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("no at sign"));
    }

    #[tokio::test]
    async fn register_then_login_issues_token_for_same_identity() {
        let state = AppState::fake().await;
        let keys = JwtKeys::from_ref(&state);

        let id = register(&state.db, request("a@x.com", "p1", "A", "B"))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let out = login(&state.db, &keys, "a@x.com", "p1").await.unwrap();
        let claims = keys.verify(&out.token).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(out.user.first_name, "A");
        assert_eq!(out.user.last_name, "B");
    }

    #[tokio::test]
    async fn stored_hash_is_not_plaintext() {
        let state = AppState::fake().await;
        register(&state.db, request("a@x.com", "p1", "A", "B"))
            .await
            .unwrap();
        let user = User::find_by_email(&state.db, "a@x.com").await.unwrap().unwrap();
        assert_ne!(user.password_hash, "p1");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_are_indistinguishable() {
        let state = AppState::fake().await;
        let keys = JwtKeys::from_ref(&state);
        register(&state.db, request("a@x.com", "p1", "A", "B"))
            .await
            .unwrap();

        let wrong = login(&state.db, &keys, "a@x.com", "wrong").await.unwrap_err();
        let unknown = login(&state.db, &keys, "nobody@x.com", "p1")
            .await
            .unwrap_err();
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn register_duplicate_email_fails() {
        let state = AppState::fake().await;
        register(&state.db, request("a@x.com", "p1", "A", "B"))
            .await
            .unwrap();
        let err = register(&state.db, request("a@x.com", "p2", "C", "D"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_reports_first_missing_field() {
        let state = AppState::fake().await;
        let err = register(
            &state.db,
            CreateUserRequest {
                email: Some("a@x.com".into()),
                password: Some(String::new()),
                first_name: None,
                last_name: Some("B".into()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Password is required");
        assert!(User::list_all(&state.db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_rejects_malformed_email() {
        let state = AppState::fake().await;
        let err = register(&state.db, request("not-an-email", "p1", "A", "B"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_not_a_credential_mismatch() {
        let state = AppState::fake().await;
        let keys = JwtKeys::from_ref(&state);
        User::create(&state.db, "a@x.com", "not-a-phc-string", "A", "B")
            .await
            .unwrap();
        let err = login(&state.db, &keys, "a@x.com", "p1").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Password(PasswordError::MalformedHash(_))
        ));
    }
}
