use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{claims::Identity, jwt::JwtKeys};
use crate::error::AppError;

/// Validates the bearer token and yields the caller's identity.
///
/// A missing header or an empty bearer token is `Unauthorized`; every other
/// failure (scheme, signature, shape, expiry) collapses into `InvalidToken`.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AppError::Unauthorized)?;

        let value = header.to_str().map_err(|_| AppError::InvalidToken)?.trim();
        // "Bearer " with the trailing space stripped.
        if value == "Bearer" {
            return Err(AppError::Unauthorized);
        }
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(AppError::InvalidToken)?
            .trim();
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "token rejected");
            AppError::InvalidToken
        })?;

        Ok(AuthUser(claims.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::http::Request;

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/auth/me");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake().await;
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn empty_bearer_token_is_unauthorized() {
        let state = AppState::fake().await;
        for value in ["Bearer ", "Bearer", "Bearer    "] {
            let mut parts = parts_with(Some(value));
            let err = AuthUser::from_request_parts(&mut parts, &state)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, AppError::Unauthorized), "{value:?}");
        }
    }

    #[tokio::test]
    async fn malformed_or_foreign_tokens_are_invalid() {
        let state = AppState::fake().await;
        let foreign = JwtKeys::from_config(&crate::config::JwtConfig {
            secret: "other-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
        })
        .sign(1, "a@x.com")
        .unwrap();

        for value in [
            "Basic abc".to_string(),
            "Bearerabc".to_string(),
            "Bearer not-a-token".to_string(),
            format!("Bearer {foreign}"),
        ] {
            let mut parts = parts_with(Some(&value));
            let err = AuthUser::from_request_parts(&mut parts, &state)
                .await
                .err()
                .unwrap();
            assert!(matches!(err, AppError::InvalidToken), "{value}");
        }
    }

    #[tokio::test]
    async fn valid_token_attaches_identity() {
        let state = AppState::fake().await;
        let token = JwtKeys::from_ref(&state).sign(7, "a@x.com").unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let AuthUser(identity) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .ok()
            .unwrap();
        assert_eq!(
            identity,
            Identity {
                id: 7,
                email: "a@x.com".into()
            }
        );
    }
}
