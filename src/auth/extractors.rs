use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::auth::cookies::{self, ACCESS_COOKIE};
use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::dto::PublicUser;
use crate::users::repo_types::User;

/// The authenticated caller, resolved from an access token.
///
/// Every failure path rejects with the same `Unauthorized` error, so a
/// caller cannot tell a missing token from a bad signature, an expired or
/// wrong-class token, or a user that no longer exists.
#[derive(Debug, Clone)]
pub struct AuthUser(pub PublicUser);

fn unauthorized() -> ApiError {
    ApiError::Unauthorized("invalid access token".into())
}

/// Access token from the `accessToken` cookie, falling back to the
/// Authorization bearer header.
pub(crate) fn access_token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookies::cookie_value(headers, ACCESS_COOKIE) {
        return Some(token);
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = access_token_from_headers(&parts.headers).ok_or_else(unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token, TokenKind::Access).map_err(|e| {
            warn!(error = %e, "access token rejected");
            unauthorized()
        })?;

        let user = User::find_public_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| {
                warn!(error = %e, "user lookup failed during auth");
                unauthorized()
            })?
            .ok_or_else(unauthorized)?;

        Ok(AuthUser(user))
    }
}

#[cfg(test)]
mod gate_tests {
    use super::*;

    fn request_parts(headers: &[(axum::http::HeaderName, &str)]) -> Parts {
        let mut builder = axum::http::Request::builder().uri("/api/v1/users/current-user");
        for (name, value) in headers {
            builder = builder.header(name, *value);
        }
        let (parts, _body) = builder.body(()).expect("request").into_parts();
        parts
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let state = AppState::fake();
        let mut parts = request_parts(&[]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.to_string(), "invalid access token");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let state = AppState::fake();
        let mut parts = request_parts(&[(header::AUTHORIZATION, "Bearer not.a.jwt")]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_token_is_rejected_at_the_gate() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let refresh = keys
            .sign_refresh(uuid::Uuid::new_v4())
            .expect("sign refresh");
        let header_value = format!("Bearer {refresh}");
        let mut parts = request_parts(&[(header::AUTHORIZATION, header_value.as_str())]);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        // Same message as every other failure path.
        assert_eq!(err.to_string(), "invalid access token");
    }

    #[test]
    fn reads_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "accessToken=from.cookie".parse().unwrap());
        assert_eq!(
            access_token_from_headers(&headers).as_deref(),
            Some("from.cookie")
        );
    }

    #[test]
    fn falls_back_to_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer from.header".parse().unwrap(),
        );
        assert_eq!(
            access_token_from_headers(&headers).as_deref(),
            Some("from.header")
        );
    }

    #[test]
    fn cookie_wins_over_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "accessToken=from.cookie".parse().unwrap());
        headers.insert(
            header::AUTHORIZATION,
            "Bearer from.header".parse().unwrap(),
        );
        assert_eq!(
            access_token_from_headers(&headers).as_deref(),
            Some("from.cookie")
        );
    }

    #[test]
    fn lowercase_bearer_scheme_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "bearer tok".parse().unwrap());
        assert_eq!(access_token_from_headers(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn no_token_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(access_token_from_headers(&headers), None);
    }
}
