use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Request body for login. Email and/or username, at least one of them.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    pub password: String,
}

/// Request body for token refresh, for clients that do not send the
/// refresh cookie.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for password change.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Freshly signed access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Response payload for login: the user plus both tokens, mirrored into
/// cookies by the handler.
#[derive(Debug, Serialize)]
pub struct LoginPayload {
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn login_request_accepts_email_only() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email": "a@x.com", "password": "p@ss1"}"#).unwrap();
        assert_eq!(req.email.as_deref(), Some("a@x.com"));
        assert_eq!(req.username, None);
        assert_eq!(req.password, "p@ss1");
    }

    #[test]
    fn login_request_accepts_username_only() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"username": "ada", "password": "p@ss1"}"#).unwrap();
        assert_eq!(req.email, None);
        assert_eq!(req.username.as_deref(), Some("ada"));
    }

    #[test]
    fn refresh_request_tolerates_empty_body() {
        let req: RefreshRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.refresh_token, None);
    }

    #[test]
    fn token_pair_serializes_snake_case() {
        let pair = TokenPair {
            access_token: "acc".into(),
            refresh_token: "ref".into(),
        };
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["access_token"], "acc");
        assert_eq!(json["refresh_token"], "ref");
    }
}
