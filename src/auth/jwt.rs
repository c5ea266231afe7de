use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::state::AppState;

/// Token class used to distinguish Access and Refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims carried by both token classes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at
    pub kind: TokenKind, // access or refresh
}

/// Signing and verification keys, one pair per token class. The classes
/// use distinct secrets, so a refresh token cannot pass as an access token
/// even before the kind claim is checked.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes as u64) * 60),
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let (key, ttl) = match kind {
            TokenKind::Access => (&self.access_encoding, self.access_ttl),
            TokenKind::Refresh => (&self.refresh_encoding, self.refresh_ttl),
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            kind,
        };
        let token = encode(&Header::default(), &claims, key)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    /// Verify a token against the given class's key. Fails on a bad
    /// signature, expiry, malformed input, or a kind claim that does not
    /// match the requested class.
    pub fn verify(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };
        let data = decode::<Claims>(token, key, &Validation::default())?;
        if data.claims.kind != kind {
            anyhow::bail!("wrong token kind");
        }
        debug!(user_id = %data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        })
    }

    #[tokio::test]
    async fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify(&token, TokenKind::Access).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Access);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn sign_and_verify_refresh_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_refresh(user_id).expect("sign refresh");
        let claims = keys
            .verify(&token, TokenKind::Refresh)
            .expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[tokio::test]
    async fn access_token_does_not_verify_as_refresh() {
        let keys = make_keys();
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        // Signed with the access secret, so the refresh key rejects the signature.
        keys.verify(&token, TokenKind::Refresh).unwrap_err();
    }

    #[tokio::test]
    async fn refresh_token_does_not_verify_as_access() {
        let keys = make_keys();
        let token = keys.sign_refresh(Uuid::new_v4()).expect("sign refresh");
        keys.verify(&token, TokenKind::Access).unwrap_err();
    }

    #[tokio::test]
    async fn kind_claim_rejects_crossover_even_with_shared_secret() {
        let keys = JwtKeys::from_config(&JwtConfig {
            access_secret: "shared".into(),
            refresh_secret: "shared".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        });
        let token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        let err = keys.verify(&token, TokenKind::Refresh).unwrap_err();
        assert!(err.to_string().contains("wrong token kind"));
    }

    #[tokio::test]
    async fn expired_token_fails_verification() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        // Default validation allows 60s leeway, so expire well past it.
        let claims = Claims {
            sub: Uuid::new_v4(),
            iat: (now - 600) as usize,
            exp: (now - 300) as usize,
            kind: TokenKind::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .expect("encode");
        keys.verify(&token, TokenKind::Access).unwrap_err();
    }

    #[tokio::test]
    async fn tampered_token_fails_verification() {
        let keys = make_keys();
        let mut token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        token.push('x');
        keys.verify(&token, TokenKind::Access).unwrap_err();
    }
}
