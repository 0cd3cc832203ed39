use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod keys;
pub mod verifier;

pub use keys::{JwksKeyProvider, KeySet, SigningKeyProvider, StaticKeyProvider};
pub use verifier::TokenVerifier;

/// Registered claims carried by every bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(
        sub: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::seconds(ttl_secs)).timestamp();

        Self {
            sub: sub.into(),
            iss: issuer.into(),
            aud: audience.into(),
            scope: None,
            exp,
            iat: now.timestamp(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Authenticated identity derived from a verified credential.
/// Lives only for the duration of one request; never persisted.
#[derive(Clone, Debug)]
pub struct Principal {
    pub owner_id: String,
    pub scopes: Vec<String>,
}

impl Principal {
    fn from_claims(claims: Claims) -> Self {
        let scopes = claims
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            owner_id: claims.sub,
            scopes,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer credential")]
    MissingCredential,

    #[error("invalid bearer credential: {0}")]
    InvalidToken(String),

    #[error("no signing key matches kid '{0}'")]
    UnknownKey(String),

    #[error("signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

/// Sign a token with an HS256 secret. Used by local tooling and tests;
/// production tokens come from the identity provider.
pub fn mint_token(
    claims: &Claims,
    secret: &str,
    kid: Option<&str>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let header = Header {
        kid: kid.map(str::to_string),
        ..Header::default()
    };
    encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
}
