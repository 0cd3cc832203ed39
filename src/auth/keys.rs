use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::jwk::{JwkSet, KeyAlgorithm};
use jsonwebtoken::{Algorithm, DecodingKey};

use super::AuthError;

/// A single verification key as published by the identity provider.
pub struct VerificationKey {
    pub algorithm: Algorithm,
    pub decoding: DecodingKey,
}

/// The set of currently-published signing keys, indexed by key id.
#[derive(Default)]
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
}

impl KeySet {
    pub fn insert(&mut self, kid: impl Into<String>, key: VerificationKey) {
        self.keys.insert(kid.into(), key);
    }

    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    /// The only key in the set, if there is exactly one. Tokens without a
    /// `kid` header can still verify against a single-key provider.
    pub fn single(&self) -> Option<&VerificationKey> {
        if self.keys.len() == 1 {
            self.keys.values().next()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn from_jwks(jwks: &JwkSet) -> Self {
        let mut set = KeySet::default();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            let Some(algorithm) = jwk.common.key_algorithm.and_then(map_key_algorithm) else {
                tracing::warn!(kid = %kid, "skipping JWKS key with unsupported algorithm");
                continue;
            };
            match DecodingKey::from_jwk(jwk) {
                Ok(decoding) => set.insert(kid, VerificationKey { algorithm, decoding }),
                Err(e) => {
                    tracing::warn!(kid = %kid, "skipping unparsable JWKS key: {}", e);
                }
            }
        }
        set
    }
}

fn map_key_algorithm(alg: KeyAlgorithm) -> Option<Algorithm> {
    match alg {
        KeyAlgorithm::HS256 => Some(Algorithm::HS256),
        KeyAlgorithm::HS384 => Some(Algorithm::HS384),
        KeyAlgorithm::HS512 => Some(Algorithm::HS512),
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    }
}

/// Capability interface for obtaining the provider's signing keys, so tests
/// can inject static keys without network access.
#[async_trait]
pub trait SigningKeyProvider: Send + Sync {
    async fn fetch_signing_keys(&self) -> Result<KeySet, AuthError>;
}

/// Fixed HS256 secrets keyed by kid. Development mode and tests.
pub struct StaticKeyProvider {
    secrets: HashMap<String, String>,
}

impl StaticKeyProvider {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn single(kid: impl Into<String>, secret: impl Into<String>) -> Self {
        let mut secrets = HashMap::new();
        secrets.insert(kid.into(), secret.into());
        Self { secrets }
    }
}

#[async_trait]
impl SigningKeyProvider for StaticKeyProvider {
    async fn fetch_signing_keys(&self) -> Result<KeySet, AuthError> {
        let mut set = KeySet::default();
        for (kid, secret) in &self.secrets {
            set.insert(
                kid.clone(),
                VerificationKey {
                    algorithm: Algorithm::HS256,
                    decoding: DecodingKey::from_secret(secret.as_bytes()),
                },
            );
        }
        Ok(set)
    }
}

/// Fetches a JWKS document over HTTPS. Requests are bounded by the client
/// timeout so a slow provider can never hang a caller.
pub struct JwksKeyProvider {
    url: String,
    client: reqwest::Client,
}

impl JwksKeyProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl SigningKeyProvider for JwksKeyProvider {
    async fn fetch_signing_keys(&self) -> Result<KeySet, AuthError> {
        let jwks: JwkSet = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;

        let set = KeySet::from_jwks(&jwks);
        if set.is_empty() {
            return Err(AuthError::KeysUnavailable(
                "JWKS document contained no usable signing keys".to_string(),
            ));
        }
        Ok(set)
    }
}
