use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::{decode, decode_header, Validation};
use tokio::sync::RwLock;

use super::keys::{KeySet, SigningKeyProvider, VerificationKey};
use super::{AuthError, Claims, Principal};

struct CachedKeys {
    keys: Arc<KeySet>,
    fetched_at: Instant,
}

/// Validates bearer tokens against the identity provider's published signing
/// keys and produces an authenticated [`Principal`].
///
/// Keys are cached and refreshed on a TTL. A failed refresh falls back to the
/// previously-fetched set; with no cached set, verification fails closed.
pub struct TokenVerifier {
    provider: Arc<dyn SigningKeyProvider>,
    issuer: String,
    audience: String,
    refresh: Duration,
    cache: RwLock<Option<CachedKeys>>,
}

impl TokenVerifier {
    pub fn new(
        provider: Arc<dyn SigningKeyProvider>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        refresh: Duration,
    ) -> Self {
        Self {
            provider,
            issuer: issuer.into(),
            audience: audience.into(),
            refresh,
            cache: RwLock::new(None),
        }
    }

    /// Verify signature, issuer, audience and expiry; extract the subject
    /// as the owning principal. No side effects beyond key-cache population.
    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header =
            decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let keys = self.current_keys().await?;
        let key = self.select_key(&keys, header.kid.as_deref())?;

        let mut validation = Validation::new(key.algorithm);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<Claims>(token, &key.decoding, &validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        if data.claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken("empty subject claim".to_string()));
        }

        Ok(Principal::from_claims(data.claims))
    }

    fn select_key<'a>(
        &self,
        keys: &'a KeySet,
        kid: Option<&str>,
    ) -> Result<&'a VerificationKey, AuthError> {
        match kid {
            Some(kid) => keys.get(kid).ok_or_else(|| AuthError::UnknownKey(kid.to_string())),
            None => keys.single().ok_or_else(|| {
                AuthError::InvalidToken("token has no key id and several keys are published".into())
            }),
        }
    }

    async fn current_keys(&self) -> Result<Arc<KeySet>, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.fetched_at.elapsed() < self.refresh {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.refresh {
                return Ok(cached.keys.clone());
            }
        }

        match self.provider.fetch_signing_keys().await {
            Ok(set) => {
                let keys = Arc::new(set);
                *cache = Some(CachedKeys {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(e) => match cache.as_ref() {
                // Stale keys beat an outage; expiry still applies per token.
                Some(cached) => {
                    tracing::warn!("signing key refresh failed, using cached set: {}", e);
                    Ok(cached.keys.clone())
                }
                None => Err(e),
            },
        }
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("refresh", &self.refresh)
            .finish()
    }
}
