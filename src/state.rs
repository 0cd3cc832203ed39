use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::auth::{JwksKeyProvider, SigningKeyProvider, StaticKeyProvider, TokenVerifier};
use crate::config::AppConfig;
use crate::quota::{QuotaEnforcer, SystemClock};
use crate::store::{MemoryTodoStore, TodoStore};

/// Shared per-process state handed to the router.
///
/// Everything here is safe under concurrent requests: the store and key
/// cache sit behind RwLocks, the quota table behind a Mutex.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TodoStore>,
    pub quota: Arc<QuotaEnforcer>,
    pub verifier: Arc<TokenVerifier>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryTodoStore::new(config.store.table_name.clone()));

        let quota = Arc::new(QuotaEnforcer::new(
            &config.quota,
            Box::new(SystemClock::new()),
        ));

        let provider: Arc<dyn SigningKeyProvider> = match (&config.auth.jwks_url, &config.auth.hs256_secret) {
            (Some(url), _) => Arc::new(
                JwksKeyProvider::new(url.clone(), Duration::from_secs(10))
                    .context("failed to build JWKS key provider")?,
            ),
            (None, Some(secret)) => Arc::new(StaticKeyProvider::single("local", secret.clone())),
            (None, None) => anyhow::bail!("no signing key source configured"),
        };

        let verifier = Arc::new(TokenVerifier::new(
            provider,
            config.auth.issuer.clone(),
            config.auth.audience.clone(),
            Duration::from_secs(config.auth.key_refresh_secs),
        ));

        Ok(Self {
            store,
            quota,
            verifier,
        })
    }
}
