use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub quota: QuotaConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_cors: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Expected `iss` claim on every bearer token.
    pub issuer: String,
    /// Expected `aud` claim on every bearer token.
    pub audience: String,
    /// JWKS document URL for the identity provider's published signing keys.
    /// When unset, `hs256_secret` supplies a single local signing key.
    pub jwks_url: Option<String>,
    pub hs256_secret: Option<String>,
    /// How long a fetched key set stays fresh before a refresh is attempted.
    pub key_refresh_secs: u64,
    /// When true, every request must carry a recognized access key.
    pub require_api_key: bool,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub rate_per_sec: u32,
    pub burst: u32,
    pub daily_limit: u64,
    /// Idle caller state is evicted after this long without a request.
    pub idle_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Logical collection name for the todo partition.
    pub table_name: String,
    pub op_timeout_ms: u64,
    /// Page-size cap applied to list responses.
    pub list_max_items: usize,
}

/// Errors from eager configuration validation at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("TODO_API_ENABLE_CORS") {
            self.api.enable_cors = v.parse().unwrap_or(self.api.enable_cors);
        }
        if let Ok(v) = env::var("TODO_API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Auth overrides
        if let Ok(v) = env::var("TODO_AUTH_ISSUER") {
            self.auth.issuer = v;
        }
        if let Ok(v) = env::var("TODO_AUTH_AUDIENCE") {
            self.auth.audience = v;
        }
        if let Ok(v) = env::var("TODO_AUTH_JWKS_URL") {
            self.auth.jwks_url = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("TODO_AUTH_HS256_SECRET") {
            self.auth.hs256_secret = if v.is_empty() { None } else { Some(v) };
        }
        if let Ok(v) = env::var("TODO_AUTH_KEY_REFRESH_SECS") {
            self.auth.key_refresh_secs = v.parse().unwrap_or(self.auth.key_refresh_secs);
        }
        if let Ok(v) = env::var("TODO_AUTH_REQUIRE_API_KEY") {
            self.auth.require_api_key = v.parse().unwrap_or(self.auth.require_api_key);
        }
        if let Ok(v) = env::var("TODO_AUTH_API_KEYS") {
            self.auth.api_keys = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Quota overrides
        if let Ok(v) = env::var("TODO_QUOTA_RATE_PER_SEC") {
            self.quota.rate_per_sec = v.parse().unwrap_or(self.quota.rate_per_sec);
        }
        if let Ok(v) = env::var("TODO_QUOTA_BURST") {
            self.quota.burst = v.parse().unwrap_or(self.quota.burst);
        }
        if let Ok(v) = env::var("TODO_QUOTA_DAILY_LIMIT") {
            self.quota.daily_limit = v.parse().unwrap_or(self.quota.daily_limit);
        }
        if let Ok(v) = env::var("TODO_QUOTA_IDLE_TTL_SECS") {
            self.quota.idle_ttl_secs = v.parse().unwrap_or(self.quota.idle_ttl_secs);
        }

        // Store overrides
        if let Ok(v) = env::var("TODO_STORE_TABLE_NAME") {
            self.store.table_name = v;
        }
        if let Ok(v) = env::var("TODO_STORE_OP_TIMEOUT_MS") {
            self.store.op_timeout_ms = v.parse().unwrap_or(self.store.op_timeout_ms);
        }
        if let Ok(v) = env::var("TODO_STORE_LIST_MAX_ITEMS") {
            self.store.list_max_items = v.parse().unwrap_or(self.store.list_max_items);
        }

        self
    }

    /// Eager validation, run once at startup before the server binds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.issuer.trim().is_empty() {
            return Err(ConfigError::Missing("auth.issuer"));
        }
        if self.auth.audience.trim().is_empty() {
            return Err(ConfigError::Missing("auth.audience"));
        }
        if self.auth.jwks_url.is_none() && self.auth.hs256_secret.is_none() {
            return Err(ConfigError::Missing("auth.jwks_url or auth.hs256_secret"));
        }
        if let Some(jwks_url) = &self.auth.jwks_url {
            url::Url::parse(jwks_url).map_err(|e| ConfigError::Invalid {
                field: "auth.jwks_url",
                reason: e.to_string(),
            })?;
        }
        if self.auth.require_api_key && self.auth.api_keys.is_empty() {
            return Err(ConfigError::Invalid {
                field: "auth.api_keys",
                reason: "access key required but no keys configured".to_string(),
            });
        }
        if self.quota.rate_per_sec == 0 {
            return Err(ConfigError::Invalid {
                field: "quota.rate_per_sec",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.quota.burst == 0 {
            return Err(ConfigError::Invalid {
                field: "quota.burst",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.quota.daily_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "quota.daily_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.store.table_name.trim().is_empty() {
            return Err(ConfigError::Missing("store.table_name"));
        }
        if self.store.op_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "store.op_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.store.list_max_items == 0 {
            return Err(ConfigError::Invalid {
                field: "store.list_max_items",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                enable_cors: true,
                max_request_size_bytes: 1024 * 1024, // 1MB
            },
            auth: AuthConfig {
                issuer: "https://auth.local/".to_string(),
                audience: "todo-api".to_string(),
                jwks_url: None,
                hs256_secret: Some("local-dev-secret".to_string()),
                key_refresh_secs: 3600,
                require_api_key: false,
                api_keys: vec![],
            },
            quota: QuotaConfig {
                rate_per_sec: 50,
                burst: 100,
                daily_limit: 100_000,
                idle_ttl_secs: 3600,
            },
            store: StoreConfig {
                table_name: "Todos".to_string(),
                op_timeout_ms: 10_000,
                list_max_items: 1000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                enable_cors: true,
                max_request_size_bytes: 512 * 1024,
            },
            auth: AuthConfig {
                issuer: "https://auth.staging.example.com/".to_string(),
                audience: "todo-api".to_string(),
                jwks_url: Some(
                    "https://auth.staging.example.com/.well-known/jwks.json".to_string(),
                ),
                hs256_secret: None,
                key_refresh_secs: 900,
                require_api_key: true,
                api_keys: vec![],
            },
            quota: QuotaConfig {
                rate_per_sec: 25,
                burst: 50,
                daily_limit: 10_000,
                idle_ttl_secs: 1800,
            },
            store: StoreConfig {
                table_name: "Todos".to_string(),
                op_timeout_ms: 5_000,
                list_max_items: 500,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                enable_cors: true,
                max_request_size_bytes: 256 * 1024,
            },
            auth: AuthConfig {
                issuer: "https://auth.example.com/".to_string(),
                audience: "todo-api".to_string(),
                jwks_url: Some("https://auth.example.com/.well-known/jwks.json".to_string()),
                hs256_secret: None,
                key_refresh_secs: 300,
                require_api_key: true,
                api_keys: vec![],
            },
            quota: QuotaConfig {
                rate_per_sec: 10,
                burst: 20,
                daily_limit: 1000,
                idle_ttl_secs: 900,
            },
            store: StoreConfig {
                table_name: "Todos".to_string(),
                op_timeout_ms: 2_500,
                list_max_items: 100,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
