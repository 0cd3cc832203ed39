use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use todo_api_rust::auth::{mint_token, Claims};

/// Signing material and claims the spawned server is configured to accept.
pub const SECRET: &str = "integration-test-secret";
pub const ISSUER: &str = "https://auth.example.test/";
pub const AUDIENCE: &str = "todo-api-test";

/// Recognized access keys; each test uses its own so quota buckets stay
/// independent across tests.
pub const API_KEYS: &str = "auth-key,crud-key,iso-key,patch-key,del-key,list-key,quota-key,misc-key";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new("target/debug/todo-api-rust");
        cmd.env("TODO_API_PORT", port.to_string())
            .env("APP_ENV", "development")
            .env("TODO_AUTH_ISSUER", ISSUER)
            .env("TODO_AUTH_AUDIENCE", AUDIENCE)
            .env("TODO_AUTH_HS256_SECRET", SECRET)
            .env("TODO_AUTH_REQUIRE_API_KEY", "true")
            .env("TODO_AUTH_API_KEYS", API_KEYS)
            .env("TODO_QUOTA_RATE_PER_SEC", "10")
            .env("TODO_QUOTA_BURST", "40")
            .env("TODO_QUOTA_DAILY_LIMIT", "100000")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Mint a token the server accepts, for the given subject.
pub fn mint(sub: &str) -> String {
    let claims = Claims::new(sub, ISSUER, AUDIENCE, 3600);
    mint_token(&claims, SECRET, Some("local")).expect("failed to mint test token")
}

pub fn bearer(sub: &str) -> String {
    format!("Bearer {}", mint(sub))
}
