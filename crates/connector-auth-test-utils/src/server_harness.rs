//! Test server harness for E2E testing
//!
//! Provides `TestKeyServer`, a mock issuer serving the signing key, and
//! `TestConnectorServer`, a real connector auth server on a random port.

use crate::crypto_fixtures::TEST_RSA_PUBLIC_KEY;
use connector_auth::config::Config;
use connector_auth::routes::{self, AppState};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock issuer serves its public key on.
pub const KEY_PATH: &str = "/security/public-key";

/// Mock issuer serving a PEM public key.
pub struct TestKeyServer {
    server: MockServer,
}

impl TestKeyServer {
    /// Start an issuer serving [`TEST_RSA_PUBLIC_KEY`].
    pub async fn start() -> Self {
        Self::serving(ResponseTemplate::new(200).set_body_string(TEST_RSA_PUBLIC_KEY)).await
    }

    /// Start an issuer answering key requests with `response`.
    pub async fn serving(response: ResponseTemplate) -> Self {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEY_PATH))
            .respond_with(response)
            .mount(&server)
            .await;
        Self { server }
    }

    /// URL to configure as `MF_PUB_KEY_URL`.
    pub fn key_url(&self) -> String {
        format!("{}{}", self.server.uri(), KEY_PATH)
    }

    /// Number of key requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }
}

/// Test harness for spawning a connector auth server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// let server = TestConnectorServer::spawn(None).await?;
/// let response = reqwest::get(format!("{}/health", server.url())).await?;
/// assert_eq!(response.status(), 200);
/// ```
pub struct TestConnectorServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestConnectorServer {
    /// Spawn a server using `key_url` as the signing key source.
    pub async fn spawn(key_url: Option<&str>) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::new();
        if let Some(url) = key_url {
            vars.insert("MF_PUB_KEY_URL".to_string(), url.to_string());
        }
        Self::spawn_with_vars(vars).await
    }

    /// Spawn a server configured from `vars`.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        mut vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string());

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config));
        // Not installed globally; tests may spawn several servers per process
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = routes::build_routes(state, metrics_handle);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestConnectorServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
