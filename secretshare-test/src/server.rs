//! Test server management

use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::STARTUP_TIMEOUT_SECS;

/// A router served on 127.0.0.1 with an OS-assigned port
pub struct TestServer {
    handle: JoinHandle<()>,
    addr: SocketAddr,
    base_url: String,
}

impl TestServer {
    /// Bind an ephemeral port, serve `router` on it and wait until `/health`
    /// answers.
    pub async fn serve(router: Router) -> Result<Self, TestError> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| TestError::BindFailed(e.to_string()))?;
        let addr = listener
            .local_addr()
            .map_err(|e| TestError::BindFailed(e.to_string()))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Test server stopped");
            }
        });

        let server = Self {
            handle,
            addr,
            base_url: format!("http://{}", addr),
        };
        server.wait_for_ready().await?;

        info!(addr = %server.addr, "Test server ready");
        Ok(server)
    }

    async fn wait_for_ready(&self) -> Result<(), TestError> {
        let health = format!("{}/health", self.base_url);
        let start = std::time::Instant::now();

        while start.elapsed() < Duration::from_secs(STARTUP_TIMEOUT_SECS) {
            if let Ok(response) = reqwest::get(&health).await {
                if response.status().is_success() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Err(TestError::StartupTimeout)
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Get a client for this server
    pub fn client(&self) -> crate::SecretShareClient {
        crate::SecretShareClient::new(self.base_url.clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Errors that can occur with the test server
#[derive(Debug)]
pub enum TestError {
    BindFailed(String),
    StartupTimeout,
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::BindFailed(msg) => write!(f, "Failed to bind test server: {}", msg),
            TestError::StartupTimeout => write!(f, "Server startup timed out"),
        }
    }
}

impl std::error::Error for TestError {}
