//! Client for the SecretShare HTTP endpoints

use reqwest::Client;
use serde::Serialize;

/// Body of a write request
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct WriteRequest<'a> {
    message: &'a str,
    secret_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_duration: Option<&'a str>,
}

/// Client for interacting with SecretShare
#[derive(Clone)]
pub struct SecretShareClient {
    base_url: String,
    client: Client,
}

impl SecretShareClient {
    /// Create a new client
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self { base_url, client }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Store a secret and return the response body (the id on success)
    pub async fn write_secret(
        &self,
        message: &str,
        secret_key: &str,
        active_duration: Option<&str>,
    ) -> Result<String, ClientError> {
        let body = WriteRequest {
            message,
            secret_key,
            active_duration,
        };
        let url = format!("{}/write", self.base_url);
        let response = self.client.post(&url).json(&body).send().await?;
        Ok(response.text().await?)
    }

    /// Send an arbitrary body to the write endpoint
    pub async fn write_raw(&self, body: &str) -> Result<String, ClientError> {
        let url = format!("{}/write", self.base_url);
        let response = self.client.post(&url).body(body.to_string()).send().await?;
        Ok(response.text().await?)
    }

    /// Read a secret and return the response body
    pub async fn read_secret(&self, secret_id: &str, secret_key: &str) -> Result<String, ClientError> {
        let url = format!("{}/read", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("SecretID", secret_id), ("SecretKey", secret_key)])
            .send()
            .await?;
        Ok(response.text().await?)
    }

    /// Check the health endpoint and return the reported store backend
    pub async fn health(&self) -> Result<String, ClientError> {
        let url = format!("{}/health", self.base_url);
        let json: serde_json::Value = self.client.get(&url).send().await?.json().await?;

        json.get("store")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::ParseError("Missing store in health response".to_string()))
    }
}

/// Client error
#[derive(Debug)]
pub enum ClientError {
    RequestError(reqwest::Error),
    ParseError(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::RequestError(e) => write!(f, "Request error: {}", e),
            ClientError::ParseError(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::RequestError(e)
    }
}
