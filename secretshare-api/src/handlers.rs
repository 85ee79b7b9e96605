//! HTTP handlers for the write and read endpoints
//!
//! Both endpoints answer 200 with a plain-text body. Failures are reported
//! through the body alone.

use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use secretshare_core::{ErrorCode, RequestId, ShareError};

use crate::service::SecretService;

/// Query parameters of a read request
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReadParams {
    pub secret_id: String,
    pub secret_key: String,
}

impl ReadParams {
    /// Parse `SecretID` and `SecretKey` from a raw query string. Absent
    /// parameters are empty; the first occurrence of a repeated one wins.
    pub fn from_query(query: Option<&str>) -> Self {
        let mut params = Self::default();
        let (mut seen_id, mut seen_key) = (false, false);

        for (name, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match name.as_ref() {
                "SecretID" if !seen_id => {
                    params.secret_id = value.into_owned();
                    seen_id = true;
                }
                "SecretKey" if !seen_key => {
                    params.secret_key = value.into_owned();
                    seen_key = true;
                }
                _ => {}
            }
        }

        params
    }
}

// Reads are not distinguishable from outside, but the log keeps the detail.
fn log_failure(operation: &str, err: &ShareError) {
    match err.code {
        ErrorCode::SecretUnavailable => info!(operation, reason = %err.message, "Secret unavailable"),
        _ => warn!(operation, error = %err, "Request failed"),
    }
}

/// Any method on `/write`. The body is a JSON secret submission.
pub async fn write_secret(State(service): State<Arc<SecretService>>, body: Bytes) -> Response {
    let request_id = RequestId::new();

    match service.write(&request_id, &body).await {
        Ok(secret_id) => text_response(secret_id),
        Err(e) => {
            log_failure("write", &e);
            text_response(e.public_message())
        }
    }
}

/// `GET /read?SecretID=..&SecretKey=..`
pub async fn read_secret(
    State(service): State<Arc<SecretService>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = ReadParams::from_query(query.as_deref());

    match service.read(&params.secret_id, &params.secret_key).await {
        Ok(message) => text_response(message),
        Err(e) => {
            log_failure("read", &e);
            text_response(e.public_message())
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

pub async fn health_check(State(service): State<Arc<SecretService>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running",
        store: service.store_name(),
    })
}

// The body is plain text even though the header says JSON; browser clients
// depend on this header.
fn text_response(body: impl Into<String>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body.into(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_params() {
        let params = ReadParams::from_query(Some("SecretID=abc&SecretKey=k%201"));
        assert_eq!(params.secret_id, "abc");
        assert_eq!(params.secret_key, "k 1");
    }

    #[test]
    fn test_read_params_missing() {
        assert_eq!(ReadParams::from_query(None), ReadParams::default());

        let params = ReadParams::from_query(Some("SecretID=abc"));
        assert_eq!(params.secret_id, "abc");
        assert_eq!(params.secret_key, "");
    }

    #[test]
    fn test_read_params_first_wins_and_case_sensitive() {
        let params =
            ReadParams::from_query(Some("SecretID=a&SecretID=b&secretkey=x&SecretKey=y+z"));
        assert_eq!(params.secret_id, "a");
        assert_eq!(params.secret_key, "y z");
    }
}
