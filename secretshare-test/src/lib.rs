//! Test utilities for SecretShare
//!
//! Provides utilities for integration testing:
//! - Serve a router on an ephemeral port
//! - Wait for the server to answer health checks
//! - Client helpers for the write and read endpoints
//!
//! ## Usage
//!
//! ```rust,no_run
//! use secretshare_test::TestServer;
//!
//! # async fn run(router: axum::Router) {
//! let server = TestServer::serve(router).await.unwrap();
//! let client = server.client();
//!
//! let id = client.write_secret("hello", "k1", Some("1h")).await.unwrap();
//! assert_eq!(client.read_secret(&id, "k1").await.unwrap(), "hello");
//! # }
//! ```

pub mod client;
pub mod server;

pub use client::{ClientError, SecretShareClient};
pub use server::{TestError, TestServer};

/// Timeout for waiting on the server
pub const STARTUP_TIMEOUT_SECS: u64 = 10;
