//! HTTP API for SecretShare
//!
//! - `/write` (any method): store a secret, respond with its id
//! - `/read` (GET): return a secret's message once, then delete it
//! - `/health` (GET): liveness and store backend

pub mod handlers;
pub mod repository;
pub mod router;
pub mod service;

pub use repository::{key_schema, SecretRepository};
pub use router::create_router;
pub use service::SecretService;
