//! Core types for SecretShare
//!
//! This crate holds the data model and error taxonomy shared by the store
//! and the HTTP handlers. It performs no I/O.

pub mod clock;
pub mod duration;
pub mod error;
pub mod request_id;
pub mod secret;

pub use clock::{Clock, ManualClock, SystemClock};
pub use duration::{ActiveDuration, UnknownDuration};
pub use error::{ErrorCode, ShareError, INTERNAL_ERROR_MESSAGE, SECRET_UNAVAILABLE_MESSAGE};
pub use request_id::RequestId;
pub use secret::{NewSecret, Secret};
