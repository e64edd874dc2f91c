//! REST API client module for the storefront backend.
//!
//! This module provides the `ApiClient` and the interceptor stages it runs
//! every call through:
//! - the request stage attaches `Authorization: Bearer <token>` when logged in
//! - the response stages classify application failures, expired sessions,
//!   permission errors and transport failures
//!
//! Every endpoint answers with an `{ code, message, data }` envelope where
//! code 0 means success.

pub mod client;
pub mod error;
pub mod interceptor;

pub use client::{ApiClient, REQUEST_TIMEOUT_SECS};
pub use error::ApiError;
pub use interceptor::{Classified, Effect};
