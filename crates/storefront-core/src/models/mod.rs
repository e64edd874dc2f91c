//! Data models for the storefront API.
//!
//! This module contains the wire types exchanged with the backend:
//! - `ApiEnvelope`: the `{ code, message, data }` wrapper every endpoint returns
//! - Auth payloads: login, registration and token refresh
//! - `Profile`: the user snapshot kept in the session
//! - Product listings and details

pub mod auth;
pub mod envelope;
pub mod product;
pub mod profile;

mod de;

pub use auth::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest, RegisterResponse,
};
pub use envelope::{ApiEnvelope, SUCCESS_CODE};
pub use product::{Page, ProductDetail, ProductPublic, ProductQuery};
pub use profile::Profile;
