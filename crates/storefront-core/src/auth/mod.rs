//! Authentication module for managing the client session.
//!
//! This module provides:
//! - `SessionStore`: the token/profile state machine driven by login and logout
//! - `SessionPersistence`: durable storage for the session record, with file,
//!   OS keychain and in-memory implementations
//!
//! The store rehydrates from persistence when opened and saves after every
//! transition.

pub mod keyring_store;
pub mod persistence;
pub mod session;

pub use keyring_store::KeyringStore;
pub use persistence::{FileStore, MemoryStore, SessionPersistence, STORAGE_KEY};
pub use session::{Authenticator, SessionData, SessionState, SessionStore};
