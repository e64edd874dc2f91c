//! Client session layer for the storefront.
//!
//! This crate manages the user's authentication token and everything that
//! depends on it:
//! - `auth`: the session store and its persistence
//! - `api`: the HTTP client and its request/response interceptors
//! - `router`: routes and the navigation guard
//! - `notify`: user-visible notifications
//!
//! `Storefront::open` wires them together in the order they depend on each
//! other: persistence is loaded before anything else can see the session.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;
pub mod router;

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use api::ApiClient;
use auth::{SessionPersistence, SessionStore};
use config::Config;
use notify::Notifier;
use router::{Navigator, RouteTable};

/// The session store, navigator and API client sharing one session.
#[derive(Clone)]
pub struct Storefront {
    pub session: SessionStore,
    pub navigator: Navigator,
    pub api: ApiClient,
}

impl Storefront {
    /// Build everything from configuration.
    pub fn open(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        Self::with_persistence(
            config.persistence()?,
            &config.api_base_url(),
            config,
            notifier,
        )
    }

    pub fn with_persistence<P>(
        persistence: P,
        base_url: &str,
        config: &Config,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self>
    where
        P: SessionPersistence + 'static,
    {
        let session = SessionStore::open(persistence, notifier);
        let navigator = Navigator::new(RouteTable::default(), session.clone());
        let api = ApiClient::with_timeout(
            base_url,
            config.request_timeout(),
            session.clone(),
            navigator.clone(),
        )?;
        debug!(base_url, logged_in = session.is_logged_in(), "Storefront ready");

        Ok(Self {
            session,
            navigator,
            api,
        })
    }
}
