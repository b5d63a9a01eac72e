//! Shared application state
//!
//! One explicit dependency container built at startup and handed to every
//! pipeline instance by reference; no ambient globals.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::auth::AuthResolver;
use crate::core::query::VisibilityResolver;
use crate::services::{IdentityVerifier, ProfileStore, TaskStore};

/// Collaborators and pipeline machinery shared by all endpoints
pub struct AppState {
    pub config: AppConfig,
    pub profiles: Arc<dyn ProfileStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub auth: AuthResolver,
    pub visibility: VisibilityResolver,
}

impl AppState {
    /// Wire the resolvers from injected collaborators
    pub fn new(
        config: AppConfig,
        verifier: Arc<dyn IdentityVerifier>,
        profiles: Arc<dyn ProfileStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        let auth = AuthResolver::new(
            verifier,
            profiles.clone(),
            config.identity_cache_ttl(),
            config.verify_timeout(),
        );
        let visibility = VisibilityResolver::new(tasks.clone());
        Self {
            config,
            profiles,
            tasks,
            auth,
            visibility,
        }
    }
}
