//! Caller identity resolution
//!
//! [`AuthResolver`] turns the `Authorization` header of an incoming request
//! into an [`AuthContext`]: either a verified identity or an explicit
//! anonymous context for endpoints that accept unauthenticated callers.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use uuid::Uuid;

use crate::core::cache::TtlCache;
use crate::core::error::ApiError;
use crate::models::Role;
use crate::services::{IdentityVerifier, ProfileStore};

/// Verified principal attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Authorization context produced per request; immutable once created
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No credential presented (public access)
    Anonymous,

    /// Verified caller
    Authenticated(Identity),
}

impl AuthContext {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthContext::Authenticated(_))
    }

    /// The caller's identity, if authenticated
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthContext::Authenticated(identity) => Some(identity),
            AuthContext::Anonymous => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            AuthContext::Authenticated(Identity {
                role: Role::Admin,
                ..
            })
        )
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.identity().map(|i| i.id)
    }

    /// The caller's identity, or a 401 for anonymous contexts
    ///
    /// Handlers on auth-required endpoints use this instead of unwrapping.
    pub fn require_identity(&self) -> Result<&Identity, ApiError> {
        self.identity()
            .ok_or_else(|| ApiError::Unauthenticated("Authentication required".to_string()))
    }
}

/// Extract the token from a `Authorization: Bearer <token>` header
///
/// Missing header, non-UTF-8 value, wrong scheme and empty token all count
/// as "no credential".
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Resolves bearer credentials into verified identities
///
/// Performs exactly one identity-provider call per uncached token, under a
/// caller-imposed timeout, with no retries. Verified identities are held in
/// a TTL cache keyed by token to spare repeated verification and profile
/// lookups across in-flight requests.
pub struct AuthResolver {
    verifier: Arc<dyn IdentityVerifier>,
    profiles: Arc<dyn ProfileStore>,
    cache: TtlCache<String, Identity>,
    verify_timeout: Duration,
}

impl AuthResolver {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        profiles: Arc<dyn ProfileStore>,
        cache_ttl: Duration,
        verify_timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            profiles,
            cache: TtlCache::new(cache_ttl),
            verify_timeout,
        }
    }

    /// Resolve the caller for a request
    ///
    /// With `required = false` a missing credential resolves to
    /// [`AuthContext::Anonymous`]; an invalid credential is still a 401
    /// whenever one is presented.
    pub async fn resolve(
        &self,
        headers: &HeaderMap,
        required: bool,
    ) -> Result<AuthContext, ApiError> {
        let Some(token) = extract_bearer(headers) else {
            if required {
                return Err(ApiError::Unauthenticated(
                    "Authentication required".to_string(),
                ));
            }
            return Ok(AuthContext::Anonymous);
        };

        if let Some(identity) = self.cache.get(&token.to_string()) {
            return Ok(AuthContext::Authenticated(identity));
        }

        let verified = tokio::time::timeout(
            self.verify_timeout,
            self.verifier.verify_token(token),
        )
        .await
        .map_err(|_| {
            tracing::warn!("identity verification timed out");
            ApiError::Datastore("Identity verification timed out".to_string())
        })?
        .map_err(|e| {
            tracing::warn!(error = %e, "identity provider call failed");
            ApiError::UpstreamAuth(format!("identity provider error: {}", e))
        })?;

        let Some(claims) = verified else {
            return Err(ApiError::Unauthenticated(
                "Invalid or expired token".to_string(),
            ));
        };

        // The profile store may lag behind the identity provider; try the
        // verified id, then the verified email, then degrade to a minimal
        // identity built from the token claims.
        let profile = match self.profiles.get(&claims.id).await {
            Ok(Some(profile)) => Some(profile),
            Ok(None) => self.profiles.find_by_email(&claims.email).await.map_err(|e| {
                tracing::error!(error = %e, "profile lookup failed");
                ApiError::Datastore("Failed to load caller profile".to_string())
            })?,
            Err(e) => {
                tracing::error!(error = %e, "profile lookup failed");
                return Err(ApiError::Datastore(
                    "Failed to load caller profile".to_string(),
                ));
            }
        };
        let identity = match profile {
            Some(profile) => Identity {
                id: profile.id,
                email: profile.email,
                role: profile.role,
            },
            None => {
                tracing::debug!(user = %claims.id, "no local profile; using token claims");
                Identity {
                    id: claims.id,
                    email: claims.email,
                    role: Role::User,
                }
            }
        };

        self.cache.insert(token.to_string(), identity.clone());
        Ok(AuthContext::Authenticated(identity))
    }
}
