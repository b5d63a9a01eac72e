//! Collaborator contracts consumed by the pipeline
//!
//! These traits are the system's external seams: identity-provider session
//! verification, the local profile store, and the task store. The pipeline
//! is agnostic to the implementations behind them; in-memory versions live
//! in [`crate::storage`].

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::core::query::TaskQuery;
use crate::models::{Role, Task, TaskUpdate, User, UserUpdate};

/// Claims returned by the identity provider for a verified session token
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub id: Uuid,
    pub email: String,
    pub email_verified: bool,
}

/// Identity-provider session verification
///
/// `Ok(None)` means the token is invalid or expired; `Err` means the
/// provider itself failed.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<Option<TokenClaims>>;
}

/// Local profile store
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Persist a new profile; fails if the email is already taken
    async fn create(&self, user: User) -> Result<User>;

    /// Load a profile by id
    async fn get(&self, id: &Uuid) -> Result<Option<User>>;

    /// Load a profile by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Page through profiles ordered by creation time (newest first);
    /// returns the page plus the total count
    async fn list(&self, skip: usize, take: usize) -> Result<(Vec<User>, usize)>;

    /// Apply field changes to a profile
    async fn update(&self, id: &Uuid, changes: UserUpdate) -> Result<User>;

    /// Remove a profile
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Live count of admin-role profiles; consulted at role-change decision
    /// time and never cached
    async fn count_admins(&self) -> Result<usize>;

    /// Change a profile's role
    ///
    /// Implementations must perform the last-admin count check and the
    /// mutation inside one critical section, so concurrent demotions cannot
    /// both observe a stale count.
    async fn update_role(&self, id: &Uuid, role: Role) -> Result<User>;
}

/// Task store
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task>;

    async fn get(&self, id: &Uuid) -> Result<Option<Task>>;

    async fn update(&self, id: &Uuid, changes: TaskUpdate) -> Result<Task>;

    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// Run a filtered, scoped, paginated query; ordering is stable
    /// (`created_at` descending, id as tiebreak). Returns the page plus the
    /// total matching count.
    async fn query(&self, query: &TaskQuery) -> Result<(Vec<Task>, usize)>;
}
