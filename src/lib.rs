//! # taskdeck
//!
//! A task and user management backend built around one reusable request
//! pipeline: bearer-credential resolution, declarative input validation,
//! role- and ownership-based authorization, role-scoped task visibility and
//! a stable client-facing error taxonomy.
//!
//! ## Architecture
//!
//! - **Pipeline**: every endpoint is an [`server::Endpoint`] composing
//!   method check → auth → validation → role gate → business handler, with
//!   failures classified exactly once at the boundary.
//! - **Collaborators**: identity verification and persistence are consumed
//!   through the [`services`] traits; in-memory implementations ship in
//!   [`storage`].
//! - **Invariants**: the system never reaches zero administrators, and a
//!   non-admin's task listing never includes a task they neither created
//!   nor were assigned.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskdeck::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     init_tracing();
//!     ServerBuilder::new()
//!         .with_config(AppConfig::from_yaml_file("taskdeck.yaml")?)
//!         .with_identity_verifier(my_verifier)
//!         .with_profile_store(my_profile_store)
//!         .with_task_store(my_task_store)
//!         .serve("127.0.0.1:3000")
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod models;
pub mod server;
pub mod services;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        auth::{AuthContext, AuthResolver, Identity},
        error::ApiError,
        policy::AccessDecision,
        query::{Pagination, PaginationMeta, TaskFilters, TaskPage, VisibilityResolver},
        validation::{ValidationRule, validate},
    };

    // === Models ===
    pub use crate::models::{Role, Task, TaskPriority, TaskStatus, User};

    // === Services ===
    pub use crate::services::{IdentityVerifier, ProfileStore, TaskStore, TokenClaims};

    // === Storage ===
    pub use crate::storage::{InMemoryProfileStore, InMemoryTaskStore, StaticTokenVerifier};

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{Endpoint, Reply, ServerBuilder, init_tracing};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use uuid::Uuid;
}
