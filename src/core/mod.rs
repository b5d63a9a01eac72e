//! Core request-pipeline machinery: identity resolution, access policy,
//! validation, error taxonomy, visibility scoping and caching

pub mod auth;
pub mod cache;
pub mod error;
pub mod policy;
pub mod query;
pub mod validation;

pub use auth::{AuthContext, AuthResolver, Identity};
pub use cache::TtlCache;
pub use error::ApiError;
pub use policy::AccessDecision;
pub use query::{Pagination, PaginationMeta, TaskFilters, TaskPage, TaskQuery, VisibilityResolver};
pub use validation::{FieldType, ValidationRule, validate};
