//! Role- and ownership-based access policy
//!
//! Every rule is a pure function from (caller, target) to an
//! [`AccessDecision`], except the last-administrator check, which must
//! consult the live admin count. Decisions are computed fresh per request
//! and never persisted.

use std::time::Duration;

use anyhow::{Result, anyhow};
use uuid::Uuid;

use crate::core::auth::AuthContext;
use crate::core::error::ApiError;
use crate::models::{Role, Task, User};
use crate::services::ProfileStore;

/// Denial message for the last-administrator invariant; the exact wording is
/// part of the error-classification contract.
pub const LAST_ADMIN_MESSAGE: &str =
    "Cannot remove admin role from the last administrator in the system";

/// Outcome of a policy check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert a denial into the 403 the pipeline emits
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.allowed {
            Ok(())
        } else {
            Err(ApiError::Forbidden(self.reason.unwrap_or_else(|| {
                "You don't have permission to perform this action".to_string()
            })))
        }
    }
}

/// Gate an endpoint on the caller holding one of `roles`
///
/// This is the pipeline's authorization stage for collection-level rules
/// (user listing, role administration); ownership rules below need the
/// target resource and run inside handlers.
pub fn check_required_roles(ctx: &AuthContext, roles: &[Role]) -> AccessDecision {
    match ctx.identity() {
        Some(identity) if roles.contains(&identity.role) => AccessDecision::allow(),
        _ if matches!(roles, [Role::Admin]) => {
            AccessDecision::deny("Only administrators can access this resource")
        }
        _ => AccessDecision::deny("You don't have permission to access this resource"),
    }
}

/// Read/update/delete of a user profile: the profile owner or an admin
pub fn can_access_user(ctx: &AuthContext, target_id: &Uuid) -> AccessDecision {
    if ctx.is_admin() || ctx.user_id().as_ref() == Some(target_id) {
        AccessDecision::allow()
    } else {
        AccessDecision::deny("You don't have permission to access this user")
    }
}

/// Role actually stored for a newly created user
///
/// Anonymous and user-role callers always get `user`, whatever they asked
/// for; only admins may set the requested role.
pub fn effective_new_user_role(ctx: &AuthContext, requested: Option<Role>) -> Role {
    if ctx.is_admin() {
        requested.unwrap_or(Role::User)
    } else {
        Role::User
    }
}

/// The last-administrator invariant, checked against a live admin count
///
/// Demoting an admin to `user` is denied when they are the only admin left.
/// The count is read at decision time, never from a cache; the store's
/// `update_role` re-checks under its own lock, so this decision is advisory
/// and the store check is the invariant of record.
pub async fn check_role_change(
    store: &dyn ProfileStore,
    target: &User,
    new_role: Role,
    count_timeout: Duration,
) -> Result<AccessDecision> {
    if target.role == Role::Admin && new_role == Role::User {
        let admins = tokio::time::timeout(count_timeout, store.count_admins())
            .await
            .map_err(|_| anyhow!("Admin count query timed out"))??;
        if admins <= 1 {
            return Ok(AccessDecision::deny(LAST_ADMIN_MESSAGE));
        }
    }
    Ok(AccessDecision::allow())
}

/// Reading a task: admins, the creator, or the assignee
pub fn can_read_task(ctx: &AuthContext, task: &Task) -> AccessDecision {
    if ctx.is_admin() {
        return AccessDecision::allow();
    }
    match ctx.user_id() {
        Some(caller) if task.involves(&caller) => AccessDecision::allow(),
        _ => AccessDecision::deny("You don't have permission to view this task"),
    }
}

/// Updating or deleting a task: admins or the creator (assignees may look,
/// not touch)
pub fn can_modify_task(ctx: &AuthContext, task: &Task) -> AccessDecision {
    if ctx.is_admin() {
        return AccessDecision::allow();
    }
    match ctx.user_id() {
        Some(caller) if task.created_by == caller => AccessDecision::allow(),
        _ => AccessDecision::deny("You don't have permission to modify this task"),
    }
}

/// Assigning tasks is admin-only
pub fn can_assign_task(ctx: &AuthContext) -> AccessDecision {
    if ctx.is_admin() {
        AccessDecision::allow()
    } else {
        AccessDecision::deny("Only administrators can assign tasks")
    }
}
