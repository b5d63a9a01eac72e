//! User endpoints
//!
//! Each function builds one pipeline instance; the handlers themselves only
//! contain business logic and raise plain descriptive failures.

use anyhow::anyhow;
use axum::http::Method;
use serde_json::json;
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::policy;
use crate::core::query::{Pagination, PaginationMeta};
use crate::core::validation::ValidationRule;
use crate::models::{Role, User, UserUpdate};
use crate::server::pipeline::{Endpoint, RequestParts};
use crate::server::response::Reply;

fn parse_id(parts: &RequestParts) -> anyhow::Result<Uuid> {
    Uuid::parse_str(parts.str_field("id")).map_err(|_| anyhow!("User not found"))
}

/// POST /users: self-registration or admin-driven creation
///
/// Anonymous and user-role callers always end up with the `user` role,
/// whatever the body requested; only admins may choose.
pub fn create_user() -> Endpoint {
    Endpoint::builder([Method::POST])
        .allow_anonymous()
        .rules(vec![
            ValidationRule::new("email").required().email().max_length(254),
            ValidationRule::new("name")
                .required()
                .text()
                .min_length(1)
                .max_length(100),
            ValidationRule::new("role")
                .text()
                .one_of(&["admin", "user"]),
        ])
        .handler(|state, ctx, parts| async move {
            let requested = parts.opt_str_field("role").and_then(Role::parse);
            let role = policy::effective_new_user_role(&ctx, requested);
            let user = User::new(
                parts.str_field("email").to_string(),
                parts.str_field("name").to_string(),
                role,
            );
            let created = state.profiles.create(user).await?;
            tracing::info!(user = %created.id, role = %created.role, "user created");
            Ok(Reply::created(json!(created), "User created successfully"))
        })
}

/// GET /users: paginated listing, admin-only
pub fn list_users() -> Endpoint {
    Endpoint::builder([Method::GET])
        .require_roles([Role::Admin])
        .handler(|state, _ctx, parts| async move {
            let pagination = Pagination::from_query(&parts.query)?;
            let (users, total) = state
                .profiles
                .list(pagination.skip(), pagination.limit)
                .await?;
            let meta = PaginationMeta::new(pagination.page, pagination.limit, total);
            Ok(Reply::ok(json!(users), "Users retrieved successfully").with_meta(meta))
        })
}

/// GET /users/{id}: the profile owner or an admin
pub fn get_user() -> Endpoint {
    Endpoint::builder([Method::GET])
        .rules(vec![ValidationRule::new("id").required().uuid()])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            policy::can_access_user(&ctx, &id).into_result()?;
            let user = state
                .profiles
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("User not found"))?;
            Ok(Reply::ok(json!(user), "User retrieved successfully"))
        })
}

/// PUT/PATCH /users/{id}: profile fields only; roles change elsewhere
pub fn update_user() -> Endpoint {
    Endpoint::builder([Method::PUT, Method::PATCH])
        .rules(vec![
            ValidationRule::new("id").required().uuid(),
            ValidationRule::new("email").email().max_length(254),
            ValidationRule::new("name").text().min_length(1).max_length(100),
        ])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            policy::can_access_user(&ctx, &id).into_result()?;
            let changes = UserUpdate {
                email: parts.opt_str_field("email").map(str::to_string),
                name: parts.opt_str_field("name").map(str::to_string),
            };
            let updated = state.profiles.update(&id, changes).await?;
            Ok(Reply::ok(json!(updated), "User updated successfully"))
        })
}

/// DELETE /users/{id}: the profile owner or an admin
pub fn delete_user() -> Endpoint {
    Endpoint::builder([Method::DELETE])
        .rules(vec![ValidationRule::new("id").required().uuid()])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            policy::can_access_user(&ctx, &id).into_result()?;
            state.profiles.delete(&id).await?;
            tracing::info!(user = %id, "user deleted");
            Ok(Reply::ok(serde_json::Value::Null, "User deleted successfully"))
        })
}

/// PATCH /users/{id}/role: admin-only, guarded by the last-admin invariant
pub fn change_role() -> Endpoint {
    Endpoint::builder([Method::PATCH])
        .require_roles([Role::Admin])
        .rules(vec![
            ValidationRule::new("id").required().uuid(),
            ValidationRule::new("role")
                .required()
                .text()
                .one_of(&["admin", "user"]),
        ])
        .handler(|state, _ctx, parts| async move {
            let id = parse_id(&parts)?;
            let new_role = Role::parse(parts.str_field("role")).ok_or_else(|| {
                anyhow::Error::new(ApiError::validation("role must be one of: admin, user"))
            })?;
            let target = state
                .profiles
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("User not found"))?;

            // Advisory check against the live count; the store re-checks
            // under its own lock when applying the change.
            policy::check_role_change(
                state.profiles.as_ref(),
                &target,
                new_role,
                state.config.admin_count_timeout(),
            )
            .await?
            .into_result()?;

            let updated = state.profiles.update_role(&id, new_role).await?;
            tracing::info!(user = %id, role = %new_role, "role changed");
            Ok(Reply::ok(json!(updated), "User role updated successfully"))
        })
}
