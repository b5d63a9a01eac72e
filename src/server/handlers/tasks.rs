//! Task endpoints

use anyhow::anyhow;
use axum::http::Method;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::core::error::ApiError;
use crate::core::policy;
use crate::core::query::{Pagination, TaskFilters};
use crate::core::validation::ValidationRule;
use crate::models::{Task, TaskPriority, TaskStatus, TaskUpdate};
use crate::server::pipeline::{Endpoint, RequestParts};
use crate::server::response::Reply;

fn parse_id(parts: &RequestParts) -> anyhow::Result<Uuid> {
    Uuid::parse_str(parts.str_field("id")).map_err(|_| anyhow!("Task not found"))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn is_rfc3339(value: &Value) -> bool {
    value.as_str().is_some_and(|s| parse_date(s).is_some())
}

fn body_rules() -> Vec<ValidationRule> {
    vec![
        ValidationRule::new("description").text().max_length(2_000),
        ValidationRule::new("status").text().one_of(TaskStatus::all()),
        ValidationRule::new("priority")
            .text()
            .one_of(TaskPriority::all()),
        ValidationRule::new("assigned_to").uuid(),
        ValidationRule::new("due_date")
            .text()
            .custom(is_rfc3339)
            .message("due_date must be an RFC 3339 timestamp"),
    ]
}

/// POST /tasks
///
/// Any authenticated caller may create tasks they own; handing the task to
/// someone at creation time is assignment and stays admin-only.
pub fn create_task() -> Endpoint {
    let mut rules = vec![
        ValidationRule::new("title")
            .required()
            .text()
            .min_length(1)
            .max_length(200),
    ];
    rules.extend(body_rules());

    Endpoint::builder([Method::POST])
        .rules(rules)
        .handler(|state, ctx, parts| async move {
            let caller = ctx.require_identity()?;
            let mut task = Task::new(parts.str_field("title").to_string(), caller.id);
            task.description = parts.opt_str_field("description").map(str::to_string);
            if let Some(status) = parts.opt_str_field("status").and_then(TaskStatus::parse) {
                task.status = status;
            }
            if let Some(priority) = parts.opt_str_field("priority").and_then(TaskPriority::parse)
            {
                task.priority = priority;
            }
            if let Some(raw) = parts.opt_str_field("assigned_to") {
                policy::can_assign_task(&ctx).into_result()?;
                task.assigned_to = Uuid::parse_str(raw).ok();
            }
            task.due_date = parts.opt_str_field("due_date").and_then(parse_date);

            let created = state.tasks.create(task).await?;
            tracing::info!(task = %created.id, creator = %caller.id, "task created");
            Ok(Reply::created(json!(created), "Task created successfully"))
        })
}

/// GET /tasks: filtered, paginated, role-scoped listing
pub fn list_tasks() -> Endpoint {
    Endpoint::builder([Method::GET]).handler(|state, ctx, parts| async move {
        let caller = ctx.require_identity()?;
        let filters = TaskFilters::from_query(&parts.query)?;
        let pagination = Pagination::from_query(&parts.query)?;
        let page = state
            .visibility
            .list_tasks(caller, filters, pagination)
            .await?;
        Ok(Reply::ok(json!(page.items), "Tasks retrieved successfully").with_meta(page.meta))
    })
}

/// GET /tasks/{id}: admins, the creator, or the assignee
pub fn get_task() -> Endpoint {
    Endpoint::builder([Method::GET])
        .rules(vec![ValidationRule::new("id").required().uuid()])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            let task = state
                .tasks
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Task not found"))?;
            policy::can_read_task(&ctx, &task).into_result()?;
            Ok(Reply::ok(json!(task), "Task retrieved successfully"))
        })
}

/// PUT/PATCH /tasks/{id}: admins or the creator
pub fn update_task() -> Endpoint {
    let mut rules = vec![
        ValidationRule::new("id").required().uuid(),
        ValidationRule::new("title").text().min_length(1).max_length(200),
    ];
    rules.extend(body_rules());

    Endpoint::builder([Method::PUT, Method::PATCH])
        .rules(rules)
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            let task = state
                .tasks
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Task not found"))?;
            policy::can_modify_task(&ctx, &task).into_result()?;

            let mut changes = TaskUpdate {
                title: parts.opt_str_field("title").map(str::to_string),
                description: parts
                    .opt_str_field("description")
                    .map(|d| Some(d.to_string())),
                status: parts.opt_str_field("status").and_then(TaskStatus::parse),
                priority: parts.opt_str_field("priority").and_then(TaskPriority::parse),
                ..TaskUpdate::default()
            };
            if let Some(raw) = parts.opt_str_field("assigned_to") {
                policy::can_assign_task(&ctx).into_result()?;
                changes.assigned_to = Uuid::parse_str(raw).ok().map(Some);
            }
            if let Some(raw) = parts.opt_str_field("due_date") {
                changes.due_date = parse_date(raw).map(Some);
            }

            let updated = state.tasks.update(&id, changes).await?;
            Ok(Reply::ok(json!(updated), "Task updated successfully"))
        })
}

/// DELETE /tasks/{id}: admins or the creator
pub fn delete_task() -> Endpoint {
    Endpoint::builder([Method::DELETE])
        .rules(vec![ValidationRule::new("id").required().uuid()])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            let task = state
                .tasks
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Task not found"))?;
            policy::can_modify_task(&ctx, &task).into_result()?;
            state.tasks.delete(&id).await?;
            tracing::info!(task = %id, "task deleted");
            Ok(Reply::ok(Value::Null, "Task deleted successfully"))
        })
}

/// PATCH /tasks/{id}/assign: admin-only reassignment
pub fn assign_task() -> Endpoint {
    Endpoint::builder([Method::PATCH])
        .rules(vec![
            ValidationRule::new("id").required().uuid(),
            ValidationRule::new("assigned_to").required().uuid(),
        ])
        .handler(|state, ctx, parts| async move {
            let id = parse_id(&parts)?;
            let task = state
                .tasks
                .get(&id)
                .await?
                .ok_or_else(|| anyhow!("Task not found"))?;
            policy::can_assign_task(&ctx).into_result()?;

            let assignee = Uuid::parse_str(parts.str_field("assigned_to")).map_err(|_| {
                anyhow::Error::new(ApiError::validation("assigned_to must be a valid UUID"))
            })?;
            // assignment targets must at least exist as profiles
            if state.profiles.get(&assignee).await?.is_none() {
                return Err(anyhow!("User not found"));
            }

            let changes = TaskUpdate {
                assigned_to: Some(Some(assignee)),
                ..TaskUpdate::default()
            };
            let updated = state.tasks.update(&id, changes).await?;
            tracing::info!(task = %task.id, assignee = %assignee, "task assigned");
            Ok(Reply::ok(json!(updated), "Task assigned successfully"))
        })
}
