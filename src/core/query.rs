//! Pagination, task filters and the role-scoped visibility resolver

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::core::auth::Identity;
use crate::core::error::ApiError;
use crate::models::{Role, Task, TaskPriority, TaskStatus};
use crate::services::TaskStore;

/// Default page size when the caller does not specify one
pub const DEFAULT_LIMIT: usize = 10;
/// Hard cap on page size
pub const MAX_LIMIT: usize = 100;

/// Validated pagination parameters
///
/// Out-of-range values are a validation error, never silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Parse `page`/`limit` from query parameters, enforcing `page ≥ 1` and
    /// `1 ≤ limit ≤ 100`
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let page = match query.get("page") {
            None => 1,
            Some(raw) => match raw.parse::<usize>() {
                Ok(page) if page >= 1 => page,
                _ => {
                    return Err(ApiError::validation("page must be a positive integer"));
                }
            },
        };
        let limit = match query.get("limit") {
            None => DEFAULT_LIMIT,
            Some(raw) => match raw.parse::<usize>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
                _ => {
                    return Err(ApiError::validation(format!(
                        "limit must be between 1 and {}",
                        MAX_LIMIT
                    )));
                }
            },
        };
        Ok(Self { page, limit })
    }

    /// Offset of the first item on this page
    pub fn skip(&self) -> usize {
        (self.page - 1) * self.limit
    }
}

/// Pagination metadata attached to list responses
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PaginationMeta {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Compute metadata for a page over `total` items
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Explicit task-list filters requested by the caller
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
}

impl TaskFilters {
    /// Parse filters from query parameters; unknown values are a validation
    /// error
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, ApiError> {
        let mut filters = Self::default();
        if let Some(raw) = query.get("status") {
            filters.status = Some(TaskStatus::parse(raw).ok_or_else(|| {
                ApiError::validation(format!(
                    "status must be one of: {}",
                    TaskStatus::all().join(", ")
                ))
            })?);
        }
        if let Some(raw) = query.get("priority") {
            filters.priority = Some(TaskPriority::parse(raw).ok_or_else(|| {
                ApiError::validation(format!(
                    "priority must be one of: {}",
                    TaskPriority::all().join(", ")
                ))
            })?);
        }
        filters.assigned_to = parse_uuid_param(query, "assigned_to")?;
        filters.created_by = parse_uuid_param(query, "created_by")?;
        filters.due_from = parse_date_param(query, "due_from")?;
        filters.due_to = parse_date_param(query, "due_to")?;
        Ok(filters)
    }

    /// Whether `task` satisfies every requested filter
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|s| task.status == s)
            && self.priority.is_none_or(|p| task.priority == p)
            && self
                .assigned_to
                .is_none_or(|id| task.assigned_to == Some(id))
            && self.created_by.is_none_or(|id| task.created_by == id)
            && self
                .due_from
                .is_none_or(|from| task.due_date.is_some_and(|d| d >= from))
            && self
                .due_to
                .is_none_or(|to| task.due_date.is_some_and(|d| d <= to))
    }
}

fn parse_uuid_param(
    query: &HashMap<String, String>,
    name: &str,
) -> Result<Option<Uuid>, ApiError> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{} must be a valid UUID", name))),
    }
}

fn parse_date_param(
    query: &HashMap<String, String>,
    name: &str,
) -> Result<Option<DateTime<Utc>>, ApiError> {
    match query.get(name) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| {
                ApiError::validation(format!("{} must be an RFC 3339 timestamp", name))
            }),
    }
}

/// Complete query handed to the task store: explicit filters, mandatory
/// visibility scope, and the page window
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub filters: TaskFilters,
    /// When set, only tasks created by or assigned to this user match.
    /// ANDed with the explicit filters, never widened by them.
    pub visible_to: Option<Uuid>,
    pub skip: usize,
    pub take: usize,
}

impl TaskQuery {
    /// Whether `task` is both filter-matched and inside the caller's scope
    pub fn matches(&self, task: &Task) -> bool {
        let in_scope = self.visible_to.is_none_or(|caller| task.involves(&caller));
        in_scope && self.filters.matches(task)
    }
}

/// One page of tasks plus its metadata
#[derive(Debug, Serialize)]
pub struct TaskPage {
    pub items: Vec<Task>,
    #[serde(flatten)]
    pub meta: PaginationMeta,
}

/// Computes the role-scoped view of the task collection
///
/// Admins see whatever their filters select; everyone else is confined to
/// tasks they created or are assigned to, regardless of the filters they
/// request.
#[derive(Clone)]
pub struct VisibilityResolver {
    tasks: Arc<dyn TaskStore>,
}

impl VisibilityResolver {
    pub fn new(tasks: Arc<dyn TaskStore>) -> Self {
        Self { tasks }
    }

    /// List tasks visible to `caller` under `filters` and `pagination`
    ///
    /// An out-of-range page returns an empty item list with correct
    /// metadata; it is not an error.
    pub async fn list_tasks(
        &self,
        caller: &Identity,
        filters: TaskFilters,
        pagination: Pagination,
    ) -> Result<TaskPage> {
        let visible_to = match caller.role {
            Role::Admin => None,
            Role::User => Some(caller.id),
        };
        let query = TaskQuery {
            filters,
            visible_to,
            skip: pagination.skip(),
            take: pagination.limit,
        };
        let (items, total) = self.tasks.query(&query).await?;
        tracing::debug!(
            caller = %caller.id,
            scoped = visible_to.is_some(),
            total,
            page = pagination.page,
            "task listing resolved"
        );
        Ok(TaskPage {
            items,
            meta: PaginationMeta::new(pagination.page, pagination.limit, total),
        })
    }
}
