//! In-memory implementations of the collaborator contracts, for development
//! and testing. Thread-safe via `RwLock`.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::core::policy::LAST_ADMIN_MESSAGE;
use crate::core::query::TaskQuery;
use crate::models::{Role, Task, TaskUpdate, User, UserUpdate};
use crate::services::{IdentityVerifier, ProfileStore, TaskStore, TokenClaims};

/// In-memory profile store
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn create(&self, user: User) -> Result<User> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let taken = users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email));
        if taken {
            return Err(anyhow!("A user with email '{}' already exists", user.email));
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list(&self, skip: usize, take: usize) -> Result<(Vec<User>, usize)> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = all.len();
        let page = all.into_iter().skip(skip).take(take).collect();
        Ok((page, total))
    }

    async fn update(&self, id: &Uuid, changes: UserUpdate) -> Result<User> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        if let Some(email) = &changes.email {
            let taken = users
                .values()
                .any(|u| u.id != *id && u.email.eq_ignore_ascii_case(email));
            if taken {
                return Err(anyhow!("A user with email '{}' already exists", email));
            }
        }

        let user = users.get_mut(id).ok_or_else(|| anyhow!("User not found"))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("User not found"))
    }

    async fn count_admins(&self) -> Result<usize> {
        let users = self
            .users
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(users.values().filter(|u| u.role == Role::Admin).count())
    }

    async fn update_role(&self, id: &Uuid, role: Role) -> Result<User> {
        // Count check and mutation share one write lock so concurrent
        // demotions cannot both observe the same stale count.
        let mut users = self
            .users
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let current = users
            .get(id)
            .ok_or_else(|| anyhow!("User not found"))?
            .role;

        if current == Role::Admin && role == Role::User {
            let admins = users.values().filter(|u| u.role == Role::Admin).count();
            if admins <= 1 {
                return Err(anyhow!(LAST_ADMIN_MESSAGE));
            }
        }

        let user = users.get_mut(id).ok_or_else(|| anyhow!("User not found"))?;
        user.role = role;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

/// In-memory task store
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Task>> {
        let tasks = self
            .tasks
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tasks.get(id).cloned())
    }

    async fn update(&self, id: &Uuid, changes: TaskUpdate) -> Result<Task> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let task = tasks.get_mut(id).ok_or_else(|| anyhow!("Task not found"))?;
        if let Some(title) = changes.title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        if let Some(assigned_to) = changes.assigned_to {
            task.assigned_to = assigned_to;
        }
        if let Some(due_date) = changes.due_date {
            task.due_date = due_date;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        let mut tasks = self
            .tasks
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        tasks
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| anyhow!("Task not found"))
    }

    async fn query(&self, query: &TaskQuery) -> Result<(Vec<Task>, usize)> {
        let tasks = self
            .tasks
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        let mut matched: Vec<Task> = tasks.values().filter(|t| query.matches(t)).cloned().collect();
        // Stable order keeps pagination deterministic across pages
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = matched.len();
        let page = matched
            .into_iter()
            .skip(query.skip)
            .take(query.take)
            .collect();
        Ok((page, total))
    }
}

/// Identity verifier backed by a fixed token table
///
/// Stands in for the external identity provider in development and tests.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: Arc<RwLock<HashMap<String, TokenClaims>>>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `token` verify as `claims`
    pub fn register(&self, token: impl Into<String>, claims: TokenClaims) {
        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(token.into(), claims);
        }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify_token(&self, token: &str) -> Result<Option<TokenClaims>> {
        let tokens = self
            .tokens
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(tokens.get(token).cloned())
    }
}
