//! End-to-end pipeline tests over the HTTP surface
//!
//! Exercises the full stack: router → pipeline stages → handlers → stores,
//! with a static token verifier standing in for the identity provider.

use axum_test::TestServer;
use serde_json::{Value, json};
use std::sync::Arc;

use taskdeck::models::{Role, Task, User};
use taskdeck::server::ServerBuilder;
use taskdeck::services::{ProfileStore, TaskStore, TokenClaims};
use taskdeck::storage::{InMemoryProfileStore, InMemoryTaskStore, StaticTokenVerifier};

struct TestContext {
    server: TestServer,
    admin: User,
    member: User,
    other: User,
    profiles: Arc<InMemoryProfileStore>,
    tasks: Arc<InMemoryTaskStore>,
}

const ADMIN_TOKEN: &str = "admin-token";
const MEMBER_TOKEN: &str = "member-token";
const OTHER_TOKEN: &str = "other-token";

async fn create_test_server() -> TestContext {
    let profiles = Arc::new(InMemoryProfileStore::new());
    let tasks = Arc::new(InMemoryTaskStore::new());
    let verifier = StaticTokenVerifier::new();

    let admin = profiles
        .create(User::new(
            "root@example.com".to_string(),
            "Root".to_string(),
            Role::Admin,
        ))
        .await
        .expect("seed admin");
    let member = profiles
        .create(User::new(
            "member@example.com".to_string(),
            "Member".to_string(),
            Role::User,
        ))
        .await
        .expect("seed member");
    let other = profiles
        .create(User::new(
            "other@example.com".to_string(),
            "Other".to_string(),
            Role::User,
        ))
        .await
        .expect("seed other");

    for (token, user) in [
        (ADMIN_TOKEN, &admin),
        (MEMBER_TOKEN, &member),
        (OTHER_TOKEN, &other),
    ] {
        verifier.register(
            token,
            TokenClaims {
                id: user.id,
                email: user.email.clone(),
                email_verified: true,
            },
        );
    }

    let app = ServerBuilder::new()
        .with_identity_verifier(verifier)
        .with_profile_store((*profiles).clone())
        .with_task_store((*tasks).clone())
        .build()
        .expect("Failed to build app");

    let server = TestServer::try_new(app).expect("Failed to create test server");

    TestContext {
        server,
        admin,
        member,
        other,
        profiles,
        tasks,
    }
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = create_test_server().await;
    let response = ctx.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

// =============================================================================
// Scenario A: anonymous self-registration cannot pick a role
// =============================================================================

#[tokio::test]
async fn test_anonymous_create_user_forces_user_role() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .post("/users")
        .json(&json!({
            "email": "newcomer@example.com",
            "name": "Newcomer",
            "role": "admin"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "user", "requested admin role is ignored");
}

#[tokio::test]
async fn test_member_create_user_cannot_self_elevate() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .post("/users")
        .authorization_bearer(MEMBER_TOKEN)
        .json(&json!({
            "email": "friend@example.com",
            "name": "Friend",
            "role": "admin"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["role"], "user");
}

#[tokio::test]
async fn test_admin_create_user_may_set_admin_role() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .post("/users")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({
            "email": "second-admin@example.com",
            "name": "Second",
            "role": "admin"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .post("/users")
        .json(&json!({
            "email": "member@example.com",
            "name": "Impostor"
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"], "CONFLICT");
    assert!(
        body["message"]
            .as_str()
            .expect("message present")
            .contains("already exists")
    );
}

#[tokio::test]
async fn test_create_user_validation_collects_all_errors() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .post("/users")
        .json(&json!({ "email": "not-an-email" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
    let details = body["details"].as_array().expect("details array");
    assert_eq!(details.len(), 2, "bad email and missing name both reported");
    assert_eq!(body["message"], details[0]);
}

// =============================================================================
// Scenario B: foreign task access
// =============================================================================

#[tokio::test]
async fn test_member_cannot_read_foreign_task() {
    let ctx = create_test_server().await;
    let task = ctx
        .tasks
        .create(Task::new("private work".to_string(), ctx.other.id))
        .await
        .expect("seed task");

    let response = ctx
        .server
        .get(&format!("/tasks/{}", task.id))
        .authorization_bearer(MEMBER_TOKEN)
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(
        body["message"]
            .as_str()
            .expect("message present")
            .contains("You don't have permission")
    );
}

#[tokio::test]
async fn test_admin_can_read_any_task() {
    let ctx = create_test_server().await;
    let task = ctx
        .tasks
        .create(Task::new("private work".to_string(), ctx.other.id))
        .await
        .expect("seed task");

    let response = ctx
        .server
        .get(&format!("/tasks/{}", task.id))
        .authorization_bearer(ADMIN_TOKEN)
        .await;
    response.assert_status_ok();
}

// =============================================================================
// Scenario C: the last-admin invariant
// =============================================================================

#[tokio::test]
async fn test_sole_admin_cannot_demote_self() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .patch(&format!("/users/{}/role", ctx.admin.id))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "role": "user" }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(
        body["message"],
        "Cannot remove admin role from the last administrator in the system"
    );
}

#[tokio::test]
async fn test_rejected_demotion_is_idempotent() {
    let ctx = create_test_server().await;
    for _ in 0..3 {
        let response = ctx
            .server
            .patch(&format!("/users/{}/role", ctx.admin.id))
            .authorization_bearer(ADMIN_TOKEN)
            .json(&json!({ "role": "user" }))
            .await;
        response.assert_status(axum::http::StatusCode::FORBIDDEN);
    }
    // no state change: the admin keeps the role and the count never drops
    let admin = ctx
        .profiles
        .get(&ctx.admin.id)
        .await
        .expect("load")
        .expect("present");
    assert_eq!(admin.role, Role::Admin);
    assert_eq!(ctx.profiles.count_admins().await.expect("count"), 1);
}

#[tokio::test]
async fn test_demotion_succeeds_once_second_admin_exists() {
    let ctx = create_test_server().await;
    // promote a member first, then the original admin can step down
    let response = ctx
        .server
        .patch(&format!("/users/{}/role", ctx.member.id))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "role": "admin" }))
        .await;
    response.assert_status_ok();

    let response = ctx
        .server
        .patch(&format!("/users/{}/role", ctx.admin.id))
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({ "role": "user" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["role"], "user");
    assert_eq!(ctx.profiles.count_admins().await.expect("count"), 1);
}

#[tokio::test]
async fn test_member_cannot_change_roles() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .patch(&format!("/users/{}/role", ctx.other.id))
        .authorization_bearer(MEMBER_TOKEN)
        .json(&json!({ "role": "admin" }))
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
}

// =============================================================================
// Scenario D: pagination bounds are validated, not clamped
// =============================================================================

#[tokio::test]
async fn test_page_zero_is_validation_error() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("page", "0")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_limit_above_hundred_is_validation_error() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("page", "1")
        .add_query_param("limit", "101")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

// =============================================================================
// Scenario E: missing credential never reaches a handler
// =============================================================================

#[tokio::test]
async fn test_missing_authorization_header_is_401() {
    let ctx = create_test_server().await;
    let response = ctx.server.get("/users").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_garbage_token_is_401() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer("forged-token")
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Invalid or expired token");
}

// =============================================================================
// Method handling
// =============================================================================

#[tokio::test]
async fn test_unsupported_method_is_405() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .patch("/users")
        .authorization_bearer(ADMIN_TOKEN)
        .json(&json!({}))
        .await;
    response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"], "METHOD_NOT_ALLOWED");
}

// =============================================================================
// Task listing: scoping and pagination metadata
// =============================================================================

async fn seed_tasks(ctx: &TestContext, creator: uuid::Uuid, count: usize) {
    for i in 0..count {
        let mut task = Task::new(format!("task {}", i), creator);
        // spread creation times so ordering is meaningful
        task.created_at = chrono::Utc::now() - chrono::Duration::minutes(i as i64);
        ctx.tasks.create(task).await.expect("seed task");
    }
}

#[tokio::test]
async fn test_pagination_metadata_eleven_items_limit_five() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.member.id, 11).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("limit", "5")
        .add_query_param("page", "3")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["meta"]["total"], 11);
    assert_eq!(body["meta"]["total_pages"], 3);
    assert_eq!(body["meta"]["has_next"], false);
    assert_eq!(body["meta"]["has_prev"], true);
}

#[tokio::test]
async fn test_out_of_range_page_returns_empty_items_not_error() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.member.id, 3).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("page", "9")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["has_next"], false);
}

#[tokio::test]
async fn test_member_listing_never_contains_foreign_tasks() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.member.id, 4).await;
    seed_tasks(&ctx, ctx.other.id, 5).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let items = body["data"].as_array().expect("items");
    assert_eq!(items.len(), 4);
    for item in items {
        assert_eq!(item["created_by"], ctx.member.id.to_string());
    }
    assert_eq!(body["meta"]["total"], 4);
}

#[tokio::test]
async fn test_member_cannot_widen_scope_via_created_by_filter() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.other.id, 3).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("created_by", &ctx.other.id.to_string())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["data"].as_array().map(Vec::len),
        Some(0),
        "foreign filter intersects to empty for non-admins"
    );
}

#[tokio::test]
async fn test_assigned_tasks_are_visible_to_assignee() {
    let ctx = create_test_server().await;
    let mut task = Task::new("handed over".to_string(), ctx.other.id);
    task.assigned_to = Some(ctx.member.id);
    ctx.tasks.create(task).await.expect("seed");

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_admin_sees_everything_and_may_filter_by_creator() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.member.id, 2).await;
    seed_tasks(&ctx, ctx.other.id, 3).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(ADMIN_TOKEN)
        .await;
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 5);

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(ADMIN_TOKEN)
        .add_query_param("created_by", &ctx.other.id.to_string())
        .await;
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 3);
}

#[tokio::test]
async fn test_status_filter_applies() {
    let ctx = create_test_server().await;
    seed_tasks(&ctx, ctx.member.id, 2).await;

    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("status", "completed")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["meta"]["total"], 0, "all seeded tasks are pending");
}

#[tokio::test]
async fn test_unknown_status_filter_is_validation_error() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/tasks")
        .authorization_bearer(MEMBER_TOKEN)
        .add_query_param("status", "archived")
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

// =============================================================================
// User listing
// =============================================================================

#[tokio::test]
async fn test_admin_lists_users_with_pagination() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/users")
        .authorization_bearer(ADMIN_TOKEN)
        .add_query_param("limit", "2")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["total_pages"], 2);
}

#[tokio::test]
async fn test_member_cannot_list_users() {
    let ctx = create_test_server().await;
    let response = ctx
        .server
        .get("/users")
        .authorization_bearer(MEMBER_TOKEN)
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert!(
        body["message"]
            .as_str()
            .expect("message present")
            .contains("Only administrators can access")
    );
}
