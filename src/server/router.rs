//! Route table
//!
//! Every resource route is served by pipeline instances; the only handler
//! outside the pipeline is the health probe.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, any, get};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::error::ApiError;
use crate::server::handlers::{tasks, users};
use crate::server::pipeline::{Endpoint, parse_body};
use crate::server::state::AppState;

/// Build the full application router over a prepared state
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/users",
            dispatch(vec![users::create_user(), users::list_users()]),
        )
        .route(
            "/users/{id}",
            dispatch_with_id(vec![
                users::get_user(),
                users::update_user(),
                users::delete_user(),
            ]),
        )
        .route("/users/{id}/role", dispatch_with_id(vec![users::change_role()]))
        .route(
            "/tasks",
            dispatch(vec![tasks::create_task(), tasks::list_tasks()]),
        )
        .route(
            "/tasks/{id}",
            dispatch_with_id(vec![
                tasks::get_task(),
                tasks::update_task(),
                tasks::delete_task(),
            ]),
        )
        .route(
            "/tasks/{id}/assign",
            dispatch_with_id(vec![tasks::assign_task()]),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Route all verbs on a path to the endpoint that serves the request method
fn dispatch(endpoints: Vec<Endpoint>) -> MethodRouter<Arc<AppState>> {
    any(
        move |State(state): State<Arc<AppState>>,
              method: Method,
              headers: HeaderMap,
              Query(query): Query<HashMap<String, String>>,
              body: Bytes| {
            let endpoints = endpoints.clone();
            async move { run(endpoints, state, method, headers, None, query, body).await }
        },
    )
}

/// Same as [`dispatch`] for paths carrying a resource id
fn dispatch_with_id(endpoints: Vec<Endpoint>) -> MethodRouter<Arc<AppState>> {
    any(
        move |State(state): State<Arc<AppState>>,
              Path(id): Path<String>,
              method: Method,
              headers: HeaderMap,
              Query(query): Query<HashMap<String, String>>,
              body: Bytes| {
            let endpoints = endpoints.clone();
            async move { run(endpoints, state, method, headers, Some(id), query, body).await }
        },
    )
}

async fn run(
    endpoints: Vec<Endpoint>,
    state: Arc<AppState>,
    method: Method,
    headers: HeaderMap,
    path_id: Option<String>,
    query: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let body = match parse_body(&body) {
        Ok(value) => value,
        Err(err) => return err.into_response(),
    };
    match endpoints.iter().find(|e| e.allows(&method)) {
        Some(endpoint) => {
            endpoint
                .handle(state, method, headers, path_id, query, body)
                .await
        }
        None => ApiError::MethodNotAllowed(format!(
            "Method {} is not allowed for this endpoint",
            method
        ))
        .into_response(),
    }
}
