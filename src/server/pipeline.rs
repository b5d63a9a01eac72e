//! The reusable endpoint pipeline
//!
//! Every endpoint is an [`Endpoint`]: allowed methods, an auth requirement,
//! an optional role gate, declarative validation rules, and a pure business
//! handler. The pipeline composes the cross-cutting stages in a fixed,
//! fail-fast order:
//!
//! method check (405) → auth (401) → validation (400) → role gate (403) →
//! handler → success envelope, with handler failures classified exactly once
//! at this boundary.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::core::auth::AuthContext;
use crate::core::error::ApiError;
use crate::core::policy;
use crate::core::validation::ValidationRule;
use crate::core::validation::engine::validate_as_error;
use crate::models::Role;
use crate::server::response::Reply;
use crate::server::state::AppState;

/// Validated request material handed to a business handler
#[derive(Debug, Clone)]
pub struct RequestParts {
    /// Body fields merged with the path id (under `"id"`), already validated
    pub input: Value,
    /// Raw query parameters (filters, pagination)
    pub query: HashMap<String, String>,
}

impl RequestParts {
    /// String field from the validated input, empty if absent
    ///
    /// Only meaningful for fields covered by a validation rule; the rule has
    /// already guaranteed presence and shape.
    pub fn str_field(&self, field: &str) -> &str {
        self.input.get(field).and_then(Value::as_str).unwrap_or("")
    }

    /// Optional string field from the validated input
    pub fn opt_str_field(&self, field: &str) -> Option<&str> {
        match self.input.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

type HandlerFuture = BoxFuture<'static, anyhow::Result<Reply>>;
type BoxedHandler =
    Arc<dyn Fn(Arc<AppState>, AuthContext, RequestParts) -> HandlerFuture + Send + Sync>;

/// Whether the endpoint insists on a verified caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthRequirement {
    Required,
    Optional,
}

/// One pipeline instance: the only place cross-cutting concerns compose
#[derive(Clone)]
pub struct Endpoint {
    methods: Vec<Method>,
    auth: AuthRequirement,
    required_roles: Vec<Role>,
    rules: Vec<ValidationRule>,
    handler: BoxedHandler,
}

impl Endpoint {
    /// Start building an endpoint accepting `methods`
    pub fn builder(methods: impl IntoIterator<Item = Method>) -> EndpointBuilder {
        EndpointBuilder {
            methods: methods.into_iter().collect(),
            auth: AuthRequirement::Required,
            required_roles: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Whether this endpoint serves `method`
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Run the full pipeline and shape the response
    pub async fn handle(
        &self,
        state: Arc<AppState>,
        method: Method,
        headers: HeaderMap,
        path_id: Option<String>,
        query: HashMap<String, String>,
        body: Value,
    ) -> Response {
        match self
            .run(state, method, headers, path_id, query, body)
            .await
        {
            Ok(reply) => reply.into_response(),
            Err(err) => {
                tracing::debug!(error = %err, code = err.error_code(), "request rejected");
                err.into_response()
            }
        }
    }

    async fn run(
        &self,
        state: Arc<AppState>,
        method: Method,
        headers: HeaderMap,
        path_id: Option<String>,
        query: HashMap<String, String>,
        body: Value,
    ) -> Result<Reply, ApiError> {
        if !self.allows(&method) {
            return Err(ApiError::MethodNotAllowed(format!(
                "Method {} is not allowed for this endpoint",
                method
            )));
        }

        let required = self.auth == AuthRequirement::Required;
        let ctx = state.auth.resolve(&headers, required).await?;

        let input = merge_input(body, path_id)?;
        validate_as_error(&input, &self.rules)?;

        if !self.required_roles.is_empty() {
            policy::check_required_roles(&ctx, &self.required_roles).into_result()?;
        }

        let parts = RequestParts { input, query };
        (self.handler)(state, ctx, parts)
            .await
            .map_err(ApiError::from_failure)
    }
}

/// Fluent construction for [`Endpoint`]
pub struct EndpointBuilder {
    methods: Vec<Method>,
    auth: AuthRequirement,
    required_roles: Vec<Role>,
    rules: Vec<ValidationRule>,
}

impl EndpointBuilder {
    /// Let unauthenticated callers through as [`AuthContext::Anonymous`];
    /// presented credentials are still verified
    pub fn allow_anonymous(mut self) -> Self {
        self.auth = AuthRequirement::Optional;
        self
    }

    /// Require the caller's role to be one of `roles`
    pub fn require_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }

    /// Declare the validation rules applied to body and path parameters
    pub fn rules(mut self, rules: Vec<ValidationRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Attach the business handler and finish the endpoint
    pub fn handler<F, Fut>(self, f: F) -> Endpoint
    where
        F: Fn(Arc<AppState>, AuthContext, RequestParts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Reply>> + Send + 'static,
    {
        Endpoint {
            methods: self.methods,
            auth: self.auth,
            required_roles: self.required_roles,
            rules: self.rules,
            handler: Arc::new(move |state, ctx, parts| Box::pin(f(state, ctx, parts))),
        }
    }
}

/// Parse a raw request body into the pipeline's input value
///
/// An empty body contributes no input fields; anything else must be valid
/// JSON.
pub fn parse_body(bytes: &Bytes) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| ApiError::validation(format!("Request body is not valid JSON: {}", e)))
}

/// Merge the JSON body object with the path id under a single input map
fn merge_input(body: Value, path_id: Option<String>) -> Result<Value, ApiError> {
    let mut input = match body {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return Err(ApiError::validation("Request body must be a JSON object"));
        }
    };
    if let Some(id) = path_id {
        input.insert("id".to_string(), Value::String(id));
    }
    Ok(Value::Object(input))
}
