//! Success envelope shared by every endpoint

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::core::query::PaginationMeta;

/// Body of every successful response:
/// `{success: true, data, message, meta?}`
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Value,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

/// What a business handler returns on success; the pipeline turns it into
/// the HTTP response
#[derive(Debug)]
pub struct Reply {
    pub status: StatusCode,
    pub data: Value,
    pub message: String,
    pub meta: Option<PaginationMeta>,
}

impl Reply {
    /// 200 response
    pub fn ok(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            message: message.into(),
            meta: None,
        }
    }

    /// 201 response for newly created resources
    pub fn created(data: Value, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            message: message.into(),
            meta: None,
        }
    }

    /// Attach pagination metadata
    pub fn with_meta(mut self, meta: PaginationMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let body = ApiResponse {
            success: true,
            data: self.data,
            message: self.message,
            meta: self.meta,
        };
        (self.status, Json(body)).into_response()
    }
}
