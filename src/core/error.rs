//! Typed error taxonomy and the failure-description classifier
//!
//! `ApiError` is the only type that ever reaches the HTTP layer. Pipeline
//! stages (auth, validation, role gate) return it directly; business handlers
//! raise `anyhow::Error` with descriptive messages, and the pipeline boundary
//! converts those exactly once via [`ApiError::from_failure`]: first by
//! downcast, then through the ordered substring classifier.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// The client-facing error taxonomy
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Input failed declarative validation; carries every failing rule
    #[error("{message}")]
    Validation { message: String, details: Vec<String> },

    /// Missing or unverifiable credential
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but not permitted
    #[error("{0}")]
    Forbidden(String),

    /// Target resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Write conflicts with existing state (duplicate email, …)
    #[error("{0}")]
    Conflict(String),

    /// The identity provider rejected the request
    #[error("{0}")]
    UpstreamAuth(String),

    /// Persistence collaborator failed or timed out
    #[error("{0}")]
    Datastore(String),

    /// HTTP verb not supported by the endpoint
    #[error("{0}")]
    MethodNotAllowed(String),

    /// Anything unclassified
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Convenience constructor for single-message validation failures
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::Validation {
            details: vec![message.clone()],
            message,
        }
    }

    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UpstreamAuth(_) => StatusCode::BAD_REQUEST,
            ApiError::Datastore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable error label for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Unauthenticated(_) => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UpstreamAuth(_) => "UPSTREAM_AUTH_ERROR",
            ApiError::Datastore(_) => "DATASTORE_ERROR",
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert a raised business failure into a classified error
    ///
    /// Typed `ApiError`s pass through unchanged (they were already decided by
    /// a pipeline stage); everything else goes through the substring table.
    pub fn from_failure(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api) => api,
            Err(other) => Self::classify(&other.to_string()),
        }
    }

    /// Classify a plain failure description through the ordered pattern table
    ///
    /// The first entry whose substring occurs in the description wins, so the
    /// table must stay ordered specific-to-generic. Unmatched descriptions
    /// classify as internal.
    pub fn classify(description: &str) -> Self {
        for entry in CLASSIFIER_TABLE {
            if description.contains(entry.pattern) {
                let message = if entry.preserve_message {
                    description.to_string()
                } else {
                    entry.canonical.to_string()
                };
                return (entry.make)(message);
            }
        }
        ApiError::Internal("An unexpected error occurred".to_string())
    }
}

fn validation_error(message: String) -> ApiError {
    ApiError::Validation {
        details: vec![message.clone()],
        message,
    }
}

/// One row of the classification table
pub struct ClassifierEntry {
    /// Substring looked up in the failure description
    pub pattern: &'static str,
    /// Whether the original description is kept as the client message
    pub preserve_message: bool,
    /// Message used when the original is not preserved
    pub canonical: &'static str,
    make: fn(String) -> ApiError,
}

/// Ordered pattern table: specific business messages first, generic catch-alls
/// last. The order and the exact substrings are part of the external contract;
/// `test_classifier_order_is_specific_to_generic` guards it.
pub const CLASSIFIER_TABLE: &[ClassifierEntry] = &[
    ClassifierEntry {
        pattern: "Cannot remove admin role from the last administrator",
        preserve_message: true,
        canonical: "",
        make: ApiError::Forbidden,
    },
    ClassifierEntry {
        pattern: "Only administrators can",
        preserve_message: true,
        canonical: "",
        make: ApiError::Forbidden,
    },
    ClassifierEntry {
        pattern: "You don't have permission",
        preserve_message: true,
        canonical: "",
        make: ApiError::Forbidden,
    },
    ClassifierEntry {
        pattern: "Authentication required",
        preserve_message: true,
        canonical: "",
        make: ApiError::Unauthenticated,
    },
    ClassifierEntry {
        pattern: "Invalid or expired token",
        preserve_message: true,
        canonical: "",
        make: ApiError::Unauthenticated,
    },
    ClassifierEntry {
        pattern: "already exists",
        preserve_message: true,
        canonical: "",
        make: ApiError::Conflict,
    },
    ClassifierEntry {
        pattern: "identity provider",
        preserve_message: true,
        canonical: "",
        make: ApiError::UpstreamAuth,
    },
    ClassifierEntry {
        pattern: "Validation failed",
        preserve_message: true,
        canonical: "",
        make: validation_error,
    },
    ClassifierEntry {
        pattern: "is required",
        preserve_message: true,
        canonical: "",
        make: validation_error,
    },
    ClassifierEntry {
        pattern: "not found",
        preserve_message: true,
        canonical: "",
        make: ApiError::NotFound,
    },
    ClassifierEntry {
        pattern: "timed out",
        preserve_message: false,
        canonical: "A datastore operation timed out",
        make: ApiError::Datastore,
    },
    ClassifierEntry {
        pattern: "Failed to acquire",
        preserve_message: false,
        canonical: "A datastore error occurred",
        make: ApiError::Datastore,
    },
    ClassifierEntry {
        pattern: "database",
        preserve_message: false,
        canonical: "A datastore error occurred",
        make: ApiError::Datastore,
    },
];

/// Error envelope sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = match &self {
            ApiError::Validation { details, .. } => Some(details.clone()),
            _ => None,
        };
        let body = ErrorEnvelope {
            success: false,
            error: self.error_code(),
            message: self.to_string(),
            details,
        };
        (status, Json(body)).into_response()
    }
}
