// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::query::CompileError;
use crate::store::StoreError;

/// The schema/table/record a failed request was addressing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorTarget {
    pub schema: String,
    pub table: String,
    pub record: String,
}

impl ErrorTarget {
    pub fn new(schema: impl Into<String>, table: impl Into<String>, record: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            record: record.into(),
        }
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 404 Not Found
    NotFound(String),

    // 408 Request Timeout
    RequestTimeout(String),

    // Status derived from the vendor code
    Database {
        status: u16,
        db_code: String,
        message: String,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),

    /// Any other variant, tagged with the resource it concerned
    Resource {
        target: ErrorTarget,
        source: Box<ApiError>,
    },
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::RequestTimeout(_) => 408,
            ApiError::Database { status, .. } => *status,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::Resource { source, .. } => source.status_code(),
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::RequestTimeout(msg) => msg,
            ApiError::Database { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
            ApiError::Resource { source, .. } => source.message(),
        }
    }

    /// Vendor error code, empty unless the database raised the error
    pub fn db_code(&self) -> &str {
        match self {
            ApiError::Database { db_code, .. } => db_code,
            ApiError::Resource { source, .. } => source.db_code(),
            _ => "",
        }
    }

    pub fn target(&self) -> Option<&ErrorTarget> {
        match self {
            ApiError::Resource { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let target = self.target().cloned().unwrap_or_default();
        json!({
            "httpCode": self.status_code(),
            "dbCode": self.db_code(),
            "message": self.message(),
            "schema": target.schema,
            "table": target.table,
            "record": target.record,
        })
    }

    /// Attach the addressed resource; re-tagging replaces the old target
    pub fn for_resource(self, target: ErrorTarget) -> Self {
        let source = match self {
            ApiError::Resource { source, .. } => source,
            other => Box::new(other),
        };
        ApiError::Resource { target, source }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn request_timeout(message: impl Into<String>) -> Self {
        ApiError::RequestTimeout(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<CompileError> for ApiError {
    fn from(err: CompileError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Compile(e) => e.into(),
            StoreError::Database { code, message, status } => ApiError::Database {
                status,
                db_code: code,
                message,
            },
            StoreError::Unavailable(msg) => {
                tracing::error!("Database unavailable: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            StoreError::Cancelled => ApiError::service_unavailable("Request cancelled"),
            StoreError::Decode(msg) => {
                tracing::error!("Decode error: {}", msg);
                ApiError::internal_server_error("Could not read the database response")
            }
            StoreError::Unmarshal(e) => {
                tracing::error!("JSON unmarshal error: {}", e);
                ApiError::internal_server_error("Could not read the database response")
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
