use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// JSON text produced by the database, sent without re-serializing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawJson {
    pub body: String,
    pub status_code: StatusCode,
}

impl RawJson {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(body, StatusCode::OK)
    }

    /// Create a 201 Created response
    pub fn created(body: impl Into<String>) -> Self {
        Self::with_status(body, StatusCode::CREATED)
    }

    /// Create a 204 No Content response
    pub fn no_content() -> Self {
        Self::with_status(String::new(), StatusCode::NO_CONTENT)
    }

    pub fn with_status(body: impl Into<String>, status_code: StatusCode) -> Self {
        Self {
            body: body.into(),
            status_code,
        }
    }
}

impl IntoResponse for RawJson {
    fn into_response(self) -> Response {
        if self.status_code == StatusCode::NO_CONTENT {
            return self.status_code.into_response();
        }
        (
            self.status_code,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            self.body,
        )
            .into_response()
    }
}
