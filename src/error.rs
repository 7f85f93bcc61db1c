use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("failed to fetch seed image from {url}: {message}")]
    SeedFetch {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("model invocation failed: {message}")]
    ModelInvocation { message: String, transient: bool },

    #[error("unexpected model response: {0}")]
    MalformedResponse(String),

    #[error("image upload failed: {message}")]
    Upload { message: String, transient: bool },

    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout { operation: String, elapsed_ms: u64 },

    #[error("scratch storage failed: {0}")]
    Scratch(String),
}

impl GenerationError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        GenerationError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout { .. } => true,
            GenerationError::SeedFetch { transient, .. }
            | GenerationError::ModelInvocation { transient, .. }
            | GenerationError::Upload { transient, .. } => *transient,
            _ => false,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GenerationError::Validation { .. } => "validation_error",
            GenerationError::SeedFetch { .. } => "seed_fetch_error",
            GenerationError::ModelInvocation { .. } => "model_error",
            GenerationError::MalformedResponse(_) => "malformed_model_response",
            GenerationError::Upload { .. } => "upload_error",
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::Scratch(_) => "scratch_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GenerationError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            GenerationError::SeedFetch { .. } => StatusCode::BAD_REQUEST,
            GenerationError::ModelInvocation { .. }
            | GenerationError::MalformedResponse(_)
            | GenerationError::Upload { .. } => StatusCode::BAD_GATEWAY,
            GenerationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GenerationError::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn with_request_id(self, request_id: &str) -> ApiFailure {
        ApiFailure {
            error: self,
            request_id: Some(request_id.to_string()),
        }
    }
}

pub fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

pub fn is_transient_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error_type: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug)]
pub struct ApiFailure {
    pub error: GenerationError,
    pub request_id: Option<String>,
}

impl From<GenerationError> for ApiFailure {
    fn from(error: GenerationError) -> Self {
        ApiFailure {
            error,
            request_id: None,
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let status = self.error.status_code();
        let body = ErrorBody {
            error_type: self.error.error_type(),
            message: self.error.to_string(),
            request_id: self.request_id,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        ApiFailure::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_failure_is_a_gateway_error_not_success() {
        let err = GenerationError::Upload {
            message: "Invalid Signature".to_string(),
            transient: false,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.error_type(), "upload_error");
        assert!(!err.is_retryable());
    }

    #[test]
    fn seed_fetch_has_its_own_kind() {
        let err = GenerationError::SeedFetch {
            url: "https://cdn.example/pot.png".to_string(),
            message: "status 404".to_string(),
            transient: false,
        };
        assert_eq!(err.error_type(), "seed_fetch_error");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn timeouts_and_transient_failures_are_retryable() {
        let timeout = GenerationError::Timeout {
            operation: "model.generate".to_string(),
            elapsed_ms: 90_000,
        };
        let flaky = GenerationError::ModelInvocation {
            message: "503".to_string(),
            transient: true,
        };
        assert!(timeout.is_retryable());
        assert_eq!(timeout.to_string(), "model.generate timed out after 90000ms");
        assert!(flaky.is_retryable());
        assert!(!GenerationError::MalformedResponse("no candidates".into()).is_retryable());
    }

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_transient_status(reqwest::StatusCode::NOT_FOUND));
    }
}
