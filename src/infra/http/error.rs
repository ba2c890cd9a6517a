use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::auth::{LoginError, SessionError};
use crate::application::contact::{ContactError, FieldViolation};
use crate::application::content::ContentError;
use crate::application::error::ErrorReport;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const WEAK_PASSWORD: &str = "weak_password";
    pub const NOT_CONFIGURED: &str = "not_configured";
    pub const RELAY_REJECTED: &str = "relay_rejected";
    pub const RELAY_UNAVAILABLE: &str = "relay_unavailable";
    pub const STORE: &str = "store_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<FieldViolation>>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    violations: Option<Vec<FieldViolation>>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            violations: None,
        }
    }

    pub fn bad_request(message: impl Into<String>, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn invalid_input(violations: Vec<FieldViolation>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            code: codes::INVALID_INPUT,
            message: "Submission failed validation".to_string(),
            hint: None,
            violations: Some(violations),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            message,
            None,
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn store_failure() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::STORE,
            "State could not be persisted",
            None,
        )
    }

    pub fn rate_limited(retry_after: u64) -> Response {
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: codes::RATE_LIMITED.to_string(),
                message: "Rate limit exceeded".to_string(),
                hint: Some(format!("Retry after {retry_after} seconds")),
                violations: None,
            },
        };
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after.to_string()) {
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, value);
        }
        ErrorReport::from_message(
            "infra::http::rate_limit",
            StatusCode::TOO_MANY_REQUESTS,
            format!("rate_limited: retry_after={retry_after}"),
        )
        .attach(&mut response);
        response
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = self
            .hint
            .clone()
            .unwrap_or_else(|| self.message.clone());
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
                violations: self.violations,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        // Attach a structured report so the logging middleware can emit
        // rich diagnostics without leaking them to clients.
        ErrorReport::from_message(
            "infra::http::error",
            self.status,
            format!("{}: {detail}", self.code),
        )
        .attach(&mut response);
        response
    }
}

impl From<ContactError> for ApiError {
    fn from(error: ContactError) -> Self {
        match error {
            ContactError::Invalid { violations } => ApiError::invalid_input(violations),
            ContactError::NotConfigured => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                codes::NOT_CONFIGURED,
                "Contact relay is not configured",
                None,
            ),
            ContactError::Rejected { message } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                codes::RELAY_REJECTED,
                message.unwrap_or_else(|| "The relay rejected the submission".to_string()),
                None,
            ),
            ContactError::Unavailable { message } => ApiError::new(
                StatusCode::BAD_GATEWAY,
                codes::RELAY_UNAVAILABLE,
                message,
                None,
            ),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(error: ContentError) -> Self {
        match error {
            ContentError::PostNotFound { .. } => ApiError::not_found("post not found"),
            ContentError::ExperienceNotFound { .. } => {
                ApiError::not_found("experience entry not found")
            }
            ContentError::Store(_) => ApiError::store_failure(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Missing => ApiError::unauthorized("Session token required"),
            SessionError::Invalid => ApiError::unauthorized("Session token invalid"),
            SessionError::Expired => ApiError::unauthorized("Session token expired"),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(error: LoginError) -> Self {
        match error {
            LoginError::RateLimited { retry_after_secs } => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                codes::RATE_LIMITED,
                "Too many login attempts",
                Some(format!("Retry after {retry_after_secs} seconds")),
            ),
            LoginError::InvalidPassword => ApiError::unauthorized("Incorrect password"),
            LoginError::WeakPassword { reasons } => ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                codes::WEAK_PASSWORD,
                "Password does not meet the strength rules",
                Some(reasons.join(", ")),
            ),
            LoginError::Store(_) => ApiError::store_failure(),
        }
    }
}
