//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use threadline_core::EmailError;

use crate::backend::BackendError;
use crate::cart::CartError;
use crate::notify::Notice;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A cart operation was refused or could not sync.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Email address failed validation.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Cart(err) => match err {
                CartError::Validation(_) => StatusCode::BAD_REQUEST,
                CartError::NotFound(_) => StatusCode::NOT_FOUND,
                CartError::OutOfStock { .. } | CartError::QuantityExceeded { .. } => {
                    StatusCode::CONFLICT
                }
                CartError::RemoteSync(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidEmail(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the shopper.
    fn public_message(&self) -> String {
        match self {
            Self::Cart(err) => err.notice().message,
            Self::Backend(err) => err.user_message(),
            Self::InvalidEmail(_) => "Invalid email address".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(reason) => reason.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl AppError {
    /// Pair the error with the notices drained from the shopper's buffer.
    #[must_use]
    pub const fn with_notices(self, notices: Vec<Notice>) -> WithNotices {
        WithNotices {
            error: self,
            notices,
        }
    }

    fn respond(self, notices: Option<Vec<Notice>>) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let mut body = json!({
            "success": false,
            "message": self.public_message(),
        });
        if let Some(notices) = notices {
            body["notices"] = json!(notices);
        }

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.respond(None)
    }
}

/// An error that also carries the notices raised while handling the
/// request, so the next response does not show them again.
#[derive(Debug)]
pub struct WithNotices {
    pub error: AppError,
    pub notices: Vec<Notice>,
}

impl IntoResponse for WithNotices {
    fn into_response(self) -> Response {
        self.error.respond(Some(self.notices))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Tag Sentry events from this request with the shopper session.
pub fn set_sentry_user(session_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(session_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for shopper actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, &str)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String((*value).to_string()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
