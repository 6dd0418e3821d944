//! Central error type and its HTTP rendering.
//!
//! Every failure a client can cause is an operational variant with a stable
//! machine-readable code. Anything else ends up in [`AppError::Internal`],
//! which is logged in full and rendered as an opaque 500.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

static DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Turns on `devOnly` detail in error bodies. Only set in development.
pub fn enable_diagnostics(enabled: bool) {
    DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

fn diagnostics_enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Relaxed)
}

/// One entry of a batched validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub fieldname: String,
    pub code: &'static str,
}

impl FieldError {
    pub fn new(fieldname: impl Into<String>, code: &'static str) -> Self {
        Self {
            fieldname: fieldname.into(),
            code,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation_Error")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Password recently changed, please log in again")]
    StaleCredential,

    #[error("User no longer exists")]
    UnknownSubject,

    #[error("No recipe found with that id")]
    NotFound,

    #[error("Recipe does not exist")]
    RecipeNotFound,

    #[error("User does not own this recipe")]
    NotOwner,

    #[error("Authors must update their own recipes directly")]
    NotEditable,

    #[error("This recipe does not accept suggestions")]
    SuggestionsDisabled,

    #[error("Duplicate field value: {field}")]
    DuplicateField { field: String },

    #[error("Please provide email and password")]
    MissingCredentials,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Current password is incorrect")]
    CurrentPasswordInvalid,

    #[error("Missing required fields")]
    MissingFields,

    #[error("There is no user with that email address")]
    UnknownEmail,

    #[error("Token is invalid or has expired")]
    TokenInvalidOrExpired,

    #[error("There was an error sending the email. Try again later")]
    Delivery(#[source] anyhow::Error),

    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        AppError::Validation(errors)
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::NotEditable
            | AppError::SuggestionsDisabled
            | AppError::MissingCredentials
            | AppError::MissingFields
            | AppError::TokenInvalidOrExpired => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_)
            | AppError::StaleCredential
            | AppError::UnknownSubject
            | AppError::InvalidCredentials
            | AppError::CurrentPasswordInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotOwner => StatusCode::FORBIDDEN,
            AppError::NotFound | AppError::RecipeNotFound | AppError::UnknownEmail => {
                StatusCode::NOT_FOUND
            }
            AppError::DuplicateField { .. } => StatusCode::CONFLICT,
            AppError::Delivery(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthenticated(_) => "UNAUTHENTICATED",
            AppError::StaleCredential => "STALE_CREDENTIAL",
            AppError::UnknownSubject => "UNKNOWN_SUBJECT",
            AppError::NotFound => "INVALID_ID",
            AppError::RecipeNotFound => "INVALID_RECIPE",
            AppError::NotOwner => "USER_DOESNT_OWN_RECIPE",
            AppError::NotEditable => "USE_UPDATE_OWN_RECIPE_ENDPOINT",
            AppError::SuggestionsDisabled => "NO_SUGGESTIONS",
            AppError::DuplicateField { field } => match field.as_str() {
                "username" => "USERNAME_TAKEN",
                "email" => "UNIQUE_EMAIL",
                _ => "DUPLICATE_FIELD",
            },
            AppError::MissingCredentials => "MISSING_EMAIL_PASSWORD",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::CurrentPasswordInvalid => "INVALID_CURRENT_PASSWORD",
            AppError::MissingFields => "MISSING_FIELDS",
            AppError::UnknownEmail => "INVALID_USER",
            AppError::TokenInvalidOrExpired => "TOKEN_INVALID_OR_EXPIRED",
            AppError::Delivery(_) => "DELIVERY_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn body(&self, diagnostics: bool) -> serde_json::Value {
        match self {
            AppError::Internal(err) => {
                let mut body = json!({
                    "status": "failure",
                    "code": self.error_code(),
                    "message": "Something went wrong!",
                });
                if diagnostics {
                    body["devOnly"] = json!({ "error": format!("{err:?}") });
                }
                body
            }
            AppError::Validation(errors) => json!({
                "status": "failure",
                "code": self.error_code(),
                "message": self.to_string(),
                "errors": errors,
            }),
            _ => json!({
                "status": "failure",
                "code": self.error_code(),
                "message": self.to_string(),
            }),
        }
    }
}

/// Repositories speak `anyhow`; operational errors raised inside them are
/// carried through as `AppError` and recovered here.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app) => app,
            Err(err) => AppError::Internal(err),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected request body");
        AppError::Validation(vec![FieldError::new("body", "INVALID_BODY")])
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        warn!(error = %rejection.body_text(), "rejected query string");
        AppError::Validation(vec![FieldError::new("query", "INVALID_QUERY")])
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::NotFound
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::Internal(err) => error!(error = ?err, "unhandled internal error"),
            AppError::Delivery(err) => error!(error = ?err, "email delivery failed"),
            _ => {}
        }
        (status, Json(self.body(diagnostics_enabled()))).into_response()
    }
}
