/// Error handling for the API server
///
/// This module provides a unified error type for handlers. Every variant is
/// answered with a `303 See Other` redirect and a flash message rather than a
/// bare 4xx/5xx, so a browser always lands on a usable page.
///
/// | Variant | Flash | Redirect |
/// |---|---|---|
/// | `Validation` | the message | the originating form |
/// | `Conflict` | the message | the originating form |
/// | `Unauthorized` | "Please log in first" | `/login` |
/// | `Forbidden` | the message (warning) | given page |
/// | `NotFound` | "Page not found" | `/` |
/// | `InternalError` | generic message, details only in logs | `/` |
///
/// # Example
///
/// ```no_run
/// use kutubxona_api::error::{ApiError, ApiResult};
///
/// fn check_title(title: &str) -> ApiResult<()> {
///     if title.trim().is_empty() {
///         return Err(ApiError::validation("Title is required", "/admin"));
///     }
///     Ok(())
/// }
/// ```

use crate::flash::{redirect_with_flash, FlashLevel};
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kutubxona_shared::{
    auth::{authorization::AuthzError, password::PasswordError},
    storage::StorageError,
};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Message shown for unauthenticated access to a login-only page
pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in first";

/// Message shown for unknown resources and routes
pub const NOT_FOUND_MESSAGE: &str = "Page not found";

/// Message shown for server-side failures
pub const INTERNAL_ERROR_MESSAGE: &str = "A server error occurred";

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Missing, short, or malformed input
    Validation { message: String, redirect: String },

    /// Duplicate of an existing record, e.g. an email already registered
    Conflict { message: String, redirect: String },

    /// No session
    Unauthorized,

    /// Authenticated but not allowed
    Forbidden { message: String, redirect: String },

    /// Unknown id, unparseable id, or unmatched route
    NotFound,

    /// Anything the user cannot fix; the string is logged, never shown
    InternalError(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>, redirect: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            redirect: redirect.into(),
        }
    }

    pub fn conflict(message: impl Into<String>, redirect: impl Into<String>) -> Self {
        ApiError::Conflict {
            message: message.into(),
            redirect: redirect.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>, redirect: impl Into<String>) -> Self {
        ApiError::Forbidden {
            message: message.into(),
            redirect: redirect.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation { message, .. } => write!(f, "Validation failed: {}", message),
            ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Forbidden { message, .. } => write!(f, "Forbidden: {}", message),
            ApiError::NotFound => write!(f, "Not found"),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation { message, redirect } | ApiError::Conflict { message, redirect } => {
                redirect_with_flash(&redirect, FlashLevel::Error, message)
            }
            ApiError::Unauthorized => {
                redirect_with_flash("/login", FlashLevel::Warning, LOGIN_REQUIRED_MESSAGE)
            }
            ApiError::Forbidden { message, redirect } => {
                redirect_with_flash(&redirect, FlashLevel::Warning, message)
            }
            ApiError::NotFound => redirect_with_flash("/", FlashLevel::Error, NOT_FOUND_MESSAGE),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                redirect_with_flash("/", FlashLevel::Error, INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ApiError::conflict("This record already exists", "/")
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert authorization errors to API errors
///
/// Ownership and role-change refusals land back on the admin panel.
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InsufficientRole { .. } => {
                ApiError::forbidden("Administrator rights required", "/")
            }
            AuthzError::NotOwner(_) => {
                ApiError::forbidden("You can only manage materials you uploaded", "/admin")
            }
            AuthzError::TypeNotPermitted(_) => {
                ApiError::forbidden("You can only upload books and apps", "/admin")
            }
            AuthzError::SelfTarget => ApiError::forbidden("You cannot change your own role", "/admin"),
            AuthzError::SuperAdminTarget => {
                ApiError::forbidden("You cannot change another super admin", "/admin")
            }
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert storage errors to API errors
impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) | StorageError::InvalidFilename(_) => ApiError::NotFound,
            other => ApiError::InternalError(format!("Storage error: {}", other)),
        }
    }
}

/// Convert multipart errors to API errors
///
/// Upload forms all live on the admin panel.
impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::validation("The file is too large", "/admin")
        } else {
            ApiError::validation(format!("Invalid upload: {}", err.body_text()), "/admin")
        }
    }
}
