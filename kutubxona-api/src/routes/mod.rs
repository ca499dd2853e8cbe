/// Route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check and the tutorial acknowledgement
/// - `auth`: Registration, login, logout
/// - `materials`: Public browsing, detail views, downloads
/// - `admin`: Material management, role toggles, notifications to users
/// - `notifications`: Mailbox and replies
///
/// Page-style handlers answer with [`crate::flash::Page`] JSON; mutations
/// answer with a `303 See Other` redirect carrying a flash message.

pub mod admin;
pub mod auth;
pub mod health;
pub mod materials;
pub mod notifications;

use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use validator::ValidationErrors;

/// Numeric `:id` path segment
///
/// A segment that doesn't parse as an integer is treated as an unknown
/// resource rather than a bad request.
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;

        Ok(IdPath(id))
    }
}

/// Picks the message of the first failing field, in form order
pub(crate) fn first_validation_message(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let field_errors = errors.field_errors();

    field_order
        .iter()
        .find_map(|wanted| {
            field_errors
                .iter()
                .find(|(field, _)| {
                    let field: &str = field.as_ref();
                    field == *wanted
                })
                .and_then(|(_, errors)| errors.first())
                .and_then(|error| error.message.as_ref())
                .map(|message| message.to_string())
        })
        .unwrap_or_else(|| "Invalid input".to_string())
}
