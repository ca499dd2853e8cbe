/// Session resolution for Axum
///
/// The API crate's session layer calls [`resolve_auth_context`] for every
/// request and, on success, inserts the resulting [`AuthContext`] into the
/// request extensions. Handlers read it back with Axum's `Extension`
/// extractor; route groups behind a login guard can rely on its presence.
///
/// # Request Extensions
///
/// - `AuthContext`: user id, display name, and current role
///
/// # Example
///
/// ```no_run
/// use axum::Extension;
/// use kutubxona_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.name)
/// }
/// ```

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::session::{hash_session_token, validate_session_token_format, SESSION_COOKIE};
use crate::models::session::Session;
use crate::models::user::Role;

/// Authenticated identity for one request
///
/// Built fresh from the `users` row on every request, so a role change takes
/// effect on the user's next request without logging out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,

    /// Display name
    pub name: String,

    /// Current role
    pub role: Role,
}

/// Reads a cookie value from the request headers
///
/// Looks through every `Cookie` header; the first cookie called `name` wins.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

/// Extracts the session token hash from the request cookies
///
/// Returns None when there is no session cookie or its value is malformed.
pub fn session_token_hash(headers: &HeaderMap, secret: &str) -> Option<String> {
    read_cookie(headers, SESSION_COOKIE)
        .filter(|token| validate_session_token_format(token))
        .map(|token| hash_session_token(&token, secret))
}

/// Resolves the request's session cookie to an identity
///
/// # Returns
///
/// - `Ok(Some(ctx))` for a live session
/// - `Ok(None)` for anonymous requests, unknown or expired tokens
///
/// # Errors
///
/// Only database failures are errors
pub async fn resolve_auth_context(
    pool: &SqlitePool,
    secret: &str,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, sqlx::Error> {
    let Some(token_hash) = session_token_hash(headers, secret) else {
        return Ok(None);
    };

    let identity = Session::resolve(pool, &token_hash).await?;

    Ok(identity.map(|identity| AuthContext {
        user_id: identity.user_id,
        name: identity.name,
        role: identity.role,
    }))
}
