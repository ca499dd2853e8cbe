/// Role guards for route groups
///
/// Each guard is an `axum::middleware::from_fn` layer that reads the
/// [`AuthContext`] inserted by the session layer and either passes the
/// request on or answers with a flash redirect.
///
/// | Guard | Requires | On failure |
/// |---|---|---|
/// | `require_login` | any session | "Please log in first", `/login` |
/// | `require_admin` | `MaterialAdmin` or above | warning, `/` |
/// | `require_super_admin` | `SuperAdmin` | warning, `/` |
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Router};
/// use kutubxona_api::middleware::guards::require_login;
///
/// let app: Router = Router::new()
///     .route("/notifications", get(|| async { "inbox" }))
///     .layer(middleware::from_fn(require_login));
/// ```

use crate::error::{ApiError, ApiResult};
use axum::{extract::Request, middleware::Next, response::Response};
use kutubxona_shared::auth::{authorization::require_role, middleware::AuthContext};
use kutubxona_shared::models::user::Role;

/// Identity of the current request, if any
fn current_auth(req: &Request) -> Option<&AuthContext> {
    req.extensions().get::<AuthContext>()
}

/// Any authenticated user
pub async fn require_login(req: Request, next: Next) -> ApiResult<Response> {
    if current_auth(&req).is_none() {
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(req).await)
}

/// Material admins and super admins
pub async fn require_admin(req: Request, next: Next) -> ApiResult<Response> {
    check_role(&req, Role::MaterialAdmin, "Administrator rights required")?;
    Ok(next.run(req).await)
}

/// Super admins only
pub async fn require_super_admin(req: Request, next: Next) -> ApiResult<Response> {
    check_role(&req, Role::SuperAdmin, "Only the main administrator can do this")?;
    Ok(next.run(req).await)
}

fn check_role(req: &Request, required: Role, message: &str) -> ApiResult<()> {
    let allowed = current_auth(req)
        .map(|auth| require_role(auth, required).is_ok())
        .unwrap_or(false);

    if !allowed {
        tracing::debug!(uri = %req.uri(), required = ?required, "Role guard rejected request");
        return Err(ApiError::forbidden(message, "/"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::Service as _;

    fn app_with(role: Option<Role>) -> Router {
        Router::new()
            .route("/login-only", get(|| async { "ok" }).layer(middleware::from_fn(require_login)))
            .route("/admin-only", get(|| async { "ok" }).layer(middleware::from_fn(require_admin)))
            .route(
                "/super-only",
                get(|| async { "ok" }).layer(middleware::from_fn(require_super_admin)),
            )
            .layer(middleware::from_fn(move |mut req: Request, next: Next| async move {
                if let Some(role) = role {
                    req.extensions_mut().insert(AuthContext {
                        user_id: 1,
                        name: "Tester".to_string(),
                        role,
                    });
                }
                next.run(req).await
            }))
    }

    async fn get_status(role: Option<Role>, uri: &str) -> (StatusCode, Option<String>) {
        let response = app_with(role)
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        (response.status(), location)
    }

    #[tokio::test]
    async fn test_anonymous_is_sent_to_login() {
        assert_eq!(
            get_status(None, "/login-only").await,
            (StatusCode::SEE_OTHER, Some("/login".to_string()))
        );
    }

    #[tokio::test]
    async fn test_admin_guard() {
        assert_eq!(
            get_status(Some(Role::User), "/admin-only").await,
            (StatusCode::SEE_OTHER, Some("/".to_string()))
        );
        assert_eq!(get_status(None, "/admin-only").await.0, StatusCode::SEE_OTHER);
        assert_eq!(get_status(Some(Role::MaterialAdmin), "/admin-only").await.0, StatusCode::OK);
        assert_eq!(get_status(Some(Role::SuperAdmin), "/admin-only").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_super_admin_guard() {
        assert_eq!(
            get_status(Some(Role::MaterialAdmin), "/super-only").await,
            (StatusCode::SEE_OTHER, Some("/".to_string()))
        );
        assert_eq!(get_status(Some(Role::SuperAdmin), "/super-only").await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_guard_accepts_any_role() {
        for role in [Role::User, Role::MaterialAdmin, Role::SuperAdmin] {
            assert_eq!(get_status(Some(role), "/login-only").await.0, StatusCode::OK);
        }
    }
}
