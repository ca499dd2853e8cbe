/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use kutubxona_api::{app::AppState, config::Config};
/// use kutubxona_shared::storage::UploadStore;
/// use sqlx::SqlitePool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = SqlitePool::connect(&config.database.url).await?;
/// let uploads = UploadStore::new(&config.uploads.dir).await?;
/// let state = AppState::new(pool, config, uploads);
/// let app = kutubxona_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ApiError, ApiResult, INTERNAL_ERROR_MESSAGE},
    flash::{redirect_with_flash, FlashLevel},
    middleware::{
        guards::{require_admin, require_login, require_super_admin},
        security::SecurityHeadersLayer,
    },
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use kutubxona_shared::{auth::middleware::resolve_auth_context, storage::UploadStore};
use sqlx::SqlitePool;
use std::any::Any;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Uploaded files
    pub uploads: UploadStore,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: SqlitePool, config: Config, uploads: UploadStore) -> Self {
        Self {
            db,
            config: Arc::new(config),
            uploads,
        }
    }

    /// Gets the secret used to hash session tokens
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health, /api/tutorial-seen       # Public
/// ├── /register, /login, /logout        # Public
/// ├── /, /materials[/:type]             # Public
/// ├── /material/:id, /download/:name    # Public
/// ├── /books, /book/:id                 # Legacy redirects
/// ├── /notifications, /notify/reply     # Login required
/// └── /admin/                           # Material admin or above
///     ├── GET  /                        # Panel
///     ├── POST /add                     # Upload (multipart)
///     ├── /material/:id/{edit,delete,stats}
///     ├── GET  /user/:id/toggle         # Super admin
///     └── /notify/:id                   # Super admin
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. Panic recovery (tower-http CatchPanicLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Body size limit
/// 5. Session resolution, inserting `AuthContext` when logged in
/// 6. Wrong-method answers rewritten as not found
/// 7. Role guards (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/tutorial-seen", post(routes::health::tutorial_seen))
        .route(
            "/register",
            get(routes::auth::register_page).post(routes::auth::register),
        )
        .route("/login", get(routes::auth::login_page).post(routes::auth::login))
        .route("/logout", get(routes::auth::logout))
        .route("/", get(routes::materials::index))
        .route("/materials", get(routes::materials::list_all))
        .route("/materials/:material_type", get(routes::materials::list_by_type))
        .route("/material/:id", get(routes::materials::detail))
        .route("/download/:filename", get(routes::materials::download))
        .route("/books", get(routes::materials::legacy_books))
        .route("/book/:id", get(routes::materials::legacy_book));

    let member_routes = Router::new()
        .route("/notifications", get(routes::notifications::mailbox))
        .route("/notify/reply", post(routes::notifications::reply))
        .route_layer(middleware::from_fn(require_login));

    let admin_routes = Router::new()
        .route("/admin", get(routes::admin::panel))
        .route("/admin/add", post(routes::admin::add_material))
        .route(
            "/admin/material/:id/edit",
            get(routes::admin::edit_page).post(routes::admin::edit_material),
        )
        .route("/admin/material/:id/delete", get(routes::admin::delete_material))
        .route("/admin/material/:id/stats", get(routes::admin::material_stats))
        .route_layer(middleware::from_fn(require_admin));

    let super_admin_routes = Router::new()
        .route("/admin/user/:id/toggle", get(routes::admin::toggle_role))
        .route(
            "/admin/notify/:id",
            get(routes::admin::notify_page).post(routes::admin::notify_user),
        )
        .route_layer(middleware::from_fn(require_super_admin));

    Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .merge(admin_routes)
        .merge(super_admin_routes)
        .fallback(|| async { ApiError::NotFound })
        .layer(middleware::map_response(method_not_allowed_as_not_found))
        .layer(middleware::from_fn_with_state(state.clone(), session_layer))
        .layer(DefaultBodyLimit::max(state.config.uploads.max_content_length))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Session middleware layer
///
/// Resolves the session cookie against the sessions table and, for a live
/// session, inserts the user's current `AuthContext` into request
/// extensions. Anonymous requests pass through untouched.
async fn session_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> ApiResult<Response> {
    let auth = resolve_auth_context(&state.db, state.session_secret(), req.headers()).await?;

    if let Some(auth) = auth {
        req.extensions_mut().insert(auth);
    }

    Ok(next.run(req).await)
}

/// Answers a known path hit with the wrong method like an unknown path
async fn method_not_allowed_as_not_found(response: Response) -> Response {
    if response.status() == StatusCode::METHOD_NOT_ALLOWED {
        return ApiError::NotFound.into_response();
    }
    response
}

/// Turns a handler panic into the generic error redirect
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };

    tracing::error!(panic = %detail, "Handler panicked");
    redirect_with_flash("/", FlashLevel::Error, INTERNAL_ERROR_MESSAGE)
}
