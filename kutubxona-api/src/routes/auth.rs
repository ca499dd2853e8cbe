/// Authentication endpoints
///
/// This module provides the account lifecycle:
/// - Registration
/// - Login (server-side session + cookie)
/// - Logout
///
/// # Endpoints
///
/// - `GET  /register` - Registration page
/// - `POST /register` - Register new user (form)
/// - `GET  /login` - Login page
/// - `POST /login` - Login (form)
/// - `GET  /logout` - Logout

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    flash::{cookie_header, redirect_with_flash, Flash, FlashLevel, Page},
    routes::first_validation_message,
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Response,
    Extension, Form,
};
use kutubxona_shared::{
    auth::{
        middleware::{session_token_hash, AuthContext},
        password,
        session::{generate_session_token, SESSION_COOKIE},
    },
    models::{
        session::Session,
        user::{normalize_email, CreateUser, Role, User},
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Shown for both unknown emails and wrong passwords
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";

/// Body of the register and login pages
#[derive(Debug, Serialize)]
pub struct FormPage {
    pub form: &'static str,
}

/// Register form
///
/// Missing fields deserialize as empty strings and fail validation instead
/// of rejecting the whole request.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Register form after trimming and email normalization
#[derive(Debug, Validate)]
struct NewAccount {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    name: String,

    #[validate(contains(pattern = "@", message = "Please enter a valid email address"))]
    email: String,

    password: String,
}

impl From<RegisterForm> for NewAccount {
    fn from(form: RegisterForm) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: normalize_email(&form.email),
            password: form.password,
        }
    }
}

/// Login form
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Registration page
pub async fn register_page(
    flash: Flash,
    auth: Option<Extension<AuthContext>>,
) -> Page<FormPage> {
    Page::new(flash, auth.map(|Extension(a)| a), FormPage { form: "register" })
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Content-Type: application/x-www-form-urlencoded
///
/// name=Alice&email=alice@example.com&password=secret1
/// ```
///
/// # Response
///
/// `303` to `/login` with a success flash.
///
/// # Errors
///
/// Redirects back to `/register` with a flash when a field is invalid or
/// the email is already registered.
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> ApiResult<Response> {
    let account = NewAccount::from(form);

    account.validate().map_err(|e| {
        ApiError::validation(
            first_validation_message(&e, &["name", "email"]),
            "/register",
        )
    })?;

    password::validate_password_strength(&account.password)
        .map_err(|message| ApiError::validation(message, "/register"))?;

    let password_hash = password::hash_password(&account.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: account.name,
            email: account.email,
            password_hash,
            role: Role::User,
        },
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict { .. } => {
            ApiError::conflict("This email is already registered", "/register")
        }
        other => other,
    })?;

    tracing::info!(user_id = user.id, "User registered");

    Ok(redirect_with_flash(
        "/login",
        FlashLevel::Success,
        "Registration successful! You can now log in.",
    ))
}

/// Login page
pub async fn login_page(flash: Flash, auth: Option<Extension<AuthContext>>) -> Page<FormPage> {
    Page::new(flash, auth.map(|Extension(a)| a), FormPage { form: "login" })
}

/// Login
///
/// On success any previous session of this browser is destroyed and a new
/// one is created. The session cookie is `HttpOnly; SameSite=Lax`, `Secure`
/// in production, and lives as long as the session row.
///
/// # Errors
///
/// Unknown email and wrong password both redirect to `/login` with the
/// same message.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let user = User::find_by_email(&state.db, &form.email).await?;

    let user = match user {
        Some(user) if password::verify_password(&form.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!("Login rejected");
            return Err(ApiError::validation(INVALID_CREDENTIALS_MESSAGE, "/login"));
        }
    };

    if let Some(previous) = session_token_hash(&headers, state.session_secret()) {
        Session::delete(&state.db, &previous).await?;
    }

    let lifetime = state.config.session.lifetime_secs;
    let (token, token_hash) = generate_session_token(state.session_secret());
    Session::create(&state.db, &token_hash, &user, chrono::Duration::seconds(lifetime)).await?;

    tracing::info!(user_id = user.id, role = ?user.role, "User logged in");

    let mut response = redirect_with_flash(
        "/",
        FlashLevel::Success,
        format!("Welcome, {}!", user.name),
    );
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie_header(
            SESSION_COOKIE,
            &token,
            Some(lifetime),
            state.config.api.production,
        ),
    );

    Ok(response)
}

/// Logout
///
/// Unconditional: works with or without a live session.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token_hash) = session_token_hash(&headers, state.session_secret()) {
        if Session::delete(&state.db, &token_hash).await? {
            tracing::debug!("Session deleted on logout");
        }
    }

    let mut response = redirect_with_flash("/", FlashLevel::Info, "You have been logged out");
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie_header(SESSION_COOKIE, "", Some(0), state.config.api.production),
    );

    Ok(response)
}
