/// One-shot flash messages and JSON pages
///
/// A mutation answers with `303 See Other` plus a flash cookie; the page the
/// browser lands on returns the pending flashes inside its JSON body and
/// clears the cookie.
///
/// # Cookie Format
///
/// `kutubxona_flash=<hex(json([{"level":"success","message":"…"}]))>`
///
/// Hex keeps arbitrary UTF-8 (Tajik, Uzbek, emoji) inside the cookie value
/// character set.
///
/// # Example
///
/// ```no_run
/// use axum::response::Response;
/// use kutubxona_api::flash::{redirect_with_flash, FlashLevel};
///
/// fn after_save() -> Response {
///     redirect_with_flash("/admin", FlashLevel::Success, "Material saved")
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use kutubxona_shared::auth::middleware::{read_cookie, AuthContext};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// Name of the cookie carrying pending flash messages
pub const FLASH_COOKIE: &str = "kutubxona_flash";

/// Severity of a flash message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A single flash message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Encodes messages into a cookie value
pub fn encode_flashes(messages: &[FlashMessage]) -> String {
    hex::encode(serde_json::to_vec(messages).unwrap_or_default())
}

/// Decodes a cookie value; anything malformed decodes to no messages
pub fn decode_flashes(value: &str) -> Vec<FlashMessage> {
    hex::decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Builds a `Set-Cookie` header value
///
/// `max_age` of None makes a browser-session cookie, `Some(0)` deletes it.
pub fn cookie_header(name: &str, value: &str, max_age: Option<i64>, secure: bool) -> HeaderValue {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    if secure {
        cookie.push_str("; Secure");
    }

    // Names and values are hex or base62, always valid header bytes
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

/// Redirects with `303 See Other` and queues a flash message
///
/// In production the security headers layer marks the cookie `Secure`.
pub fn redirect_with_flash(to: &str, level: FlashLevel, message: impl Into<String>) -> Response {
    let flashes = [FlashMessage::new(level, message)];
    let mut response = Redirect::to(to).into_response();
    response.headers_mut().append(
        header::SET_COOKIE,
        cookie_header(FLASH_COOKIE, &encode_flashes(&flashes), None, false),
    );
    response
}

/// Pending flash messages of the current request
#[derive(Debug, Clone, Default)]
pub struct Flash(pub Vec<FlashMessage>);

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let messages = read_cookie(&parts.headers, FLASH_COOKIE)
            .map(|value| decode_flashes(&value))
            .unwrap_or_default();

        Ok(Flash(messages))
    }
}

/// JSON page: pending flashes, the current user, and the page's own fields
///
/// Rendering a page consumes its flashes, so the response clears the flash
/// cookie whenever there were any.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub flashes: Vec<FlashMessage>,
    pub current_user: Option<AuthContext>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Page<T> {
    pub fn new(flash: Flash, current_user: Option<AuthContext>, body: T) -> Self {
        Self {
            flashes: flash.0,
            current_user,
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let had_flashes = !self.flashes.is_empty();
        let mut response = Json(self).into_response();

        if had_flashes {
            response.headers_mut().append(
                header::SET_COOKIE,
                cookie_header(FLASH_COOKIE, "", Some(0), false),
            );
        }

        response
    }
}
