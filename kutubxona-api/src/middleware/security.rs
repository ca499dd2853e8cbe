/// Security headers middleware
///
/// Adds security-related HTTP headers to every response, redirects and file
/// downloads included. In production every cookie the response sets is also
/// marked `Secure`, whichever handler or error path built it.
///
/// # Headers Applied
///
/// - `X-Content-Type-Options: nosniff` - Stops browsers from sniffing downloads as HTML
/// - `X-Frame-Options: DENY` - Prevents clickjacking
/// - `Referrer-Policy: strict-origin-when-cross-origin` - Controls referrer information
/// - `Permissions-Policy` - Disables unused browser features
/// - `Content-Security-Policy` - Restricts resource loading
/// - `Strict-Transport-Security` - Forces HTTPS (production only)
///
/// # Example
///
/// ```no_run
/// use axum::Router;
/// use kutubxona_api::middleware::security::SecurityHeadersLayer;
///
/// let app: Router = Router::new()
///     .layer(SecurityHeadersLayer::new(true)); // true = production mode
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Headers set on every response
const STATIC_HEADERS: [(HeaderName, &str); 5] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
    (
        HeaderName::from_static("permissions-policy"),
        "geolocation=(), microphone=(), camera=(), payment=(), usb=()",
    ),
    (
        header::CONTENT_SECURITY_POLICY,
        "default-src 'self'; img-src 'self' data:; style-src 'self' 'unsafe-inline'; frame-ancestors 'none'",
    ),
];

/// Security headers middleware layer
#[derive(Clone)]
pub struct SecurityHeadersLayer {
    /// HSTS and `Secure` cookies (HTTPS-only, true in production)
    production: bool,
}

impl SecurityHeadersLayer {
    /// Creates a new security headers layer
    ///
    /// # Arguments
    ///
    /// * `production` - Whether to send HSTS and force `Secure` cookies
    pub fn new(production: bool) -> Self {
        Self { production }
    }
}

/// Appends `Secure` to every `Set-Cookie` that lacks it
fn mark_cookies_secure(headers: &mut HeaderMap) {
    let cookies: Vec<HeaderValue> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| match value.to_str() {
            Ok(cookie) if !cookie.contains("; Secure") => {
                HeaderValue::from_str(&format!("{}; Secure", cookie))
                    .unwrap_or_else(|_| value.clone())
            }
            _ => value.clone(),
        })
        .collect();

    headers.remove(header::SET_COOKIE);
    for cookie in cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            production: self.production,
        }
    }
}

/// Security headers middleware service
#[derive(Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    production: bool,
}

impl<S> Service<Request> for SecurityHeadersMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let future = self.inner.call(request);
        let production = self.production;

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            for (name, value) in STATIC_HEADERS {
                headers.insert(name, HeaderValue::from_static(value));
            }

            if production {
                headers.insert(
                    header::STRICT_TRANSPORT_SECURITY,
                    HeaderValue::from_static("max-age=31536000; includeSubDomains"),
                );
                mark_cookies_secure(headers);
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::{cookie_header, redirect_with_flash, FlashLevel};
    use axum::{body::Body, http::StatusCode, response::Redirect, routing::get, Router};
    use tower::Service as _;

    async fn headers_for(uri: &str, production: bool) -> axum::http::HeaderMap {
        let mut app = Router::new()
            .route("/test", get(|| async { (StatusCode::OK, "test") }))
            .route("/moved", get(|| async { Redirect::to("/test") }))
            .route(
                "/login",
                get(|| async {
                    let mut response = redirect_with_flash("/", FlashLevel::Success, "Welcome");
                    response.headers_mut().append(
                        header::SET_COOKIE,
                        cookie_header("kutubxona_session", "abc", Some(60), true),
                    );
                    response
                }),
            )
            .layer(SecurityHeadersLayer::new(production));

        let response = app
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        response.headers().clone()
    }

    #[tokio::test]
    async fn test_security_headers_applied() {
        let headers = headers_for("/test", false).await;

        assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
        assert_eq!(
            headers.get("Referrer-Policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
        assert!(headers.get("Content-Security-Policy").is_some());
        assert!(headers.get("Permissions-Policy").is_some());
    }

    #[tokio::test]
    async fn test_headers_on_redirects_too() {
        let headers = headers_for("/moved", false).await;
        assert_eq!(headers.get("X-Frame-Options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn test_hsts_only_in_production() {
        assert!(headers_for("/test", true)
            .await
            .get("Strict-Transport-Security")
            .is_some());
        assert!(headers_for("/test", false)
            .await
            .get("Strict-Transport-Security")
            .is_none());
    }

    fn set_cookies(headers: &axum::http::HeaderMap) -> Vec<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_cookies_secure_only_in_production() {
        let cookies = set_cookies(&headers_for("/login", true).await);
        assert_eq!(cookies.len(), 2);
        assert!(cookies
            .iter()
            .any(|c| c.starts_with("kutubxona_flash=") && c.ends_with("; Secure")));
        assert!(cookies.iter().all(|c| c.matches("; Secure").count() == 1));

        let cookies = set_cookies(&headers_for("/login", false).await);
        let flash = cookies
            .iter()
            .find(|c| c.starts_with("kutubxona_flash="))
            .unwrap();
        assert!(!flash.contains("Secure"));
    }
}
