//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A migrated SQLite file and upload directory per test (tempfile)
//! - The seeded super admin, logged in
//! - Form, multipart and cookie helpers
//! - Flash and JSON body decoding

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response};
use kutubxona_api::app::{build_router, AppState};
use kutubxona_api::config::Config;
use kutubxona_api::flash::{decode_flashes, FlashMessage, FLASH_COOKIE};
use kutubxona_shared::auth::password::hash_password;
use kutubxona_shared::auth::session::SESSION_COOKIE;
use kutubxona_shared::db::bootstrap::ensure_bootstrap_admin;
use kutubxona_shared::db::migrations::run_migrations;
use kutubxona_shared::db::pool::{create_pool, DatabaseConfig};
use kutubxona_shared::models::user::{CreateUser, Role, User};
use kutubxona_shared::storage::UploadStore;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::Service as _;

pub const ADMIN_EMAIL: &str = "admin@local";
pub const ADMIN_PASSWORD: &str = "admin123";
pub const USER_PASSWORD: &str = "secret123";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: SqlitePool,
    pub app: axum::Router,
    pub config: Config,
    pub upload_dir: PathBuf,

    /// Bootstrap super admin
    pub admin: User,

    /// Session cookie (`name=value`) of the bootstrap super admin
    pub admin_cookie: String,

    // Dropped last, removes the database and uploads
    _dir: TempDir,
}

impl TestContext {
    /// Creates a new test context with a fresh database and upload directory
    pub async fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        let upload_dir = dir.path().join("uploads");
        let database_url = format!("sqlite://{}", dir.path().join("test.db").display());

        let vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", database_url.clone()),
            ("UPLOAD_DIR", upload_dir.display().to_string()),
            ("SECRET_KEY", "integration-test-secret".to_string()),
            ("BOOTSTRAP_ADMIN_EMAIL", ADMIN_EMAIL.to_string()),
            ("BOOTSTRAP_ADMIN_PASSWORD", ADMIN_PASSWORD.to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned())?;

        // Same pool size the server runs with
        let db = create_pool(DatabaseConfig {
            url: database_url,
            max_connections: config.database.max_connections,
            ..Default::default()
        })
        .await?;
        run_migrations(&db).await?;

        let admin = ensure_bootstrap_admin(
            &db,
            &config.bootstrap.name,
            &config.bootstrap.email,
            &config.bootstrap.password,
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("Bootstrap admin was not created"))?;

        let uploads = UploadStore::new(&upload_dir).await?;
        let app = build_router(AppState::new(db.clone(), config.clone(), uploads));

        let mut ctx = TestContext {
            db,
            app,
            config,
            upload_dir,
            admin,
            admin_cookie: String::new(),
            _dir: dir,
        };

        ctx.admin_cookie = ctx
            .login(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .ok_or_else(|| anyhow::anyhow!("Bootstrap admin could not log in"))?;

        Ok(ctx)
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().call(request).await.unwrap()
    }

    /// GET, optionally with a session cookie
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST an urlencoded form
    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form_body(fields))).unwrap())
            .await
    }

    /// POST a multipart form
    pub async fn post_multipart(
        &self,
        uri: &str,
        body: MultipartBody,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let (content_type, bytes) = body.finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(bytes)).unwrap()).await
    }

    /// Registers through the HTTP form
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Response<Body> {
        self.post_form(
            "/register",
            &[("name", name), ("email", email), ("password", password)],
            None,
        )
        .await
    }

    /// Logs in, returning the session cookie on success
    pub async fn login(&self, email: &str, password: &str) -> Option<String> {
        let response = self
            .post_form("/login", &[("email", email), ("password", password)], None)
            .await;
        session_cookie(&response)
    }

    /// Creates an account with `role` directly and logs it in
    pub async fn user_with_role(&self, name: &str, role: Role) -> (User, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = User::create(
            &self.db,
            CreateUser {
                name: name.to_string(),
                email: email.clone(),
                password_hash: hash_password(USER_PASSWORD).unwrap(),
                role,
            },
        )
        .await
        .unwrap();

        let cookie = self.login(&email, USER_PASSWORD).await.unwrap();
        (user, cookie)
    }

    /// Names in the upload directory, sorted
    pub fn uploaded_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.db)
            .await
            .unwrap()
    }
}

/// Encodes form fields as `application/x-www-form-urlencoded`
pub fn form_body(fields: &[(&str, &str)]) -> String {
    fn encode(value: &str) -> String {
        value
            .replace('%', "%25")
            .replace('&', "%26")
            .replace('+', "%2B")
            .replace('=', "%3D")
            .replace(' ', "+")
    }

    fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Minimal multipart/form-data builder
pub struct MultipartBody {
    boundary: &'static str,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "kutubxona-test-boundary",
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, filename
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Upload form for a material
    pub fn material(material_type: &str, title: &str, file: Option<(&str, &[u8])>) -> Self {
        let body = Self::new()
            .text("material_type", material_type)
            .text("title", title)
            .text("author", "Test Author")
            .text("description", "Test description");
        match file {
            Some((filename, data)) => body.file("file", filename, data),
            None => body,
        }
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (
            format!("multipart/form-data; boundary={}", self.boundary),
            self.body,
        )
    }
}

/// Value of a cookie set by the response, if any
fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Session cookie pair (`kutubxona_session=…`) set by the response
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    set_cookie_value(response, SESSION_COOKIE).map(|token| format!("{}={}", SESSION_COOKIE, token))
}

/// Flash messages set by the response
pub fn flashes(response: &Response<Body>) -> Vec<FlashMessage> {
    set_cookie_value(response, FLASH_COOKIE)
        .map(|value| decode_flashes(&value))
        .unwrap_or_default()
}

/// First flash message text, or an empty string
pub fn flash_text(response: &Response<Body>) -> String {
    flashes(response)
        .into_iter()
        .next()
        .map(|f| f.message)
        .unwrap_or_default()
}

/// `Location` header of a redirect
pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string())
}

/// Parses a JSON body
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}
