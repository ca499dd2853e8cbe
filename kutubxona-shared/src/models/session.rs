/// Server-side login sessions
///
/// The browser holds only a random token in a cookie; the database holds the
/// HMAC of that token (see `auth::session`). A leaked database therefore does
/// not yield usable cookies.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     token_hash TEXT PRIMARY KEY,
///     user_id INTEGER NOT NULL REFERENCES users(id),
///     created_at TEXT NOT NULL,
///     expires_at TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use super::user::{Role, User};

/// Session row
///
/// Name and role are not stored here; [`SessionIdentity`] reads the live
/// values from `users` on every request.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Identity behind a live session, joined with the current user row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub name: String,
    #[sqlx(rename = "admin_level")]
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl SessionIdentity {
    /// Checks if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

impl Session {
    /// Creates a session for `user` that lives for `lifetime`
    pub async fn create(
        pool: &SqlitePool,
        token_hash: &str,
        user: &User,
        lifetime: Duration,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();

        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token_hash, user_id, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            RETURNING token_hash, user_id, created_at, expires_at
            "#,
        )
        .bind(token_hash)
        .bind(user.id)
        .bind(now)
        .bind(now + lifetime)
        .fetch_all(pool)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(session)
    }

    /// Resolves a token hash to the current identity of its user
    ///
    /// Returns None when no session matches, when it has expired (the row is
    /// removed on the way), or when the user no longer exists.
    pub async fn resolve(
        pool: &SqlitePool,
        token_hash: &str,
    ) -> Result<Option<SessionIdentity>, sqlx::Error> {
        let identity = sqlx::query_as::<_, SessionIdentity>(
            r#"
            SELECT u.id AS user_id, u.name, u.admin_level, s.expires_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ?
            "#,
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await?;

        match identity {
            Some(identity) if identity.is_expired() => {
                debug!(user_id = identity.user_id, "Session expired");
                Self::delete(pool, token_hash).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    /// Deletes a session
    ///
    /// # Returns
    ///
    /// True if a session was removed
    pub async fn delete(pool: &SqlitePool, token_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes every expired session
    ///
    /// # Returns
    ///
    /// Number of sessions removed
    pub async fn purge_expired(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
