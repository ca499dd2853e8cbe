/// User model and database operations
///
/// This module provides the User model, the role hierarchy, and CRUD
/// operations for accounts.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     admin_level INTEGER NOT NULL DEFAULT 0,
///     created_at TEXT NOT NULL
/// );
/// ```
///
/// # Roles
///
/// - **0 / user**: browse, download, read own notifications
/// - **1 / material admin**: upload books and apps, manage own materials
/// - **2 / super admin**: everything, including role changes and notifications
///
/// # Example
///
/// ```no_run
/// use kutubxona_shared::models::user::{User, CreateUser, Role};
/// use kutubxona_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Alice".to_string(),
///     email: "alice@x.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::User,
/// }).await?;
///
/// let found = User::find_by_email(&pool, "alice@x.com").await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Access tier stored in `users.admin_level`
///
/// Ordering is `User < MaterialAdmin < SuperAdmin`; every capability of a lower
/// tier is held by the higher ones, except that material admins are confined
/// to materials they uploaded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Plain registered account
    User = 0,

    /// Scoped admin: uploads books and apps, manages only own materials
    MaterialAdmin = 1,

    /// Full control over materials, users, and notifications
    SuperAdmin = 2,
}

impl Role {
    /// Numeric level as stored in the database
    pub fn level(&self) -> i32 {
        *self as i32
    }

    /// Maps a stored level back to a role
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Role::User),
            1 => Some(Role::MaterialAdmin),
            2 => Some(Role::SuperAdmin),
            _ => None,
        }
    }

    /// Checks if this role is at least as privileged as `required`
    pub fn has_permission(&self, required: &Role) -> bool {
        self >= required
    }

    /// Any admin tier (level 1 or 2)
    pub fn is_admin(&self) -> bool {
        self.has_permission(&Role::MaterialAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    /// Whether material visibility and actions are limited to own uploads
    pub fn is_ownership_scoped(&self) -> bool {
        matches!(self, Role::MaterialAdmin)
    }
}

/// User model representing a registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Autoincrement ID; the lowest ID is the bootstrap super-admin
    pub id: i64,

    /// Display name
    pub name: String,

    /// Email address, stored trimmed and lowercased
    pub email: String,

    /// Argon2id password hash, never serialized into responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Access tier
    #[sqlx(rename = "admin_level")]
    pub role: Role,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address (caller normalizes)
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Initial role, `Role::User` for self-registration
    pub role: Role,
}

/// Normalizes an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns a database error whose `is_unique_violation()` is true when the
    /// email already exists.
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, admin_level, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, email, password_hash, admin_level, created_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .bind(Utc::now())
        .fetch_all(pool)
        .await?
        .pop()
        .ok_or(sqlx::Error::RowNotFound)?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin_level, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    ///
    /// The argument is normalized before lookup.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin_level, created_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Returns the first account ever created (lowest ID)
    ///
    /// Replies from the notification mailbox are addressed to this account,
    /// which is the seeded bootstrap super-admin on a fresh install.
    pub async fn first_created(pool: &SqlitePool) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin_level, created_at
            FROM users
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Lists all users, oldest first
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, admin_level, created_at
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Sets a user's role
    ///
    /// # Returns
    ///
    /// True if the user was found and updated
    pub async fn set_role(pool: &SqlitePool, id: i64, role: Role) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET admin_level = ? WHERE id = ?")
            .bind(role)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts total number of users
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
