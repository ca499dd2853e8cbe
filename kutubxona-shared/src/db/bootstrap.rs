/// First-run seeding
///
/// A fresh database has no way to grant admin rights, so the server seeds one
/// super-admin account on start when its email is not yet registered. The
/// account is never re-seeded or overwritten afterwards.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::auth::password::{hash_password, PasswordError};
use crate::models::user::{normalize_email, CreateUser, Role, User};

/// Error type for bootstrap seeding
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Ensures the bootstrap super-admin exists
///
/// # Returns
///
/// The newly created account, or None if the email was already registered
/// (whatever role that account has now is left alone).
pub async fn ensure_bootstrap_admin(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Option<User>, BootstrapError> {
    let email = normalize_email(email);

    if let Some(existing) = User::find_by_email(pool, &email).await? {
        if existing.role != Role::SuperAdmin {
            warn!(
                user_id = existing.id,
                "Bootstrap admin email belongs to an account without super admin rights"
            );
        }
        return Ok(None);
    }

    let user = User::create(
        pool,
        CreateUser {
            name: name.trim().to_string(),
            email,
            password_hash: hash_password(password)?,
            role: Role::SuperAdmin,
        },
    )
    .await?;

    info!(user_id = user.id, email = %user.email, "Seeded bootstrap super admin");

    Ok(Some(user))
}
