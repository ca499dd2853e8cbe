/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`session`]: Session token generation and keyed hashing
/// - [`middleware`]: Resolving the session cookie to an [`middleware::AuthContext`]
/// - [`authorization`]: Role tiers, ownership, and role-toggle rules
///
/// # Example
///
/// ```no_run
/// use kutubxona_shared::auth::password::{hash_password, verify_password};
/// use kutubxona_shared::auth::session::generate_session_token;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let (cookie_token, stored_hash) = generate_session_token("server-secret");
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod middleware;
pub mod password;
pub mod session;
