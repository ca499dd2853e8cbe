/// Session token utilities
///
/// A session token is 32 random base62 characters handed to the browser in
/// the session cookie. Only its keyed hash is stored, see
/// `models::session::Session`.
///
/// # Security
///
/// - **Randomness**: `rand::thread_rng()`, 62^32 ≈ 2^190 key space
/// - **Storage**: HMAC-SHA256 keyed with the server secret, hex encoded
/// - **Transport**: `HttpOnly; SameSite=Lax` cookie, `Secure` in production
///
/// # Example
///
/// ```
/// use kutubxona_shared::auth::session::{generate_session_token, hash_session_token};
///
/// let (token, hash) = generate_session_token("server-secret");
/// assert_eq!(token.len(), 32);
/// assert_eq!(hash, hash_session_token(&token, "server-secret"));
/// ```

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "kutubxona_session";

/// Length of a session token in characters
pub const SESSION_TOKEN_LENGTH: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Generates a new session token
///
/// # Returns
///
/// Tuple of (plaintext_token, keyed_hash)
pub fn generate_session_token(secret: &str) -> (String, String) {
    let token = generate_random_string(SESSION_TOKEN_LENGTH);
    let hash = hash_session_token(&token, secret);

    (token, hash)
}

/// Generates a random base62 string
fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a session token with HMAC-SHA256 keyed by `secret`
///
/// # Returns
///
/// Hex-encoded MAC (64 characters)
pub fn hash_session_token(token: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(token.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

/// Checks that a cookie value looks like a token we issued
///
/// Malformed values are rejected before touching the database.
pub fn validate_session_token_format(token: &str) -> bool {
    token.len() == SESSION_TOKEN_LENGTH && token.chars().all(|c| c.is_ascii_alphanumeric())
}
