/// Middleware modules for the API server
///
/// - `guards`: login, admin and super admin gates for route groups
/// - `security`: security response headers

pub mod guards;
pub mod security;
