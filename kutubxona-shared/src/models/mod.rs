/// Database models for Kutubxona
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Accounts and the `Role` hierarchy
/// - `material`: Typed materials and the per-type extension allow-lists
/// - `notification`: Admin-to-user messages and replies
/// - `view_history`: Append-only log of material views
/// - `session`: Server-side login sessions
///
/// # RETURNING Clauses
///
/// Writes with a `RETURNING` clause are read with `fetch_all`, never
/// `fetch_one`/`fetch_optional`. On SQLite a statement left mid-step keeps
/// its implicit transaction open on the pooled connection, and the write
/// stays invisible to every other connection.
///
/// # Example
///
/// ```no_run
/// use kutubxona_shared::models::material::{Material, MaterialFilter, MaterialType};
/// use kutubxona_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let books = Material::list(&pool, MaterialFilter {
///     material_type: Some(MaterialType::Book),
///     ..Default::default()
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod material;
pub mod notification;
pub mod session;
pub mod user;
pub mod view_history;
