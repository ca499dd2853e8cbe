/// Database layer for Kutubxona
///
/// This module provides connection pooling, migrations, and first-run seeding.
///
/// # Modules
///
/// - `pool`: SQLite connection pool management with health checks
/// - `migrations`: Embedded sqlx migration runner
/// - `bootstrap`: Seeds the bootstrap super-admin account
/// - Models are in the `models` module at crate root level
///
/// # Example
///
/// ```no_run
/// use kutubxona_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: "sqlite://data.db".to_string(),
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod bootstrap;
pub mod migrations;
pub mod pool;
