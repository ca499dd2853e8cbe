//! # Kutubxona API Server
//!
//! Serves the Kutubxona library: registration and login, browsing and
//! downloading materials, the admin panel with ownership-scoped material
//! management, and the notification mailbox.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment
//! 2. Open the SQLite pool and run migrations
//! 3. Seed the bootstrap super admin if its email is unknown
//! 4. Purge expired sessions
//! 5. Prepare the upload directory, optionally sweeping orphaned files
//! 6. Serve until Ctrl-C
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p kutubxona-api
//! ```

use anyhow::Context;
use kutubxona_api::{
    app::{build_router, AppState},
    config::Config,
};
use kutubxona_shared::{
    db::{
        bootstrap::ensure_bootstrap_admin,
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    models::{material::Material, session::Session},
    storage::UploadStore,
};
use std::collections::HashSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!(
        "Kutubxona API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await
    .context("Failed to open database")?;

    run_migrations(&pool).await.context("Failed to run migrations")?;

    if let Some(admin) = ensure_bootstrap_admin(
        &pool,
        &config.bootstrap.name,
        &config.bootstrap.email,
        &config.bootstrap.password,
    )
    .await?
    {
        tracing::warn!(
            user_id = admin.id,
            email = %admin.email,
            "Seeded bootstrap super admin; change its password"
        );
    }

    let purged = Session::purge_expired(&pool).await?;
    tracing::debug!(purged, "Expired sessions purged");

    let uploads = UploadStore::new(&config.uploads.dir)
        .await
        .context("Failed to prepare upload directory")?;

    if config.uploads.sweep_orphans_on_start {
        let referenced: HashSet<String> = Material::referenced_filenames(&pool)
            .await?
            .into_iter()
            .collect();
        let removed = uploads.sweep_orphans(&referenced).await?;
        tracing::info!(removed, "Orphaned uploads swept");
    }

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(pool.clone(), config, uploads));

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Installs the tracing subscriber
///
/// `RUST_LOG` selects what is logged; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "kutubxona_api=debug,kutubxona_shared=debug,tower_http=debug".into()
    });

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
