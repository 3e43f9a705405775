// Main entry point for Mongo Admin

use mongo_admin::api::{create_router, AppState, DocumentStore};
use mongo_admin::auth::audit_logger::AuditLogger;
use mongo_admin::auth::user_store::{BootstrapAdmin, UserDirectory};
use mongo_admin::config::{Config, StoreBackend};
use mongo_admin::loader::upload::UploadDir;
use mongo_admin::state::{MemoryStore, MokaSessionStore, MongoStore};
use mongo_admin::views::Views;

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

/// Upper bound on live sessions held in memory
const SESSION_CAPACITY: u64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = Config::from_env().context("Configuration error")?;

    // 2. Tracing can only be initialized once
    init_tracing(&config)?;

    info!("Starting Mongo Admin");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        backend = ?config.store_backend,
        mongo_uri = %config.masked_mongo_uri(),
        "Configuration loaded"
    );

    // 3. Document store
    let store: Arc<dyn DocumentStore + Send + Sync> = match config.store_backend {
        StoreBackend::Mongo => {
            let timeout = Duration::from_secs(config.mongo_connect_timeout_secs);
            let mongo = MongoStore::connect(&config.mongo_uri, timeout)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to connect to MongoDB");
                    e
                })?;
            Arc::new(mongo)
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // 4. Users and the bootstrap admin
    let users = Arc::new(UserDirectory::new(
        store.clone(),
        config.auth_db_name.clone(),
        config.password_hash_iterations,
        BootstrapAdmin {
            username: config.bootstrap_admin_username.clone(),
            password: config.bootstrap_admin_password.clone(),
        },
    ));
    match users.ensure_bootstrap_admin().await {
        Ok(true) => info!(username = %config.bootstrap_admin_username, "Bootstrap admin created"),
        Ok(false) => {}
        // The store may come up later; login retries the bootstrap
        Err(e) => warn!(error = %e, "Could not ensure bootstrap admin at startup"),
    }

    // 5. Sessions, uploads, templates
    let sessions = Arc::new(MokaSessionStore::new(
        Duration::from_secs(config.session_ttl_secs),
        SESSION_CAPACITY,
    ));

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;
    let uploads = Arc::new(
        UploadDir::new(config.upload_dir.clone())
            .with_max_age(Duration::from_secs(config.upload_max_age_secs)),
    );

    let views = Arc::new(Views::new()?);

    let app_state = AppState {
        store,
        users,
        sessions,
        uploads,
        views,
        audit_logger: Arc::new(AuditLogger::new()),
        config: Arc::new(config.clone()),
    };

    let router = create_router(app_state);

    // 6. Start HTTP server
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    let initialized = if config.log_format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
    initialized.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
