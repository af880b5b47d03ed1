use std::time::Duration;

use mimalloc::MiMalloc;
use student_registry::Config;
use student_registry::db::{PoolSettings, StorePool, StudentsStorage};
use student_registry::middleware::AllowedOrigins;
use student_registry::router::{StudentsState, students_router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const STARTUP_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        port = cfg.port,
        db_host = %cfg.db_host,
        db_name = %cfg.db_name,
        database_url_override = cfg.database_url.is_some(),
        pool_size = cfg.db_pool_size,
        queue_limit = cfg.db_queue_limit,
        loglevel = %cfg.loglevel,
        "configuration loaded"
    );

    let pool = StorePool::open(&cfg.database_url()?, PoolSettings::from(&cfg))?;
    let storage = StudentsStorage::new(pool.clone());

    // The listener starts regardless; data routes fail until the store answers.
    match tokio::time::timeout(STARTUP_PING_TIMEOUT, storage.ping()).await {
        Ok(Ok(())) => {
            info!(backend = ?pool.backend(), "connected to database");
            if cfg.db_init_schema {
                match storage.init_schema().await {
                    Ok(()) => info!("students table ready"),
                    Err(e) => error!(error = %e, "failed to initialize students table"),
                }
            }
        }
        Ok(Err(e)) => warn!(error = %e, "database connection failed; continuing without it"),
        Err(_) => warn!(
            timeout_secs = STARTUP_PING_TIMEOUT.as_secs(),
            "database did not answer in time; continuing without it"
        ),
    }

    let origins = AllowedOrigins::new(cfg.allowed_origins())?;
    let state = StudentsState::new(storage, origins);
    let app = students_router(state);

    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server running on port {}", cfg.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
