use pension::adapters::{BalanceCache, MemoryBalanceCache, PostgresStore, RedisBalanceCache};
use pension::config::{AppConfig, LoggingConfig};
use pension::error::{PensionError, Result};
use pension::{Application, Ports};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`. A daily-rolling file is added when
/// `PENSION_LOG_DIR` points at a writable directory; keep the returned guard
/// alive so buffered lines are flushed on exit.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},pension=debug,sqlx=warn", config.level)));

    let (file_layer, guard) = match std::env::var("PENSION_LOG_DIR") {
        Ok(log_dir) => match file_writer(&log_dir) {
            Ok((writer, guard)) => (
                Some(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                ),
                Some(guard),
            ),
            Err(e) => {
                eprintln!(
                    "Warning: Could not write to log directory {} ({}), file logging disabled",
                    log_dir, e
                );
                (None, None)
            }
        },
        Err(_) => (None, None),
    };

    let (plain_layer, json_layer) = if config.json {
        (None, Some(tracing_subscriber::fmt::layer().json().with_target(true)))
    } else {
        (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            ),
            None,
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    guard
}

// `rolling::daily` panics if it cannot create the first file, so check first
fn file_writer(
    log_dir: &str,
) -> std::io::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(log_dir)?;
    let marker = std::path::Path::new(log_dir).join(".pension_write_test");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker)?;
    let _ = std::fs::remove_file(&marker);

    let appender = tracing_appender::rolling::daily(log_dir, "pension.log");
    Ok(tracing_appender::non_blocking(appender))
}

async fn connect(config: &AppConfig) -> Result<PostgresStore> {
    let store = PostgresStore::new(&config.database.url, config.database.max_connections).await?;
    store.migrate().await?;
    Ok(store.with_yield_rate(config.plan.yield_rate))
}

async fn balance_cache(config: &AppConfig) -> Result<Arc<dyn BalanceCache>> {
    match &config.cache.redis_url {
        Some(url) => {
            let cache = RedisBalanceCache::from_url(url)?;
            cache.ping().await?;
            info!("Using Redis balance cache");
            Ok(Arc::new(cache))
        }
        None => {
            warn!("cache.redis_url not set, using in-process balance cache");
            Ok(Arc::new(MemoryBalanceCache::new()))
        }
    }
}

pub async fn run_migrate(config: &AppConfig) -> Result<()> {
    connect(config).await?;
    Ok(())
}

pub async fn run_seed(config: &AppConfig) -> Result<()> {
    connect(config).await?.seed_demo_data().await?;
    info!("Demo data seeded");
    Ok(())
}

pub async fn run_serve(config: &AppConfig) -> Result<()> {
    let store = Arc::new(connect(config).await?);
    let cache = balance_cache(config).await?;

    let app = Application::new(Ports::from_store(store, cache), config);
    let consumers = app.start_consumers().await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Pension API listening on {}", addr);

    axum::serve(listener, app.router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PensionError::Internal(format!("HTTP server error: {}", e)))?;

    info!("HTTP server stopped, draining broker");
    if let Err(e) = app.broker.wait_idle(Duration::from_secs(5)).await {
        warn!("{}", e);
    }
    app.broker.shutdown();
    for handle in consumers {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
