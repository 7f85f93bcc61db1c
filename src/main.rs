use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::{info, warn};

mod config;
mod error;
mod handlers;
mod hosting;
mod llm;
mod pipeline;
mod schema;
mod state;
mod utils;

use config::Config;
use handlers::create_app;
use hosting::{CloudinaryUploader, TransientAssetStore};
use llm::GeminiClient;
use pipeline::Pipeline;
use state::AppState;
use utils::http::build_http_client;
use utils::logging::init_logging;
use utils::retry::{OutboundPolicy, RetryPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::load()?;
    let _guards = init_logging(&config);
    for warning in &config.load_warnings {
        warn!("{}", warning);
    }

    info!("Starting artisan studio service");

    let http = build_http_client().context("failed to build HTTP client")?;
    let model = GeminiClient::new(http.clone(), &config);
    let host = CloudinaryUploader::new(http.clone(), &config);

    let store = TransientAssetStore::new(&config.scratch_dir).with_context(|| {
        format!(
            "failed to create scratch directory {}",
            config.scratch_dir.display()
        )
    })?;
    // Older than any slot an upload could still be using.
    store.sweep_stale(config.upload_timeout() * 3);
    info!("Scratch directory: {}", store.dir().display());

    let policy = OutboundPolicy {
        model_timeout: config.model_timeout(),
        seed_fetch_timeout: config.seed_fetch_timeout(),
        upload_timeout: config.upload_timeout(),
        retry: RetryPolicy::new(
            config.outbound_max_retries,
            std::time::Duration::from_millis(config.outbound_retry_base_delay_ms),
        ),
    };
    let pipeline = Pipeline::new(Arc::new(model), Arc::new(host), store, http, policy);
    let app = create_app(AppState::new(pipeline, config.cors_allowed_origins.clone()));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
