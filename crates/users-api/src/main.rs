//! `users-api` — binary entry point.
//!
//! Startup sequence:
//! 1. Load `.env` (if any), then load and validate [`Config`] from environment variables.
//! 2. Initialise the tracing subscriber (JSON logs, optional OTLP export).
//! 3. Without `KEY_ID`: provision a data-encryption key, print its id, exit.
//! 4. With `KEY_ID`: build the encryption settings and the per-request client
//!    factory, then serve the HTTP API until Ctrl-C / SIGTERM.

mod config;
mod db;
mod encryption;
mod keys;
mod server;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use db::{ClientFactory, MongoUserStore};
use encryption::EncryptionSettings;
use server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    dotenvy::dotenv().ok();
    // Telemetry is not up yet; the error is reported once, by `main`'s return.
    let cfg = Config::from_env().context("configuration invalid")?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), "users-api starting");

    // -----------------------------------------------------------------------
    // 3. Key provisioning (one-shot)
    // -----------------------------------------------------------------------
    let Some(key_id) = cfg.data_key_id()? else {
        info!("KEY_ID not set; provisioning a new data key");
        let key_id = keys::provision_data_key(&cfg).await?;
        println!("Add this KEY_ID to your .env file: {}", key_id.to_base64());
        telemetry::shutdown_telemetry();
        return Ok(());
    };

    // -----------------------------------------------------------------------
    // 4. HTTP server
    // -----------------------------------------------------------------------
    let encryption = EncryptionSettings::for_users(&cfg, &key_id)?;
    let factory = ClientFactory::new(&cfg, Some(encryption))
        .await
        .context("failed to parse MONGO_URI")?;
    let users = MongoUserStore::new(factory, &cfg.database_name, &cfg.users_collection);
    let router = server::router::build(AppState::new(Arc::new(users)));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, key_id = %key_id, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("users-api stopped");
    telemetry::shutdown_telemetry();
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
