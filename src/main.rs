use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, sync::watch};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use synology_webhook::{
    config::{Config, ServerOptions},
    filter::ZoneFilter,
    handlers::{self, AppState},
    health::{self, HealthStatus},
    synology::SynologyClient,
    SynologyProvider,
};

/// external-dns webhook for Synology DSM DNS Server.
#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it.
    #[arg(long, default_value = "info")]
    log_level: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for SIGINT: {e}");
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
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received. Shutting down the webhook."),
        _ = terminate => info!("SIGTERM received. Shutting down the webhook."),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => {
            eprintln!(
                "[tracing] using RUST_LOG={}",
                std::env::var("RUST_LOG").unwrap_or_default()
            );
            f
        }
        Err(_) => {
            let default = format!("synology_webhook={0},server={0},tower_http={0}", args.log_level);
            match EnvFilter::try_new(&default) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("[tracing] invalid --log-level {} ({e}), defaulting to info", args.log_level);
                    EnvFilter::new("synology_webhook=info,server=info,tower_http=info")
                }
            }
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(false)
                .with_ansi(true),
        )
        .init();

    let opts = ServerOptions::from_env().context("reading server options")?;

    // ── health server ────────────────────────────────────────────────────────
    let health_status = HealthStatus::default();
    let health_listener = TcpListener::bind(opts.health_address())
        .await
        .with_context(|| format!("binding health server on {}", opts.health_address()))?;
    info!("Starting liveness and readiness server on {}", opts.health_address());
    let health_app = health::router(health_status.clone());
    let health_server = tokio::spawn(async move { axum::serve(health_listener, health_app).await });

    // ── provider ─────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("reading provider configuration")?;
    info!("Synology DSM : {}", cfg.dsm_base_url());
    info!("Dry run      : {}", cfg.dry_run);

    let client = SynologyClient::connect(&cfg)
        .await
        .context("logging in to Synology DSM")?;
    let zone_filter = ZoneFilter::new(cfg.domain_filter_list(), |msg| info!("{msg}"));
    let provider = SynologyProvider::new(client, zone_filter, cfg.dry_run);

    // ── webhook ──────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState {
        provider: Arc::new(provider),
        shutdown: shutdown_rx.clone(),
        request_timeout: opts.write_timeout(),
    };
    let app = handlers::router(state).layer(tower_http::timeout::TimeoutLayer::new(
        opts.read_timeout() + opts.write_timeout(),
    ));

    let listener = TcpListener::bind(opts.webhook_address())
        .await
        .with_context(|| format!("binding webhook server on {}", opts.webhook_address()))?;
    info!("Starting webhook server on {}", opts.webhook_address());

    health_status.set_healthy(true);
    health_status.set_ready(true);

    let signal_status = health_status.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_status.set_healthy(false);
        signal_status.set_ready(false);
        let _ = shutdown_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stopping| *stopping).await;
        })
        .await
        .context("webhook server")?;

    health_server.abort();
    info!("webhook stopped");
    Ok(())
}
