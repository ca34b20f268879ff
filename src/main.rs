use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use lead_intake::api::{CorsPolicy, lead_routes};
use lead_intake::config::IntakeConfig;
use lead_intake::pipeline::IntakeDeps;
use lead_intake::ratelimit::{FixedWindowLimiter, spawn_prune_task};

/// How often expired rate-limit windows are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::load().context("Invalid configuration")?;

    eprintln!("📨 Lead Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://{}", config.listen_addr);
    eprintln!("   Notify: {}", config.notify.operations_to);
    eprintln!(
        "   Rate limit: {} per {}s",
        config.rate_limit.max_requests,
        config.rate_limit.window.as_secs()
    );

    // ── Rate limiter ────────────────────────────────────────────────────
    let limiter = Arc::new(FixedWindowLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window,
    ));
    let _prune_handle = spawn_prune_task(Arc::clone(&limiter), PRUNE_INTERVAL);

    // ── Store + mailer ──────────────────────────────────────────────────
    let deps = IntakeDeps::from_config(&config, limiter)
        .await
        .context("Failed to set up backends")?;
    eprintln!("   Store: {}", deps.store.name());
    eprintln!("   Mailer: {}", deps.mailer.name());

    let app = lead_routes(deps, CorsPolicy::new(config.allowed_origins.iter().cloned()));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "Lead intake server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
    })
    .await
    .context("Server error")?;

    Ok(())
}
