use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{header, Method};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use musebot_api::backend::build_backend;
use musebot_api::config::Config;
use musebot_api::provider::ProviderRegistry;
use musebot_api::reconciler::{forward_events, Reconciler};
use musebot_api::routes::build_router;
use musebot_api::services::{build_authenticator, AuthConfig, AuthService};
use musebot_api::websocket::Hub;
use musebot_api::AppState;

/// Buffered change events between the reconciler and the hub
const CHANGE_EVENT_BUFFER: usize = 256;

/// Build the CORS layer based on configuration.
///
/// In production mode:
/// - If `CORS_ORIGINS` is set, only those origins are allowed
/// - If `CORS_ORIGINS` is not set, CORS requests are rejected (no origins allowed)
///
/// In development mode:
/// - If `CORS_ORIGINS` is set, those origins are used
/// - If `CORS_ORIGINS` is not set, permissive CORS is used for convenience
fn build_cors_layer(config: &Config) -> CorsLayer {
    match &config.cors_allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let allowed_origins: Vec<_> = origins
                .iter()
                .filter_map(|origin| {
                    origin.parse().ok().or_else(|| {
                        tracing::warn!("Invalid CORS origin '{}', skipping", origin);
                        None
                    })
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::error!("No valid CORS origins configured, CORS requests will be rejected");
                return CorsLayer::new();
            }

            tracing::info!(
                "CORS configured with {} allowed origin(s): {:?}",
                allowed_origins.len(),
                origins
            );
            CorsLayer::new()
                .allow_origin(allowed_origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(3600))
        }
        _ if config.is_production() => {
            tracing::warn!(
                "CORS_ORIGINS not configured in production mode. \
                 CORS requests will be rejected."
            );
            CorsLayer::new()
        }
        _ => {
            tracing::warn!("Using permissive CORS in development mode");
            CorsLayer::permissive()
        }
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "musebot_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!(
        environment = ?config.environment(),
        backend = %config.backend,
        "Starting musebot daemon on port {}",
        config.port
    );

    let authenticator = build_authenticator(&config)?;
    let auth_service = AuthService::new(
        AuthConfig::with_expiry_string(config.jwt_secret.clone(), &config.jwt_expiry),
        authenticator,
    );

    let backend = build_backend(&config)?;
    let providers = ProviderRegistry::from_config(&config)?;
    let hub = Hub::spawn();

    let shutdown = CancellationToken::new();

    // Reconciler -> change events -> hub
    let (events_tx, events_rx) = mpsc::channel(CHANGE_EVENT_BUFFER);
    let reconciler = Reconciler::new(
        backend.clone(),
        events_tx,
        Duration::from_millis(config.poll_interval_ms),
    );
    let reconciler_task = tokio::spawn(reconciler.run(shutdown.clone()));
    tokio::spawn(forward_events(events_rx, hub.clone()));

    let state = AppState::new(
        auth_service,
        backend,
        providers,
        hub,
        config.ws_mailbox_capacity,
    );

    let app = build_router(&state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = reconciler_task.await {
        tracing::warn!(error = %e, "Reconciler task ended abnormally");
    }

    tracing::info!("musebot daemon stopped");
    Ok(())
}
