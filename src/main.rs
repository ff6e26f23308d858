use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod routes;
mod services;
#[cfg(test)]
mod test_utils;

use config::Config;
use services::init;
use services::notify::{Notifier, SmtpNotifier};
use services::weather::WeatherService;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub weather: WeatherService,
    /// Email notifier; `None` when SMTP credentials are not configured.
    pub notifier: Option<Arc<dyn Notifier>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gameon_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting GameOn backend");

    // Initialize database
    let pool = init::init_db(&config).await?;

    let weather = WeatherService::new(&config.weather)?;
    let notifier = SmtpNotifier::from_config(&config.email)?
        .map(|n| Arc::new(n) as Arc<dyn Notifier>);

    let app_state = Arc::new(AppState {
        db: pool,
        config: config.clone(),
        weather,
        notifier,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", routes::lookup::router())
        .nest("/api/games", routes::games::router())
        .nest("/api/events", routes::events::router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(
                    config
                        .server
                        .frontend_url
                        .parse::<HeaderValue>()
                        .map_err(|_| anyhow::anyhow!("Invalid FRONTEND_URL for CORS"))?,
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([axum::http::header::CONTENT_TYPE, axum::http::header::ACCEPT]),
        );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to bind SIGTERM");
        tokio::select! {
            _ = ctrl_c => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("Failed to bind Ctrl+C");
    }

    tracing::info!("Shutdown signal received");
}
