//! HTTP service: `GET /`, `POST /upload`, `POST /summarize`, `POST /flashcards`.
//!
//! The service is stateless between requests. [`AppState`] holds only
//! immutable, shared adapters (extractor, models, config), so handlers need
//! no locking.

pub mod error;
pub mod routes;
pub mod state;
pub mod upload;

pub use error::{ApiError, ErrorBody};
pub use routes::{FlashcardsQuery, TextRequest, HEALTH_MESSAGE, TEXT_REQUIRED};
pub use state::AppState;

use crate::config::{env_parse, env_string};
use crate::error::StudyError;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Origins allowed by default (local frontend dev servers).
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://localhost:5173"];

/// Settings for the HTTP layer only.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Maximum request body size in bytes. Default: 50 MiB.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            body_limit_bytes: 50 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Read `STUDYCARDS_HOST`, `_PORT`, `_CORS_ORIGINS` (comma-separated)
    /// and `_BODY_LIMIT` on top of the defaults.
    pub fn from_env() -> Result<Self, StudyError> {
        let mut config = Self::default();
        if let Some(host) = env_string("STUDYCARDS_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("STUDYCARDS_PORT")? {
            config.port = port;
        }
        if let Some(origins) = env_string("STUDYCARDS_CORS_ORIGINS") {
            config.cors_origins = parse_origins(&origins);
        }
        if let Some(limit) = env_parse("STUDYCARDS_BODY_LIMIT")? {
            config.body_limit_bytes = limit;
        }
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/summarize", post(routes::summarize_text))
        .route("/flashcards", post(routes::flashcards))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(state)
}

/// Bind `config.addr()` and serve until Ctrl+C or SIGTERM.
pub async fn serve(state: AppState, config: &ServerConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(
        "studycards v{} listening on http://{}",
        env!("CARGO_PKG_VERSION"),
        listener.local_addr()?
    );

    axum::serve(listener, router(state, config))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_config() {
        let c = ServerConfig::default();
        assert_eq!(c.addr(), "0.0.0.0:8000");
        assert_eq!(c.cors_origins.len(), 2);
        assert_eq!(c.body_limit_bytes, 52_428_800);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins(" http://a.test , ,http://b.test"),
            vec!["http://a.test", "http://b.test"]
        );
    }
}
