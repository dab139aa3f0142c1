//! Web layer: the HTTP surface of the image proxy.
//!
//! Handlers stay thin; the cache, transcode and fetch logic live in their
//! own modules and errors map to status codes in `errors::types`.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::ImageCache;
use crate::config::Config;

pub mod handlers;

const USER_AGENT: &str = concat!("barcode-proxy/", env!("CARGO_PKG_VERSION"));

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: Config, cache: ImageCache) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        let app = Self::create_router(AppState::new(config, cache));
        Ok(Self { app, addr })
    }

    /// Create the router with all routes and middleware
    pub fn create_router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/image/:image_id", get(handlers::proxy_image))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub cache: ImageCache,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, cache: ImageCache) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.request_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            cache,
            http,
        }
    }
}
