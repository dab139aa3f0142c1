use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use barcode_proxy::{
    cache::{spawn_sweeper, ImageCache},
    config::Config,
    resolver::ResolverService,
    services::LookupClient,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "barcode-proxy")]
#[command(version)]
#[command(about = "MQTT barcode lookup bridge with an RGB565 image proxy for embedded scanner devices")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("barcode_proxy={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting barcode proxy service v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }

    let api_key = config
        .lookup
        .resolve_api_key(std::env::var("BARCODELOOKUP_API_KEY").ok())
        .context("BARCODELOOKUP_API_KEY is not set and lookup.api_key is empty in the config")?;

    // A new process always starts from an empty cache; a previous run's
    // buffers are never served.
    let cache = ImageCache::new();
    let sweeper = spawn_sweeper(
        cache.clone(),
        std::time::Duration::from_secs(config.cache.sweep_interval_secs),
        chrono::Duration::seconds(config.cache.ttl_secs as i64),
    );
    info!(
        "Image cache initialized, sweeping every {}s (ttl {}s)",
        config.cache.sweep_interval_secs, config.cache.ttl_secs
    );

    let lookup = LookupClient::new(&config, api_key);
    let resolver = ResolverService::new(&config.mqtt, lookup);
    info!(
        "MQTT resolver connecting to {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    let resolver_task = tokio::spawn(resolver.start());

    let web_server = WebServer::new(config, cache)?;
    info!(
        "Starting image proxy server on {}:{}",
        web_server.host(),
        web_server.port()
    );

    tokio::select! {
        result = web_server.serve() => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
    }

    resolver_task.abort();
    sweeper.abort();
    Ok(())
}
