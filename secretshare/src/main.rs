//! SecretShare - one-time secret sharing
//!
//! A writer stores a message under a shared key and gets back an id. A reader
//! presenting the id and key receives the message once; it is deleted on read
//! and expires on its own if never read.

mod config;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use secretshare_api::repository::attributes::EXPIRATION_TIME;
use secretshare_api::{create_router, key_schema, SecretRepository, SecretService};
use secretshare_core::SystemClock;
use secretshare_store::{DynamoDbStore, ItemStore, MemoryStore};

use crate::config::{Config, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "secretshare")]
#[command(about = "One-time secret sharing service", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./secretshare.{toml,yaml,json} if present)
    #[arg(short, long, env = "SECRETSHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Use the in-memory store instead of DynamoDB (development only; expired
    /// secrets are never evicted)
    #[arg(long)]
    in_memory: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SECRETSHARE_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    /// Flags win over file and environment
    fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if self.in_memory {
            config.store = StoreConfig::Memory;
        }
    }
}

async fn build_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn ItemStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory store; secrets are lost on restart and expired ones are never evicted");
            Ok(Arc::new(MemoryStore::new(key_schema())))
        }
        StoreConfig::DynamoDb {
            table_name,
            region,
            endpoint_url,
            create_table,
        } => {
            let store = DynamoDbStore::connect(
                region.as_deref(),
                endpoint_url.as_deref(),
                table_name.as_str(),
                key_schema(),
            )
            .await;

            if *create_table {
                store.ensure_table(Some(EXPIRATION_TIME)).await?;
            }

            info!(table = %store.table_name(), endpoint = ?endpoint_url, "Using DynamoDB store");
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("secretshare={},tower_http=debug", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    info!("Starting SecretShare...");

    let store = build_store(&config.store).await?;
    info!("  Store: {}", store.name());
    info!(
        "  CORS: {}",
        if config.server.cors { "enabled" } else { "disabled" }
    );

    let repository = SecretRepository::new(store);
    let service = Arc::new(SecretService::new(repository, Arc::new(SystemClock)));

    // Create router
    let app = create_router(service, config.server.cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SecretShare stopped");
    Ok(())
}
