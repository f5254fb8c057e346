//! Gateway binary entry point.

use anyhow::Result;
use std::sync::Arc;
use tablegate::{
    auth::MemoryKeyStore,
    config::ServerConfig,
    database::create_driver,
    protocol::GatewayServerBuilder,
    server::{GatewayHandler, ServerStateBuilder},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let config = ServerConfig::builder().from_env()?.build();
    info!("Database: {}", config.database.path);

    let driver = create_driver(&config.database)?;

    // A static key switches off managed keys.
    let use_static_key = config.security.api_key.is_some();
    let mut builder = ServerStateBuilder::new()
        .config(config)
        .driver(driver);
    if use_static_key {
        info!("Authenticating with the configured static API key");
    } else {
        info!("Using managed API keys; the first key may be created without credentials");
        builder = builder.key_store(Arc::new(MemoryKeyStore::new()));
    }
    let state = Arc::new(builder.build()?);

    let handler = GatewayHandler::new(state);
    let server = GatewayServerBuilder::new()
        .handler(handler)
        .name(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .build()?;

    info!("Gateway ready, reading requests from stdin");

    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tablegate=info,warn"));

    // stdout carries responses; logs go to stderr.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
