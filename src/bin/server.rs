//! `tablegate` Server Binary
//!
//! Connects to ClickHouse (with bounded retry) and serves the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! # Start server with config.toml / config.local.toml / env
//! cargo run --bin tablegate-server
//!
//! # Override bind address or config file
//! cargo run --bin tablegate-server -- --host 0.0.0.0 --port 8000 --config prod.toml
//! ```

use tablegate::gateway::{connect_with_retry, RetryPolicy};
use tablegate::logging::init_tracing;
use tablegate::protocol::rest;
use tablegate::protocol::Handler;
use tablegate::Config;

use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    // Load configuration
    let mut config = match get_arg(&args, "--config") {
        Some(path) => Config::from_file(&path)?,
        None => Config::load()?,
    };

    init_tracing(&config.logging);

    // Override HTTP config from command line
    if let Some(host) = get_arg(&args, "--host") {
        config.http.host = host;
    }
    if let Some(port) = get_arg(&args, "--port").and_then(|p| p.parse().ok()) {
        config.http.port = port;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database.base_url(),
        schema_cache_ttl_secs = config.schema.cache_ttl_secs,
        "starting tablegate"
    );

    let handler = Arc::new(Handler::from_config(&config)?);

    // Startup is the only place the connection is retried
    let policy = RetryPolicy::from_config(&config.database);
    if let Err(e) = connect_with_retry(handler.database().as_ref(), &policy).await {
        tracing::error!(error = %e, budget_secs = policy.budget.as_secs(), "database unreachable, aborting startup");
        return Err(e.into());
    }

    rest::start_http_server(handler, &config.http)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(())
}

fn get_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}
