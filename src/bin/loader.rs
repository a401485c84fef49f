//! `tablegate` Parquet Loader
//!
//! Copies a Parquet object from S3-compatible storage (MinIO by default)
//! into a ClickHouse table, creating the table if needed.
//!
//! ```bash
//! cargo run --bin tablegate-loader -- --bucket data --object events.parquet --table events
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use tablegate::gateway::{connect_with_retry, ClickHouseHttp, RetryPolicy};
use tablegate::loader::{build_object_store, load_parquet};
use tablegate::logging::init_tracing;
use tablegate::Config;

#[derive(Parser, Debug)]
#[command(name = "tablegate-loader", version, about = "Load a Parquet object into ClickHouse")]
struct Args {
    /// Bucket holding the Parquet object
    #[arg(long)]
    bucket: String,

    /// Object key of the Parquet file
    #[arg(long)]
    object: String,

    /// Destination table
    #[arg(long)]
    table: String,

    /// Rows per insert batch (defaults to loader.batch_size)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Configuration file (defaults to config.toml / config.local.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(&path.to_string_lossy()),
        None => Config::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config.logging);

    let db = ClickHouseHttp::new(&config.database).context("failed to build database client")?;
    connect_with_retry(&db, &RetryPolicy::from_config(&config.database))
        .await
        .context("database unreachable")?;

    let store = build_object_store(&config.loader, &args.bucket)
        .context("failed to configure object storage")?;
    let batch_size = args.batch_size.unwrap_or(config.loader.batch_size);

    let report = load_parquet(store, &args.object, &db, &args.table, batch_size)
        .await
        .with_context(|| format!("failed to load {}/{}", args.bucket, args.object))?;

    println!(
        "Loaded {} rows into {} in {:.2}s",
        report.rows,
        report.table,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}
