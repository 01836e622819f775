use anyhow::Result;
use clap::Parser;
use olist_etl::{config::Args, pipeline};
use std::env;
use tokio::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();

    // ─── 2) resolve job arguments ────────────────────────────────────
    let args = Args::parse();
    info!(
        input = %args.input_bucket,
        output = %args.output_bucket,
        prefix = %args.prefix,
        "startup"
    );

    // ─── 3) connect buckets ──────────────────────────────────────────
    let job = pipeline::Job::from_args(&args).await?;

    // ─── 4) list → read → transform → write, one file at a time ──────
    let start = Instant::now();
    let summary = pipeline::run(&job).await?;

    info!(
        files = summary.files,
        rows = summary.rows,
        bytes = summary.bytes,
        elapsed = ?start.elapsed(),
        "all done"
    );
    info!(summary = %serde_json::to_string(&summary)?, "run summary");
    Ok(())
}
