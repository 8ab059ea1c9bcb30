use std::net::SocketAddr;
use std::sync::Arc;

mod ai;
mod api;
mod config;
mod db;
mod error;
mod feed;
mod models;
mod pipeline;
mod services;

use api::AppState;
use config::Config;
use db::Repository;
use error::Result;
use pipeline::Pipeline;
use services::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let config = Config::load()?;
    let repo = Arc::new(Repository::new(&config.db_path).await?);
    let pipeline = Arc::new(Pipeline::from_config(repo.clone(), &config));

    // One-shot fetch mode: run the pipeline once and exit
    if args.iter().any(|a| a == "--fetch") {
        let limit = args
            .iter()
            .find_map(|a| a.strip_prefix("--limit=").and_then(|v| v.parse().ok()))
            .or_else(|| {
                std::env::var("FETCH_LIMIT")
                    .ok()
                    .and_then(|v| v.parse().ok())
            });

        if let Some(limit) = limit {
            tracing::info!("Limiting to {} articles", limit);
        }

        let summary = pipeline.run(limit).await?;

        println!("Fetch Summary:");
        println!("  Processed: {}", summary.processed);
        println!("  Added: {}", summary.added);
        println!("  Skipped: {}", summary.skipped);
        return Ok(());
    }

    let mut scheduler = Scheduler::new();
    scheduler.start(pipeline, config.fetch_interval_minutes);

    let app = api::create_router(AppState { repo });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server running at http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop();
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("Shutting down...");
}
