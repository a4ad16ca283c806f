use std::sync::Arc;

use clap::Parser;
use dbexplorer::{Config, Dispatcher, Explorer, server};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "dbexplorer=info,tower_http=info";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::parse();
    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let explorer = Explorer::connect(&config.database_url, config.max_connections)
        .await?
        .with_query_timeout(config.query_timeout());
    info!(tables = explorer.catalog().tables().len(), "explorer ready");

    let listener = TcpListener::bind(config.listen).await?;
    server::serve(listener, Dispatcher::new(Arc::new(explorer))).await?;
    Ok(())
}
