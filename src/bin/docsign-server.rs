//! The binary docsign-server.

use clap::Parser;
use docsign::{Config, SignServer};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("docsign=info,tower_http=info"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("Terminating...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_json);

    tracing::info!(?config, "Starting docsign-server");

    let server = SignServer::bind(config).await?;
    tracing::info!("Listening on http://{}", server.local_addr());

    server.serve_with_shutdown(shutdown_signal()).await?;
    Ok(())
}
