use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use numbrush_server::{app, logging, run_flush_loop, sessions, AppState, FileStorage, FLUSH_INTERVAL};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Holds `projects/<id>.json` templates and `sessions/<id>.bin` files.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,
    /// Origin used in `colored_image_url`; defaults to http://localhost:<port>.
    #[arg(long)]
    public_url: Option<String>,
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init().context("failed to install logger")?;

    let storage = FileStorage::create(&args.data_dir)
        .await
        .with_context(|| format!("failed to prepare {}", args.data_dir.display()))?;
    let public_url = args
        .public_url
        .unwrap_or_else(|| format!("http://localhost:{}", args.port));
    let state = AppState::new(Arc::new(storage), public_url);

    let flush = tokio::spawn(run_flush_loop(state.clone(), FLUSH_INTERVAL));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(port = args.port, data_dir = %args.data_dir.display(), "store listening");

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    flush.abort();
    let flushed = sessions::flush_dirty(&state).await;
    tracing::info!(flushed, "shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
