use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use signpost::config::Args;
use signpost::server::{self, ServerState};
use signpost::{Coordinator, RegisterStore, WaitRegistry};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("signpost=info".parse()?),
        )
        .init();

    let args = Args::parse();

    std::fs::create_dir_all(&args.state_dir).with_context(|| {
        format!("failed to create state directory {}", args.state_dir.display())
    })?;

    info!(
        state_dir = %args.state_dir.display(),
        port = args.port,
        bind = %args.bind,
        poll_timeout_secs = args.poll_timeout_secs,
        "starting signpost"
    );

    let coordinator = Arc::new(Coordinator::new(
        RegisterStore::new(&args.state_dir),
        WaitRegistry::new(),
        args.poll_timeout(),
    ));

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
        .parse()
        .context("invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    server::serve(listener, ServerState { coordinator }).await
}
