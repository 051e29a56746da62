//! Relay server binary.
//!
//! Logs go to stderr; configure verbosity with `RUST_LOG`.

use clap::{Args, Parser, Subcommand};
use relayd::{ConfigOverrides, RelayConfig, RelayServer};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "relayd", version, about = "Multi-client line-protocol relay server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay server (default)
    Serve(ServeArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// TOML config file (bind_addr, port, max_clients, repository)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Interface to listen on (default: 127.0.0.1)
    #[arg(long)]
    bind: Option<String>,
    /// TCP port (default: 5000)
    #[arg(long)]
    port: Option<u16>,
    /// Maximum concurrent sessions (default: 3)
    #[arg(long)]
    max_clients: Option<usize>,
    /// Directory served to peers (default: server_repository)
    #[arg(long)]
    repository: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relayd=info")))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => run_server(args),
    }
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
            _ = sigquit.recv() => {},
            _ = tokio::signal::ctrl_c() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    let config = RelayConfig::load(
        args.config.as_deref(),
        ConfigOverrides {
            bind_addr: args.bind,
            port: args.port,
            max_clients: args.max_clients,
            repository: args.repository,
        },
    )?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async move {
        // Bind failure is the only fatal server error.
        let server = RelayServer::bind(&config).await?;

        let cancel = CancellationToken::new();
        let cancel_for_shutdown = cancel.clone();
        tokio::spawn(async move {
            if wait_for_shutdown_signal().await.is_ok() {
                info!("Shutdown signal received");
                cancel_for_shutdown.cancel();
            } else {
                info!("Shutdown signal handler failed; server will continue running");
            }
        });

        server.run(cancel).await;
        Ok::<_, anyhow::Error>(())
    })?;

    info!("Server stopped");
    Ok(())
}
