use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle::{bootstrap, signals, Bootstrap, Shutdown, ShutdownOutcome};
use edge_gateway::observability::logging;

#[derive(Debug, Parser)]
#[command(name = "edge-gateway", version, about = "HTTP edge gateway with static routing and CORS")]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit without binding.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("edge-gateway: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    if cli.check {
        println!(
            "configuration ok: {} route(s), listening on {}",
            config.gateway.routes.len(),
            config.bind_address()
        );
        return Ok(());
    }

    logging::init(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.bind_address(),
        routes = config.gateway.routes.len(),
        "edge-gateway starting"
    );

    let Bootstrap { server, listener } = bootstrap(&config).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if let Err(e) = signals::wait_for_termination().await {
            tracing::error!(error = %e, "Failed to install signal handlers, shutting down");
        }
        shutdown.trigger();
    });

    match server.run(listener, server_shutdown).await? {
        ShutdownOutcome::Graceful => tracing::info!("Shutdown complete"),
        ShutdownOutcome::Forced { open_connections } => tracing::warn!(
            open_connections,
            "Shutdown complete, connections closed at grace deadline"
        ),
    }

    Ok(())
}
