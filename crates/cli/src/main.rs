//! Carebot CLI.
//!
//! # Usage
//!
//! ```bash
//! # Start the web front-end on the configured address
//! carebot serve
//!
//! # Override the bind address
//! carebot serve --port 8080 --bind-all
//!
//! # Check backend reachability and exit
//! carebot check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use carebot_web::{AppState, WebConfig};

#[derive(Parser)]
#[command(name = "carebot")]
#[command(author, version, about = "Carebot web front-end")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Bind host, overriding CAREBOT_HOST
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding CAREBOT_PORT
        #[arg(long)]
        port: Option<u16>,

        /// Bind on 0.0.0.0 regardless of the configured host
        #[arg(long, conflicts_with = "host")]
        bind_all: bool,
    },
    /// Ping the chat backend and report readiness
    Check,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("carebot=info,carebot_web=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Serve {
            host,
            port,
            bind_all,
        } => {
            let mut config = WebConfig::from_env()?;
            if bind_all {
                config.host = "0.0.0.0".to_owned();
            } else if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            tracing::info!(addr = %config.bind_addr(), "Starting server");
            carebot_web::serve(config).await?;
        }
        Commands::Check => {
            let config = WebConfig::from_env()?;
            let state = AppState::new(config)?;
            match state.backend().ping().await {
                Ok(()) => tracing::info!("Chat backend is reachable"),
                Err(e) => {
                    tracing::error!(error = %e, "Chat backend is unreachable");
                    std::process::exit(2);
                }
            }
        }
    }
    Ok(())
}
