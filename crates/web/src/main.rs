//! Web front-end binary.

#![cfg_attr(not(test), forbid(unsafe_code))]

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use carebot_web::{WebConfig, serve};

#[tokio::main]
async fn main() {
    // .env is optional; production injects real environment variables
    let _ = dotenvy::dotenv();

    let config = match WebConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // tracing is not up yet
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(1);
        }
    };

    init_tracing(config.environment.is_production());

    tracing::info!(
        host = %config.host,
        port = config.port,
        auth_backend = %config.backend.auth_url,
        chat_backend = %config.backend.chat_url,
        "Starting carebot-web"
    );

    if let Err(e) = serve(config).await {
        tracing::error!(error = %e, "Server exited with error");
        std::process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("carebot_web=info,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
