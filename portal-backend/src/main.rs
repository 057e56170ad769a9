use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use portal_backend::{build_app, cli::PortalConfig, AppState};

use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = portal_backend::cli::CliOpts::parse();

    let my_filter = match cli.debug {
        true => "resource_portal=debug,portal_backend=debug,tower_http=debug",
        false => "resource_portal=info,portal_backend=info,tower_http=info",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| my_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PortalConfig::from(&cli);

    let appstate = match AppState::new(&config).await {
        Ok(state) => state,
        Err(err) => {
            error!("Failed to initialize application state: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let shared_state = Arc::new(RwLock::new(appstate));

    let app: axum::Router = build_app(&shared_state, &config);

    let listener = match tokio::net::TcpListener::bind(&config.as_addr()).await {
        Ok(val) => {
            info!("Listening on {}", config.as_url());
            val
        }
        Err(err) => {
            error!("Failed to bind to {}: {:?}", config.as_url(), err);
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {:?}", err);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
