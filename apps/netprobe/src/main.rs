use netprobe::app::Netprobe;
use netprobe::error::AppError;
use netprobe::logger::initialize as LoggerInitialize;
use netprobe::settings::Settings;

use common::ErrorLocation;
use connectivity_core::{CORE_NAME, CoreError, NetworkConfig};

use std::fs::create_dir_all;
use std::panic::Location;
use std::process::ExitCode;

use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional; real environment variables win
    let dotenv = dotenvy::dotenv();

    let settings = Settings::from_env();

    create_dir_all(&settings.log_dir).map_err(|e| AppError::Netprobe {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Initialize logger FIRST
    LoggerInitialize(&settings.log_dir)?;

    info!("netprobe starting ({CORE_NAME} {})", env!("CARGO_PKG_VERSION"));
    match dotenv {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env: {e}"),
    }

    let config = NetworkConfig::load(&settings.config_path)
        .and_then(NetworkConfig::apply_env_overrides)
        .map_err(CoreError::from)?;

    info!("HTTP base URL: {}", config.http.base_url);
    info!("Socket URL: {}", config.socket.url);

    let app = Netprobe::build(&config, &settings)?;

    app.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    })
    .await;

    Ok(())
}
