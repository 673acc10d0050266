use pricesim::config::AppConfig;
use pricesim::server;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let app_config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pricesim: {}", e);
            return ExitCode::from(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(app_config.log_filter())),
        )
        .with_target(false)
        .init();

    tracing::info!("Starting pricesim");
    tracing::info!(
        environment = %app_config.environment,
        port = app_config.port,
        debug = app_config.debug,
        "Loaded configuration"
    );

    match server::serve(app_config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}
