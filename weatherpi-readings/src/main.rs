use std::sync::Arc;

use tokio::sync::watch;

use weatherpi_readings::configs::Settings;
use weatherpi_readings::run;

#[tokio::main]
async fn main() {
    let settings = Arc::new(Settings::new().expect("Failed to load settings."));

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let app_name = env!("CARGO_PKG_NAME").replace('-', "_");
            let level = settings.logger.level.as_str();

            format!("{app_name}={level}").into()
        }))
        .init();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested; finishing current cycle");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                tracing::error!("Unable to listen for shutdown signal: {}", e);
                // Keep the sender alive so the loop is not stopped
                std::future::pending::<()>().await;
            }
        }
    });

    if let Err(e) = run(&settings, shutdown_rx).await {
        tracing::error!("Startup failed: {}", e);
        std::process::exit(1);
    }
}
