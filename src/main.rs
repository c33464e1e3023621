use anyhow::{Context, Result};
use clap::Parser;
use configserver::config::{ConfigServerConfig, DEFAULT_CONFIG_PATH};
use configserver::logger::{INIT_TRACE_ID, init_logger};
use configserver::server::ConfigServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Instrument, error, info, info_span};

#[derive(Parser, Debug)]
#[command(name = "configserver", version, about = "Cluster topology config server")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigServerConfig::load(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    let _log_guard = init_logger(&config.log).context("failed to initialize logger")?;

    let server = Arc::new(
        ConfigServer::open(config)
            .instrument(info_span!("init", trace_id = INIT_TRACE_ID))
            .await
            .context("failed to open cluster store")?,
    );
    info!(
        address = %server.config().server.address,
        service = %server.state().service_address,
        "config server starting"
    );

    tokio::spawn({
        let server = Arc::clone(&server);
        async move {
            shutdown_signal().await;
            info!("signal received, stopping");
            server.stop();
        }
    });

    server.run().await.context("server error")?;
    info!("config server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
