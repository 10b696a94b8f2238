use anyhow::Context;
use clap::Parser;
use mock_location::adapters::simulated::{
    InMemoryLocationRegistry, SimulatedFusedClient, StaticPermissions,
};
use mock_location::utils::logger;
use mock_location::{CliConfig, LocationCommand, MockLocationPublisher};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let (config, file_config) = match cli.resolve() {
        Ok(resolved) => resolved,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    logger::init_logger(
        logger::LogFormat::from_flag(cli.json_logs || file_config.json_logging()),
        cli.verbose || file_config.verbose_logging(),
    );
    tracing::info!("Starting mock-location publisher");
    tracing::debug!("Publisher config: {:?}", config);

    let registry = Arc::new(InMemoryLocationRegistry::new().logging_fixes());
    registry.set_mock_location_granted(!cli.deny_mock_location);

    let fused = if cli.fused_unavailable {
        SimulatedFusedClient::unavailable()
    } else {
        SimulatedFusedClient::new()
    };

    let publisher = MockLocationPublisher::new(
        config,
        registry,
        Arc::new(StaticPermissions::all_granted()),
    )
    .with_fused_client(Arc::new(fused.logging_fixes()));

    publisher
        .start()
        .await
        .context("failed to start the publisher")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("failed to read a command from stdin")? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => match LocationCommand::from_json(&line) {
                        Ok(command) => {
                            let status = publisher.handle_command(&command);
                            tracing::debug!("Command status: {:?}", status);
                        }
                        Err(e) => tracing::error!("Discarding malformed command '{}': {}", line, e),
                    },
                    None if publisher.is_publishing() => {
                        tracing::info!("stdin closed, publishing until interrupted");
                        tokio::signal::ctrl_c()
                            .await
                            .context("failed to listen for Ctrl-C")?;
                        break;
                    }
                    None => {
                        tracing::info!("stdin closed before any location was set, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    publisher.stop().await?;
    Ok(())
}
