use crate::config::toml_config::TomlConfig;
use crate::config::PublisherConfig;
use crate::domain::model::CoordinatePolicy;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "mock-location")]
#[command(about = "Publishes mock location fixes read as JSON commands from stdin")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Override the publish interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Substitute 0.0 for unparseable coordinates instead of discarding the command
    #[arg(long)]
    pub default_to_zero: bool,

    /// Do not attempt to use the fused location client
    #[arg(long)]
    pub no_fused: bool,

    /// Simulate a device where the fused location client is not installed
    #[arg(long)]
    pub fused_unavailable: bool,

    /// Simulate a missing mock-location permission
    #[arg(long)]
    pub deny_mock_location: bool,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Loads the optional file, applies command line overrides, then validates.
    pub fn resolve(&self) -> Result<(PublisherConfig, TomlConfig)> {
        let file_config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        let mut config = file_config.to_publisher_config()?;
        if let Some(interval_ms) = self.interval_ms {
            config.update_interval_ms = interval_ms;
        }
        if self.default_to_zero {
            config.coordinate_policy = CoordinatePolicy::DefaultToZero;
        }
        if self.no_fused {
            config.fused_enabled = false;
        }
        config.validate()?;

        Ok((config, file_config))
    }
}
