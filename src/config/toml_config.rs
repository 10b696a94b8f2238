use crate::config::{PublisherConfig, DEFAULT_FUSED_PROVIDER_NAME, DEFAULT_UPDATE_INTERVAL_MS};
use crate::domain::model::{CoordinatePolicy, ProviderIdentity};
use crate::utils::error::{MockLocationError, Result};
use crate::utils::validation::Validate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub publisher: PublisherSection,
    #[serde(default)]
    pub fused: FusedSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherSection {
    pub update_interval_ms: Option<u64>,
    pub providers: Option<Vec<String>>,
    pub coordinate_policy: Option<CoordinatePolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusedSection {
    pub enabled: Option<bool>,
    pub provider_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    /// Reads and parses a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MockLocationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            MockLocationError::ConfigValidationError {
                field: "env_substitution".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Fills unset values with defaults and validates the result.
    pub fn to_publisher_config(&self) -> Result<PublisherConfig> {
        let providers = match &self.publisher.providers {
            Some(names) => names
                .iter()
                .map(|name| name.parse::<ProviderIdentity>())
                .collect::<Result<Vec<_>>>()?,
            None => ProviderIdentity::ALL.to_vec(),
        };

        let config = PublisherConfig {
            update_interval_ms: self
                .publisher
                .update_interval_ms
                .unwrap_or(DEFAULT_UPDATE_INTERVAL_MS),
            providers,
            coordinate_policy: self.publisher.coordinate_policy.unwrap_or_default(),
            fused_enabled: self.fused.enabled.unwrap_or(true),
            fused_provider_name: self
                .fused
                .provider_name
                .clone()
                .unwrap_or_else(|| DEFAULT_FUSED_PROVIDER_NAME.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn verbose_logging(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    pub fn json_logging(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }
}
