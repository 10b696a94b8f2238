#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{CoordinatePolicy, ProviderIdentity};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_unique_non_empty, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 500;
pub const DEFAULT_FUSED_PROVIDER_NAME: &str = "fused";

/// Runtime settings of a [`crate::MockLocationPublisher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherConfig {
    pub update_interval_ms: u64,
    pub providers: Vec<ProviderIdentity>,
    pub coordinate_policy: CoordinatePolicy,
    pub fused_enabled: bool,
    pub fused_provider_name: String,
}

impl PublisherConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    /// Rounds up to whole milliseconds; only a zero duration maps to 0.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        let mut millis = interval.as_millis();
        if interval.subsec_nanos() % 1_000_000 != 0 {
            millis += 1;
        }
        self.update_interval_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    pub fn with_coordinate_policy(mut self, policy: CoordinatePolicy) -> Self {
        self.coordinate_policy = policy;
        self
    }

    pub fn with_fused_enabled(mut self, enabled: bool) -> Self {
        self.fused_enabled = enabled;
        self
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            providers: ProviderIdentity::ALL.to_vec(),
            coordinate_policy: CoordinatePolicy::Discard,
            fused_enabled: true,
            fused_provider_name: DEFAULT_FUSED_PROVIDER_NAME.to_string(),
        }
    }
}

impl Validate for PublisherConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("publisher.update_interval_ms", self.update_interval_ms, 1)?;
        validate_unique_non_empty("publisher.providers", &self.providers)?;
        validate_non_empty_string("fused.provider_name", &self.fused_provider_name)?;
        Ok(())
    }
}
