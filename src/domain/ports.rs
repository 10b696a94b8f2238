use crate::domain::model::{LocationFix, Permission, ProviderIdentity, ProviderProperties};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Platform location registry that accepts test providers.
#[async_trait]
pub trait LocationRegistry: Send + Sync {
    async fn add_test_provider(
        &self,
        provider: ProviderIdentity,
        properties: &ProviderProperties,
    ) -> Result<()>;
    async fn set_test_provider_enabled(&self, provider: ProviderIdentity, enabled: bool)
        -> Result<()>;
    async fn set_test_provider_location(
        &self,
        provider: ProviderIdentity,
        fix: &LocationFix,
    ) -> Result<()>;
    async fn remove_test_provider(&self, provider: ProviderIdentity) -> Result<()>;
}

/// External fused-location client with a mock mode.
#[async_trait]
pub trait FusedLocationClient: Send + Sync {
    /// Whether the client library is present on this device at all.
    async fn is_available(&self) -> bool;
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self) -> Result<()>;
    fn is_connected(&self) -> bool;
    async fn set_mock_mode(&self, enabled: bool) -> Result<()>;
    async fn set_mock_location(&self, fix: &LocationFix) -> Result<()>;
}

pub trait PermissionChecker: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    /// Monotonic time since boot, `None` where the platform cannot report it.
    fn elapsed_realtime(&self) -> Option<Duration>;
}
