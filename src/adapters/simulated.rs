//! In-process stand-ins for the platform collaborators.
//!
//! They keep a bounded history of what they receive so a harness or a test can inspect it,
//! and can be switched into failure modes (missing permission, client not
//! installed, dropped connection) at runtime.

use crate::domain::model::{LocationFix, Permission, ProviderIdentity, ProviderProperties};
use crate::domain::ports::{FusedLocationClient, LocationRegistry, PermissionChecker};
use crate::utils::error::{MockLocationError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Entries kept per history (fixes per provider, registry calls, fused fixes).
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn push_bounded<T>(history: &mut VecDeque<T>, item: T, limit: usize) {
    while history.len() >= limit.max(1) {
        history.pop_front();
    }
    history.push_back(item);
}

fn mock_location_denied() -> MockLocationError {
    MockLocationError::PermissionDenied {
        permission: Permission::AccessMockLocation.name().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryCall {
    AddProvider(ProviderIdentity),
    SetEnabled(ProviderIdentity, bool),
    SetLocation(ProviderIdentity),
    RemoveProvider(ProviderIdentity),
}

#[derive(Debug, Clone)]
struct ProviderEntry {
    properties: ProviderProperties,
    enabled: bool,
    fixes: VecDeque<LocationFix>,
}

#[derive(Debug)]
pub struct InMemoryLocationRegistry {
    providers: Mutex<HashMap<ProviderIdentity, ProviderEntry>>,
    calls: Mutex<VecDeque<RegistryCall>>,
    call_count: AtomicUsize,
    mock_location_granted: AtomicBool,
    log_fixes: bool,
    history_limit: usize,
}

impl InMemoryLocationRegistry {
    pub fn new() -> Self {
        Self {
            providers: Mutex::new(HashMap::new()),
            calls: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            mock_location_granted: AtomicBool::new(true),
            log_fixes: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Caps how many calls and fixes per provider are retained.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Logs every accepted fix at info level.
    pub fn logging_fixes(mut self) -> Self {
        self.log_fixes = true;
        self
    }

    pub fn set_mock_location_granted(&self, granted: bool) {
        self.mock_location_granted.store(granted, Ordering::SeqCst);
    }

    fn record(&self, call: RegistryCall) -> Result<()> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        push_bounded(&mut lock(&self.calls), call, self.history_limit);
        if self.mock_location_granted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(mock_location_denied())
        }
    }

    pub fn is_registered(&self, provider: ProviderIdentity) -> bool {
        lock(&self.providers).contains_key(&provider)
    }

    pub fn is_enabled(&self, provider: ProviderIdentity) -> bool {
        lock(&self.providers)
            .get(&provider)
            .map(|entry| entry.enabled)
            .unwrap_or(false)
    }

    pub fn properties(&self, provider: ProviderIdentity) -> Option<ProviderProperties> {
        lock(&self.providers).get(&provider).map(|entry| entry.properties)
    }

    pub fn fixes(&self, provider: ProviderIdentity) -> Vec<LocationFix> {
        lock(&self.providers)
            .get(&provider)
            .map(|entry| entry.fixes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn last_fix(&self, provider: ProviderIdentity) -> Option<LocationFix> {
        lock(&self.providers)
            .get(&provider)
            .and_then(|entry| entry.fixes.back().cloned())
    }

    /// Most recent calls, oldest first.
    pub fn calls(&self) -> Vec<RegistryCall> {
        lock(&self.calls).iter().copied().collect()
    }

    /// Every call ever made, including ones dropped from [`calls`](Self::calls).
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn not_registered(provider: ProviderIdentity) -> MockLocationError {
        MockLocationError::RegistryError {
            provider: provider.name().to_string(),
            message: "Provider is not a test provider".to_string(),
        }
    }
}

impl Default for InMemoryLocationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationRegistry for InMemoryLocationRegistry {
    async fn add_test_provider(
        &self,
        provider: ProviderIdentity,
        properties: &ProviderProperties,
    ) -> Result<()> {
        self.record(RegistryCall::AddProvider(provider))?;
        lock(&self.providers).insert(
            provider,
            ProviderEntry {
                properties: *properties,
                enabled: false,
                fixes: VecDeque::new(),
            },
        );
        Ok(())
    }

    async fn set_test_provider_enabled(
        &self,
        provider: ProviderIdentity,
        enabled: bool,
    ) -> Result<()> {
        self.record(RegistryCall::SetEnabled(provider, enabled))?;
        let mut providers = lock(&self.providers);
        let entry = providers
            .get_mut(&provider)
            .ok_or_else(|| Self::not_registered(provider))?;
        entry.enabled = enabled;
        Ok(())
    }

    async fn set_test_provider_location(
        &self,
        provider: ProviderIdentity,
        fix: &LocationFix,
    ) -> Result<()> {
        self.record(RegistryCall::SetLocation(provider))?;
        let mut providers = lock(&self.providers);
        let entry = providers
            .get_mut(&provider)
            .ok_or_else(|| Self::not_registered(provider))?;
        if self.log_fixes {
            tracing::info!("📍 {}", fix);
        }
        push_bounded(&mut entry.fixes, fix.clone(), self.history_limit);
        Ok(())
    }

    async fn remove_test_provider(&self, provider: ProviderIdentity) -> Result<()> {
        self.record(RegistryCall::RemoveProvider(provider))?;
        lock(&self.providers)
            .remove(&provider)
            .map(|_| ())
            .ok_or_else(|| Self::not_registered(provider))
    }
}

#[derive(Debug)]
pub struct SimulatedFusedClient {
    available: bool,
    connect_succeeds: bool,
    connected: AtomicBool,
    mock_mode: AtomicBool,
    mock_location_granted: AtomicBool,
    fixes: Mutex<VecDeque<LocationFix>>,
    disconnect_calls: AtomicUsize,
    log_fixes: bool,
    history_limit: usize,
}

impl SimulatedFusedClient {
    pub fn new() -> Self {
        Self {
            available: true,
            connect_succeeds: true,
            connected: AtomicBool::new(false),
            mock_mode: AtomicBool::new(false),
            mock_location_granted: AtomicBool::new(true),
            fixes: Mutex::new(VecDeque::new()),
            disconnect_calls: AtomicUsize::new(0),
            log_fixes: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// A device without the client library installed.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Installed, but every connection attempt fails.
    pub fn failing_connection() -> Self {
        Self {
            connect_succeeds: false,
            ..Self::new()
        }
    }

    pub fn logging_fixes(mut self) -> Self {
        self.log_fixes = true;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Simulates the service dropping the connection.
    pub fn drop_connection(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn set_mock_location_granted(&self, granted: bool) {
        self.mock_location_granted.store(granted, Ordering::SeqCst);
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode.load(Ordering::SeqCst)
    }

    pub fn fixes(&self) -> Vec<LocationFix> {
        lock(&self.fixes).iter().cloned().collect()
    }

    pub fn last_fix(&self) -> Option<LocationFix> {
        lock(&self.fixes).back().cloned()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(MockLocationError::ClientDisconnected);
        }
        if !self.mock_location_granted.load(Ordering::SeqCst) {
            return Err(mock_location_denied());
        }
        Ok(())
    }
}

impl Default for SimulatedFusedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FusedLocationClient for SimulatedFusedClient {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn connect(&self) -> Result<()> {
        if !self.available {
            return Err(MockLocationError::ClientUnavailable {
                reason: "client library is not installed".to_string(),
            });
        }
        if !self.connect_succeeds {
            return Err(MockLocationError::ClientUnavailable {
                reason: "connection refused".to_string(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn set_mock_mode(&self, enabled: bool) -> Result<()> {
        self.ensure_ready()?;
        self.mock_mode.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    async fn set_mock_location(&self, fix: &LocationFix) -> Result<()> {
        self.ensure_ready()?;
        if self.log_fixes {
            tracing::info!("📍 {}", fix);
        }
        push_bounded(&mut lock(&self.fixes), fix.clone(), self.history_limit);
        Ok(())
    }
}

/// Permission set that can be changed while the publisher runs.
#[derive(Debug)]
pub struct StaticPermissions {
    granted: Mutex<HashSet<Permission>>,
}

impl StaticPermissions {
    pub fn all_granted() -> Self {
        Self {
            granted: Mutex::new(HashSet::from([
                Permission::AccessFineLocation,
                Permission::AccessMockLocation,
            ])),
        }
    }

    pub fn none() -> Self {
        Self {
            granted: Mutex::new(HashSet::new()),
        }
    }

    pub fn grant(&self, permission: Permission) {
        lock(&self.granted).insert(permission);
    }

    pub fn revoke(&self, permission: Permission) {
        lock(&self.granted).remove(&permission);
    }
}

impl PermissionChecker for StaticPermissions {
    fn is_granted(&self, permission: Permission) -> bool {
        lock(&self.granted).contains(&permission)
    }
}
