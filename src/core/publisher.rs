use crate::adapters::clock::SystemClock;
use crate::config::PublisherConfig;
use crate::core::publish_loop::{run_publish_loop, PublishContext, SharedTarget, ShutdownSignal};
use crate::domain::model::{
    CommandStatus, Coordinates, LocationCommand, Permission, PublisherState, RejectReason,
};
use crate::domain::ports::{Clock, FusedLocationClient, LocationRegistry, PermissionChecker};
use crate::utils::error::{MockLocationError, Result};
use crate::utils::monitor::{PublishMonitor, PublishStats};
use crate::utils::validation::Validate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Injects a caller-supplied position into test providers on a fixed cadence.
///
/// Driven by three operations: [`start`](Self::start) registers the providers,
/// [`handle_command`](Self::handle_command) stores a new target and starts the
/// publish loop on first use, [`stop`](Self::stop) cancels the loop and
/// unregisters everything.
pub struct MockLocationPublisher {
    config: PublisherConfig,
    registry: Arc<dyn LocationRegistry>,
    fused: Option<Arc<dyn FusedLocationClient>>,
    attached_fused: OnceLock<Arc<dyn FusedLocationClient>>,
    permissions: Arc<dyn PermissionChecker>,
    clock: Arc<dyn Clock>,
    target: SharedTarget,
    started: AtomicBool,
    state: Mutex<PublisherState>,
    shutdown: Arc<ShutdownSignal>,
    task: Mutex<Option<JoinHandle<()>>>,
    runtime: OnceLock<Handle>,
    lifecycle: tokio::sync::Mutex<()>,
    monitor: Arc<PublishMonitor>,
}

impl MockLocationPublisher {
    pub fn new(
        config: PublisherConfig,
        registry: Arc<dyn LocationRegistry>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        Self {
            config,
            registry,
            fused: None,
            attached_fused: OnceLock::new(),
            permissions,
            clock: Arc::new(SystemClock::new()),
            target: Arc::new(RwLock::new(None)),
            started: AtomicBool::new(false),
            state: Mutex::new(PublisherState::Created),
            shutdown: Arc::new(ShutdownSignal::new()),
            task: Mutex::new(None),
            runtime: OnceLock::new(),
            lifecycle: tokio::sync::Mutex::new(()),
            monitor: Arc::new(PublishMonitor::new()),
        }
    }

    pub fn with_fused_client(mut self, client: Arc<dyn FusedLocationClient>) -> Self {
        self.fused = Some(client);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PublisherState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Moves `from -> to` under the state lock, failing if another call got there first.
    fn claim_transition(
        &self,
        from: PublisherState,
        to: PublisherState,
        operation: &str,
    ) -> Result<()> {
        let mut current = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *current != from {
            return Err(MockLocationError::InvalidState {
                state: current.to_string(),
                operation: operation.to_string(),
            });
        }
        tracing::debug!("Publisher state {} -> {}", *current, to);
        *current = to;
        Ok(())
    }

    fn set_state(&self, state: PublisherState) {
        let mut current = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!("Publisher state {} -> {}", *current, state);
        *current = state;
    }

    pub fn current_target(&self) -> Option<Coordinates> {
        *self.target.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_publishing(&self) -> bool {
        self.started.load(Ordering::SeqCst) && self.state() == PublisherState::Publishing
    }

    /// Whether a fused client was reached during setup.
    pub fn fused_client_attached(&self) -> bool {
        self.attached_fused.get().is_some()
    }

    pub fn stats(&self) -> PublishStats {
        self.monitor.snapshot()
    }

    pub fn monitor(&self) -> &PublishMonitor {
        &self.monitor
    }

    /// Registers the test providers and connects the fused client if it is available.
    ///
    /// Registry and client failures are logged and never abort setup. Calling
    /// `start` twice, with an invalid config, or outside a tokio runtime, is an
    /// error. A concurrent [`stop`](Self::stop) waits for setup to finish.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        self.config.validate()?;
        let runtime = Handle::try_current().map_err(|e| MockLocationError::InvalidState {
            state: self.state().to_string(),
            operation: format!("start outside a tokio runtime ({})", e),
        })?;
        self.claim_transition(PublisherState::Created, PublisherState::ProvidersRegistered, "start")?;
        let _ = self.runtime.set(runtime);

        self.register_providers().await;

        if self.config.fused_enabled {
            self.attach_fused_client().await;
        } else {
            tracing::info!("Fused location client disabled by configuration");
        }

        self.claim_transition(PublisherState::ProvidersRegistered, PublisherState::Idle, "start")?;
        tracing::info!(
            "Mock location publisher ready for providers {:?}",
            self.config.providers
        );
        Ok(())
    }

    async fn register_providers(&self) {
        for &provider in &self.config.providers {
            let result = async {
                self.registry
                    .add_test_provider(provider, &provider.properties())
                    .await?;
                self.registry.set_test_provider_enabled(provider, true).await
            }
            .await;

            match result {
                Ok(()) => tracing::debug!("Registered test provider {}", provider),
                Err(e) if e.is_permission_denied() => {
                    tracing::error!("Setting mock locations is not supported by this device: {}", e)
                }
                Err(e) => tracing::error!("Failed to register test provider {}: {}", provider, e),
            }
        }
    }

    async fn attach_fused_client(&self) {
        let Some(client) = &self.fused else {
            tracing::debug!("No fused location client configured");
            return;
        };

        if !client.is_available().await {
            tracing::error!("Fused location services are not available.");
            return;
        }

        match client.connect().await {
            Ok(()) => {
                let _ = self.attached_fused.set(client.clone());
                tracing::info!("Connected to fused location client");
            }
            Err(e) => tracing::warn!(
                "Could not connect to fused location client, continuing without it: {}",
                e
            ),
        }
    }

    /// Stores a new target. Never blocks on the publish loop.
    pub fn handle_command(&self, command: &LocationCommand) -> CommandStatus {
        let state = self.state();
        if !matches!(state, PublisherState::Idle | PublisherState::Publishing) {
            tracing::warn!("Ignoring location command while publisher is {}", state);
            return CommandStatus::Rejected(RejectReason::NotRunning);
        }

        // checked on every command
        let permission = Permission::AccessFineLocation;
        if !self.permissions.is_granted(permission) {
            tracing::error!(
                "Cannot mock location due to missing permission '{}'",
                permission
            );
            return CommandStatus::Rejected(RejectReason::PermissionDenied);
        }

        let target = match command.parse(self.config.coordinate_policy) {
            Ok(target) => target,
            Err(e) => {
                tracing::error!("{}", e);
                return CommandStatus::Rejected(RejectReason::InvalidCoordinates);
            }
        };

        tracing::info!(
            "Setting the location from service with longitude: {:.5}, latitude: {:.5}",
            target.longitude,
            target.latitude
        );
        *self.target.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(target);

        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.spawn_publish_loop();
        }

        CommandStatus::Accepted
    }

    fn spawn_publish_loop(&self) {
        let Some(runtime) = self.runtime.get() else {
            tracing::error!("Publisher has no runtime, cannot start the publish loop");
            return;
        };

        let context = PublishContext {
            registry: self.registry.clone(),
            fused: self.attached_fused.get().cloned(),
            clock: self.clock.clone(),
            providers: self.config.providers.clone(),
            fused_provider_name: self.config.fused_provider_name.clone(),
            target: self.target.clone(),
            monitor: self.monitor.clone(),
        };

        // held until the handle is stored; stop() flips the state before taking the task
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *state == PublisherState::Stopped {
            return;
        }

        let handle = runtime.spawn(run_publish_loop(
            context,
            self.config.update_interval(),
            self.shutdown.clone(),
        ));
        *self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        tracing::debug!("Publisher state {} -> {}", *state, PublisherState::Publishing);
        *state = PublisherState::Publishing;
    }

    /// Cancels the loop, waits for it, then unregisters providers and detaches
    /// the fused client. Calling it again is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let previous = self.state();
        if previous == PublisherState::Stopped {
            return Ok(());
        }
        self.set_state(PublisherState::Stopped);
        self.shutdown.cancel();

        if previous == PublisherState::Created {
            return Ok(());
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!("Publish loop ended abnormally: {}", e);
            }
        }

        for &provider in &self.config.providers {
            if let Err(e) = self.registry.set_test_provider_enabled(provider, false).await {
                tracing::warn!("Failed to disable test provider {}: {}", provider, e);
            }
            if let Err(e) = self.registry.remove_test_provider(provider).await {
                tracing::warn!("Failed to remove test provider {}: {}", provider, e);
            }
        }

        if let Some(client) = self.attached_fused.get() {
            if !client.is_connected() {
                tracing::warn!(
                    "Fused location client lost its connection, mock mode may still be enabled"
                );
            }
            if let Err(e) = client.set_mock_mode(false).await {
                tracing::warn!("Failed to disable fused mock mode: {}", e);
            }
            if let Err(e) = client.disconnect().await {
                tracing::warn!("Failed to disconnect fused location client: {}", e);
            }
        }

        self.monitor.log_stats("Publisher stopped");
        Ok(())
    }
}
