use crate::domain::model::{Coordinates, LocationFix, ProviderIdentity};
use crate::domain::ports::{Clock, FusedLocationClient, LocationRegistry};
use crate::utils::monitor::PublishMonitor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Notify;

/// Cooperative cancellation shared by the publisher and its loop.
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    cancelled: AtomicBool,
    wake: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not parked yet
        self.wake.notify_one();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn sleep(&self, interval: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = self.wake.notified() => {}
        }
    }
}

/// Last accepted target, `None` until the first command.
pub type SharedTarget = Arc<RwLock<Option<Coordinates>>>;

/// Everything one publish iteration needs.
#[derive(Clone)]
pub struct PublishContext {
    pub registry: Arc<dyn LocationRegistry>,
    pub fused: Option<Arc<dyn FusedLocationClient>>,
    pub clock: Arc<dyn Clock>,
    pub providers: Vec<ProviderIdentity>,
    pub fused_provider_name: String,
    pub target: SharedTarget,
    pub monitor: Arc<PublishMonitor>,
}

impl PublishContext {
    pub fn current_target(&self) -> Option<Coordinates> {
        *self.target.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Builds one fix from the current target and pushes it to every sink.
    pub async fn publish_once(&self) {
        let Some(target) = self.current_target() else {
            tracing::debug!("No target set yet, nothing to publish");
            return;
        };

        let fix = LocationFix::new(
            self.fused_provider_name.as_str(),
            target,
            self.clock.now(),
            self.clock.elapsed_realtime(),
        );
        self.monitor.record_iteration();

        self.publish_to_registry(&fix).await;
        self.publish_to_fused_client(&fix).await;
    }

    async fn publish_to_registry(&self, fix: &LocationFix) {
        for &provider in &self.providers {
            let provider_fix = fix.for_provider(provider.name());
            tracing::debug!("Setting mock location {} for provider {}", provider_fix, provider);

            match self
                .registry
                .set_test_provider_location(provider, &provider_fix)
                .await
            {
                Ok(()) => self.monitor.record_registry_publish(),
                Err(e) if e.is_permission_denied() => {
                    tracing::info!("ACCESS_MOCK_LOCATION permission denied. skipping.");
                    self.monitor.record_registry_failure();
                }
                Err(e) => {
                    tracing::warn!("Failed to set mock location for {}: {}", provider, e);
                    self.monitor.record_registry_failure();
                }
            }
        }
    }

    async fn publish_to_fused_client(&self, fix: &LocationFix) {
        let Some(client) = &self.fused else {
            return;
        };

        if !client.is_connected() {
            tracing::error!("Fused location client is not connected, not setting location.");
            self.monitor.record_fused_skipped();
            return;
        }

        tracing::debug!("Setting mock location for location client: {}", fix);
        let result = match client.set_mock_location(fix).await {
            Ok(()) => client.set_mock_mode(true).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => self.monitor.record_fused_publish(),
            Err(e) if e.is_permission_denied() => {
                tracing::info!("ACCESS_MOCK_LOCATION permission denied. skipping.");
                self.monitor.record_fused_skipped();
            }
            Err(e) => {
                tracing::warn!("Fused location client rejected the fix: {}", e);
                self.monitor.record_fused_skipped();
            }
        }
    }
}

/// Publishes every `interval` until `shutdown` is cancelled.
pub async fn run_publish_loop(context: PublishContext, interval: Duration, shutdown: Arc<ShutdownSignal>) {
    tracing::info!("Publish loop started, interval {:?}", interval);

    while !shutdown.is_cancelled() {
        context.publish_once().await;
        if shutdown.is_cancelled() {
            break;
        }
        shutdown.sleep(interval).await;
    }

    tracing::info!("Publish loop stopped");
}
