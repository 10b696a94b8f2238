use chrono::{DateTime, TimeZone, Utc};
use mock_location::adapters::simulated::{
    InMemoryLocationRegistry, RegistryCall, SimulatedFusedClient, StaticPermissions,
};
use mock_location::domain::model::ProviderProperties;
use mock_location::domain::ports::{Clock, FusedLocationClient, LocationRegistry};
use mock_location::{
    CommandStatus, CoordinatePolicy, LocationCommand, LocationFix, MockLocationError,
    MockLocationPublisher, ProviderIdentity, PublisherConfig, PublisherState, RejectReason,
};
use std::sync::Arc;
use std::time::Duration;

const INTERVAL: Duration = Duration::from_millis(20);

struct Harness {
    registry: Arc<InMemoryLocationRegistry>,
    fused: Arc<SimulatedFusedClient>,
    publisher: Arc<MockLocationPublisher>,
}

fn harness_with(config: PublisherConfig, fused: SimulatedFusedClient) -> Harness {
    let registry = Arc::new(InMemoryLocationRegistry::new());
    let fused = Arc::new(fused);
    let publisher = MockLocationPublisher::new(
        config,
        registry.clone(),
        Arc::new(StaticPermissions::all_granted()),
    )
    .with_fused_client(fused.clone());

    Harness {
        registry,
        fused,
        publisher: Arc::new(publisher),
    }
}

fn harness() -> Harness {
    harness_with(
        PublisherConfig::default().with_update_interval(INTERVAL),
        SimulatedFusedClient::new(),
    )
}

/// Registry whose provider registration takes a while, keeping `start` mid-setup.
struct DelayedRegistry {
    inner: Arc<InMemoryLocationRegistry>,
    delay: Duration,
}

#[async_trait::async_trait]
impl LocationRegistry for DelayedRegistry {
    async fn add_test_provider(
        &self,
        provider: ProviderIdentity,
        properties: &ProviderProperties,
    ) -> mock_location::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.add_test_provider(provider, properties).await
    }

    async fn set_test_provider_enabled(
        &self,
        provider: ProviderIdentity,
        enabled: bool,
    ) -> mock_location::Result<()> {
        self.inner.set_test_provider_enabled(provider, enabled).await
    }

    async fn set_test_provider_location(
        &self,
        provider: ProviderIdentity,
        fix: &LocationFix,
    ) -> mock_location::Result<()> {
        self.inner.set_test_provider_location(provider, fix).await
    }

    async fn remove_test_provider(&self, provider: ProviderIdentity) -> mock_location::Result<()> {
        self.inner.remove_test_provider(provider).await
    }
}

fn delayed_publisher(registry: Arc<InMemoryLocationRegistry>) -> Arc<MockLocationPublisher> {
    let delayed = DelayedRegistry {
        inner: registry,
        delay: Duration::from_millis(50),
    };
    Arc::new(MockLocationPublisher::new(
        PublisherConfig::default().with_update_interval(INTERVAL),
        Arc::new(delayed),
        Arc::new(StaticPermissions::all_granted()),
    ))
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn test_command_publishes_fix_to_every_sink() {
    let h = harness();
    h.publisher.start().await.unwrap();
    assert!(h.publisher.fused_client_attached());

    let status = h
        .publisher
        .handle_command(&LocationCommand::new("37.4219999", "-122.0840575"));
    assert_eq!(status, CommandStatus::Accepted);

    wait_for(|| {
        h.registry.last_fix(ProviderIdentity::Network).is_some() && h.fused.last_fix().is_some()
    })
    .await;

    for provider in [ProviderIdentity::Gps, ProviderIdentity::Network] {
        let fix = h.registry.last_fix(provider).unwrap();
        assert_eq!(fix.provider, provider.name());
        assert_eq!(fix.latitude, 37.4219999);
        assert_eq!(fix.longitude, -122.0840575);
        assert_eq!(fix.accuracy, 1.0);
        assert_eq!(fix.altitude, 0.0);
        assert_eq!(fix.bearing, 0.0);
        assert_eq!(fix.speed, 0.0);
    }

    let fused_fix = h.fused.last_fix().unwrap();
    assert_eq!(fused_fix.provider, "fused");
    assert_eq!(fused_fix.latitude, 37.4219999);
    assert!(h.fused.mock_mode());

    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_publishes_repeatedly_at_interval() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));

    wait_for(|| h.registry.fixes(ProviderIdentity::Gps).len() >= 3).await;
    assert!(h.publisher.stats().iterations >= 3);

    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_new_command_updates_running_loop() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.last_fix(ProviderIdentity::Gps).is_some()).await;

    h.publisher.handle_command(&LocationCommand::new("48.8584", "2.2945"));
    wait_for(|| {
        h.registry
            .last_fix(ProviderIdentity::Gps)
            .map(|fix| fix.latitude == 48.8584 && fix.longitude == 2.2945)
            .unwrap_or(false)
    })
    .await;

    assert_eq!(h.publisher.state(), PublisherState::Publishing);
    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_unparseable_command_keeps_previous_target() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("10", "20"));

    let status = h
        .publisher
        .handle_command(&LocationCommand::new("not-a-number", "10"));
    assert_eq!(status, CommandStatus::Rejected(RejectReason::InvalidCoordinates));

    let published_before = h.registry.fixes(ProviderIdentity::Gps).len();
    wait_for(|| h.registry.fixes(ProviderIdentity::Gps).len() > published_before + 1).await;

    assert!(h
        .registry
        .fixes(ProviderIdentity::Gps)
        .iter()
        .all(|fix| fix.latitude == 10.0 && fix.longitude == 20.0));

    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_unparseable_first_command_does_not_start_loop() {
    let h = harness();
    h.publisher.start().await.unwrap();

    let status = h
        .publisher
        .handle_command(&LocationCommand::new("north", "west"));
    assert!(!status.is_accepted());

    tokio::time::sleep(INTERVAL * 3).await;
    assert_eq!(h.publisher.state(), PublisherState::Idle);
    assert!(h.registry.fixes(ProviderIdentity::Gps).is_empty());

    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_default_to_zero_policy_publishes_zero() {
    let h = harness_with(
        PublisherConfig::default()
            .with_update_interval(INTERVAL)
            .with_coordinate_policy(CoordinatePolicy::DefaultToZero),
        SimulatedFusedClient::new(),
    );
    h.publisher.start().await.unwrap();

    let status = h
        .publisher
        .handle_command(&LocationCommand::new("not-a-number", "10"));
    assert!(status.is_accepted());

    wait_for(|| h.registry.last_fix(ProviderIdentity::Gps).is_some()).await;
    let fix = h.registry.last_fix(ProviderIdentity::Gps).unwrap();
    assert_eq!(fix.latitude, 0.0);
    assert_eq!(fix.longitude, 10.0);

    h.publisher.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_commands_start_one_loop() {
    // a long interval leaves exactly one publish per running loop
    let h = harness_with(
        PublisherConfig::default().with_update_interval(Duration::from_secs(60)),
        SimulatedFusedClient::new(),
    );
    h.publisher.start().await.unwrap();

    let publisher = h.publisher.clone();
    tokio::task::spawn_blocking(move || {
        std::thread::scope(|scope| {
            for i in 0..16 {
                let publisher = &publisher;
                scope.spawn(move || {
                    let status = publisher
                        .handle_command(&LocationCommand::new(format!("{}", i), "5"));
                    assert!(status.is_accepted());
                });
            }
        });
    })
    .await
    .unwrap();

    wait_for(|| h.registry.last_fix(ProviderIdentity::Network).is_some()).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(h.publisher.stats().iterations, 1);
    assert_eq!(h.registry.fixes(ProviderIdentity::Gps).len(), 1);
    assert_eq!(h.registry.fixes(ProviderIdentity::Network).len(), 1);

    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_removes_providers_and_silences_registry() {
    let h = harness();
    h.publisher.start().await.unwrap();
    assert!(h.registry.is_enabled(ProviderIdentity::Gps));
    assert!(h.registry.is_enabled(ProviderIdentity::Network));

    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.last_fix(ProviderIdentity::Gps).is_some()).await;

    h.publisher.stop().await.unwrap();
    assert_eq!(h.publisher.state(), PublisherState::Stopped);
    assert!(!h.registry.is_registered(ProviderIdentity::Gps));
    assert!(!h.registry.is_registered(ProviderIdentity::Network));
    assert!(!h.fused.is_connected());
    assert!(!h.fused.mock_mode());

    let calls_after_stop = h.registry.call_count();
    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(h.registry.call_count(), calls_after_stop);
    assert_eq!(
        h.registry.calls().last(),
        Some(&RegistryCall::RemoveProvider(ProviderIdentity::Network))
    );

    let status = h.publisher.handle_command(&LocationCommand::new("3", "4"));
    assert_eq!(status, CommandStatus::Rejected(RejectReason::NotRunning));
    assert_eq!(h.registry.call_count(), calls_after_stop);

    // second stop is a no-op
    h.publisher.stop().await.unwrap();
    assert_eq!(h.registry.call_count(), calls_after_stop);
}

#[tokio::test]
async fn test_stop_during_start_leaves_publisher_stopped() {
    let registry = Arc::new(InMemoryLocationRegistry::new());
    let publisher = delayed_publisher(registry.clone());

    let starting = {
        let publisher = publisher.clone();
        tokio::spawn(async move { publisher.start().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(publisher.state(), PublisherState::ProvidersRegistered);

    publisher.stop().await.unwrap();
    starting.await.unwrap().unwrap();

    assert_eq!(publisher.state(), PublisherState::Stopped);
    assert!(!registry.is_registered(ProviderIdentity::Gps));
    assert!(!registry.is_registered(ProviderIdentity::Network));

    let status = publisher.handle_command(&LocationCommand::new("1", "2"));
    assert_eq!(status, CommandStatus::Rejected(RejectReason::NotRunning));
    assert!(!publisher.is_publishing());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_starts_register_providers_once() {
    let registry = Arc::new(InMemoryLocationRegistry::new());
    let publisher = delayed_publisher(registry.clone());

    let (first, second) = tokio::join!(publisher.start(), publisher.start());
    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(MockLocationError::InvalidState { .. }))));

    let registrations = registry
        .calls()
        .into_iter()
        .filter(|call| matches!(call, RegistryCall::AddProvider(_)))
        .count();
    assert_eq!(registrations, 2);
    assert_eq!(publisher.state(), PublisherState::Idle);

    publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_does_not_wait_for_full_interval() {
    let h = harness_with(
        PublisherConfig::default().with_update_interval(Duration::from_secs(60)),
        SimulatedFusedClient::new(),
    );
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.last_fix(ProviderIdentity::Gps).is_some()).await;

    tokio::time::timeout(Duration::from_secs(1), h.publisher.stop())
        .await
        .expect("stop should finish within one interval")
        .unwrap();
}

#[tokio::test]
async fn test_unavailable_fused_client_does_not_block_local_publishing() {
    let h = harness_with(
        PublisherConfig::default().with_update_interval(INTERVAL),
        SimulatedFusedClient::unavailable(),
    );
    h.publisher.start().await.unwrap();
    assert!(!h.publisher.fused_client_attached());

    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.fixes(ProviderIdentity::Gps).len() >= 3).await;

    assert!(h.fused.fixes().is_empty());
    assert_eq!(h.publisher.stats().fused_publishes, 0);
    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_fused_connection_is_not_fatal() {
    let h = harness_with(
        PublisherConfig::default().with_update_interval(INTERVAL),
        SimulatedFusedClient::failing_connection(),
    );
    h.publisher.start().await.unwrap();
    assert!(!h.publisher.fused_client_attached());
    assert_eq!(h.publisher.state(), PublisherState::Idle);

    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.fixes(ProviderIdentity::Network).len() >= 2).await;
    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_dropped_fused_connection_is_skipped() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.fused.last_fix().is_some()).await;

    h.fused.drop_connection();
    let local_before = h.registry.fixes(ProviderIdentity::Gps).len();
    wait_for(|| h.publisher.stats().fused_skipped >= 2).await;

    assert!(h.registry.fixes(ProviderIdentity::Gps).len() > local_before);
    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_releases_fused_client_after_lost_connection() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.fused.last_fix().is_some()).await;

    h.fused.drop_connection();
    h.publisher.stop().await.unwrap();

    assert_eq!(h.fused.disconnect_calls(), 1);
    assert!(!h.fused.is_connected());
}

#[tokio::test]
async fn test_fused_disabled_by_config_is_never_touched() {
    let h = harness_with(
        PublisherConfig::default()
            .with_update_interval(INTERVAL)
            .with_fused_enabled(false),
        SimulatedFusedClient::new(),
    );
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.fixes(ProviderIdentity::Gps).len() >= 2).await;

    assert!(!h.publisher.fused_client_attached());
    assert!(h.fused.fixes().is_empty());
    h.publisher.stop().await.unwrap();
}

#[tokio::test]
async fn test_revoked_mock_permission_keeps_publisher_running() {
    let h = harness();
    h.publisher.start().await.unwrap();
    h.publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| h.registry.last_fix(ProviderIdentity::Gps).is_some()).await;

    h.registry.set_mock_location_granted(false);
    h.fused.set_mock_location_granted(false);
    wait_for(|| h.publisher.stats().registry_failures >= 4).await;
    assert_eq!(h.publisher.state(), PublisherState::Publishing);

    h.registry.set_mock_location_granted(true);
    let published = h.publisher.stats().registry_publishes;
    wait_for(|| h.publisher.stats().registry_publishes > published).await;

    h.publisher.stop().await.unwrap();
}

struct FixedClock {
    now: DateTime<Utc>,
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn elapsed_realtime(&self) -> Option<Duration> {
        Some(Duration::from_secs(42))
    }
}

#[tokio::test]
async fn test_fix_is_stamped_by_clock() {
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let registry = Arc::new(InMemoryLocationRegistry::new());
    let publisher = MockLocationPublisher::new(
        PublisherConfig::default().with_update_interval(INTERVAL),
        registry.clone(),
        Arc::new(StaticPermissions::all_granted()),
    )
    .with_clock(Arc::new(FixedClock { now }));

    publisher.start().await.unwrap();
    publisher.handle_command(&LocationCommand::new("1", "2"));
    wait_for(|| registry.last_fix(ProviderIdentity::Gps).is_some()).await;

    let fix = registry.last_fix(ProviderIdentity::Gps).unwrap();
    assert_eq!(fix.time, now);
    assert_eq!(fix.elapsed_realtime, Some(Duration::from_secs(42)));

    publisher.stop().await.unwrap();
}
