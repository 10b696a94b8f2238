use crate::utils::error::{MockLocationError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Accuracy reported with every fix, the platform's "fine" criterion value.
pub const FINE_ACCURACY: f32 = 1.0;
pub const FIXED_ALTITUDE: f64 = 0.0;
pub const FIXED_BEARING: f32 = 0.0;
pub const FIXED_SPEED: f32 = 0.0;

/// Simulated source of location data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderIdentity {
    Gps,
    Network,
}

impl ProviderIdentity {
    pub const ALL: [ProviderIdentity; 2] = [ProviderIdentity::Gps, ProviderIdentity::Network];

    pub fn name(&self) -> &'static str {
        match self {
            ProviderIdentity::Gps => "gps",
            ProviderIdentity::Network => "network",
        }
    }

    /// Capabilities announced when the provider is registered as a test provider.
    pub fn properties(&self) -> ProviderProperties {
        match self {
            ProviderIdentity::Gps => ProviderProperties {
                requires_network: false,
                requires_satellite: true,
                requires_cell: false,
                has_monetary_cost: false,
                supports_altitude: true,
                supports_speed: true,
                supports_bearing: true,
                power_requirement: PowerRequirement::High,
                accuracy: AccuracyCriterion::Fine,
            },
            ProviderIdentity::Network => ProviderProperties {
                requires_network: true,
                requires_satellite: false,
                requires_cell: false,
                has_monetary_cost: false,
                supports_altitude: true,
                supports_speed: true,
                supports_bearing: true,
                power_requirement: PowerRequirement::Medium,
                accuracy: AccuracyCriterion::Fine,
            },
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderIdentity {
    type Err = MockLocationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gps" => Ok(ProviderIdentity::Gps),
            "network" => Ok(ProviderIdentity::Network),
            other => Err(MockLocationError::InvalidConfigValueError {
                field: "providers".to_string(),
                value: other.to_string(),
                reason: "Unknown provider. Valid providers: gps, network".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerRequirement {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccuracyCriterion {
    Fine,
    Coarse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderProperties {
    pub requires_network: bool,
    pub requires_satellite: bool,
    pub requires_cell: bool,
    pub has_monetary_cost: bool,
    pub supports_altitude: bool,
    pub supports_speed: bool,
    pub supports_bearing: bool,
    pub power_requirement: PowerRequirement,
    pub accuracy: AccuracyCriterion,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single position sample handed to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub provider: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub bearing: f32,
    pub speed: f32,
    pub accuracy: f32,
    pub time: DateTime<Utc>,
    pub elapsed_realtime: Option<Duration>,
}

impl LocationFix {
    pub fn new(
        provider: impl Into<String>,
        target: Coordinates,
        time: DateTime<Utc>,
        elapsed_realtime: Option<Duration>,
    ) -> Self {
        Self {
            provider: provider.into(),
            latitude: target.latitude,
            longitude: target.longitude,
            altitude: FIXED_ALTITUDE,
            bearing: FIXED_BEARING,
            speed: FIXED_SPEED,
            accuracy: FINE_ACCURACY,
            time,
            elapsed_realtime,
        }
    }

    /// Same sample re-addressed to another provider name.
    pub fn for_provider(&self, provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Location[{} {:.6},{:.6} acc={} alt={} t={}",
            self.provider,
            self.latitude,
            self.longitude,
            self.accuracy,
            self.altitude,
            self.time.timestamp_millis()
        )?;
        if let Some(elapsed) = self.elapsed_realtime {
            write!(f, " et={}ms", elapsed.as_millis())?;
        }
        f.write_str("]")
    }
}

/// What to do with a coordinate that is absent or does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatePolicy {
    /// Drop the whole command; the stored target is left untouched.
    #[default]
    Discard,
    /// Substitute 0.0 for the bad coordinate and accept the command.
    DefaultToZero,
}

/// Inbound key-value payload from the automation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationCommand {
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
}

impl LocationCommand {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: Some(latitude.into()),
            longitude: Some(longitude.into()),
        }
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn parse(&self, policy: CoordinatePolicy) -> Result<Coordinates> {
        let longitude = parse_coordinate("longitude", self.longitude.as_deref(), policy)?;
        let latitude = parse_coordinate("latitude", self.latitude.as_deref(), policy)?;
        Ok(Coordinates::new(latitude, longitude))
    }
}

fn parse_coordinate(field: &str, raw: Option<&str>, policy: CoordinatePolicy) -> Result<f64> {
    let parsed = match raw {
        None => Err(MockLocationError::MissingCoordinate {
            field: field.to_string(),
        }),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MockLocationError::InvalidCoordinate {
                field: field.to_string(),
                value: value.to_string(),
            }),
    };

    match (parsed, policy) {
        (Ok(value), _) => Ok(value),
        (Err(e), CoordinatePolicy::DefaultToZero) => {
            tracing::warn!("{}, using 0.0", e);
            Ok(0.0)
        }
        (Err(e), CoordinatePolicy::Discard) => Err(e),
    }
}

/// Why a command was not accepted for processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    PermissionDenied,
    InvalidCoordinates,
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Accepted,
    Rejected(RejectReason),
}

impl CommandStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, CommandStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherState {
    Created,
    ProvidersRegistered,
    Idle,
    Publishing,
    Stopped,
}

impl fmt::Display for PublisherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublisherState::Created => "Created",
            PublisherState::ProvidersRegistered => "ProvidersRegistered",
            PublisherState::Idle => "Idle",
            PublisherState::Publishing => "Publishing",
            PublisherState::Stopped => "Stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AccessFineLocation,
    AccessMockLocation,
}

impl Permission {
    pub fn name(&self) -> &'static str {
        match self {
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Permission::AccessMockLocation => "android.permission.ACCESS_MOCK_LOCATION",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
