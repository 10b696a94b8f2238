use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockLocationError {
    #[error("{field} should be a valid number. '{value}' is given instead")]
    InvalidCoordinate { field: String, value: String },

    #[error("{field} is missing from the command")]
    MissingCoordinate { field: String },

    #[error("Permission '{permission}' is not granted")]
    PermissionDenied { permission: String },

    #[error("Location registry error for provider '{provider}': {message}")]
    RegistryError { provider: String, message: String },

    #[error("Fused location client is not available: {reason}")]
    ClientUnavailable { reason: String },

    #[error("Fused location client is not connected")]
    ClientDisconnected,

    #[error("Publisher is in state {state}, cannot {operation}")]
    InvalidState { state: String, operation: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Permission,
    ExternalClient,
    Registry,
    Lifecycle,
    Configuration,
    System,
}

impl MockLocationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCoordinate { .. } | Self::MissingCoordinate { .. } => {
                ErrorCategory::Input
            }
            Self::PermissionDenied { .. } => ErrorCategory::Permission,
            Self::ClientUnavailable { .. } | Self::ClientDisconnected => {
                ErrorCategory::ExternalClient
            }
            Self::RegistryError { .. } => ErrorCategory::Registry,
            Self::InvalidState { .. } => ErrorCategory::Lifecycle,
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Send latitude and longitude as decimal strings",
            ErrorCategory::Permission => {
                "Grant the location permissions and select this app as the mock location app"
            }
            ErrorCategory::ExternalClient => {
                "Install or update the fused location services on the device"
            }
            ErrorCategory::Registry => "Check that the device supports test location providers",
            ErrorCategory::Lifecycle => "Start the publisher before sending commands",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
            ErrorCategory::System => "Check the process input and output streams",
        }
    }
}

pub type Result<T> = std::result::Result<T, MockLocationError>;
