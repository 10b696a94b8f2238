pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::PublisherConfig;
pub use core::publisher::MockLocationPublisher;
pub use domain::model::{
    CommandStatus, Coordinates, CoordinatePolicy, LocationCommand, LocationFix, Permission,
    ProviderIdentity, PublisherState, RejectReason,
};
pub use utils::error::{MockLocationError, Result};
