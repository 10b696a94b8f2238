pub mod publish_loop;
pub mod publisher;

pub use crate::domain::model::{
    CommandStatus, Coordinates, LocationCommand, LocationFix, ProviderIdentity, PublisherState,
};
pub use crate::domain::ports::{Clock, FusedLocationClient, LocationRegistry, PermissionChecker};
pub use crate::utils::error::Result;
