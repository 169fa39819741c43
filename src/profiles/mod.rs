//! Deployment Profiles
//!
//! Concrete compositions built on the composition layer: the log-analytics
//! environment itself and the dependent remote-access (bastion) composition
//! that publishes into it.

pub mod access;
pub mod logging;

pub use access::{AccessProfile, AccessProfileConfig};
pub use logging::{
    BootstrapScripts, DashboardTierConfig, IndexerTierConfig, LoggingProfile,
    LoggingProfileConfig, SchedulerTierConfig, SearchTierConfig,
};
