//! Infrastructure layer: concrete implementations of the domain contracts

pub mod api_key;
pub mod cache;
pub mod logging;
pub mod metrics;
pub mod throttle;
pub mod usage;
