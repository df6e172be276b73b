//! Domain layer: entities, repository contracts, errors

pub mod api_key;
pub mod cache;
pub mod metrics;
pub mod usage;

mod error;

pub use error::DomainError;
