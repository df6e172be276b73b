//! API key domain: entity, capabilities, repository contract

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKey, ApiKeyId, ApiKeyPatch, Capabilities, Capability};
pub use repository::ApiKeyRepository;
pub use validation::{validate_api_key_id, ApiKeyValidationError};
