//! API key infrastructure: secret generation, storage, registry

mod generator;
mod in_memory;
mod registry;

pub use generator::{GeneratedSecret, SecretGenerator};
pub use in_memory::InMemoryApiKeyRepository;
pub use registry::{ApiKeyRegistry, CreateKeyParams, CreatedKey};
