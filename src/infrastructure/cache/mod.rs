//! Cache infrastructure - tiered store and its backends

mod in_memory;
mod redis;
mod store;

pub use in_memory::{InMemoryBackend, InMemoryBackendConfig};
pub use redis::{RedisBackend, RedisBackendConfig};
pub use store::{CacheStore, CacheStoreConfig};
