//! Cache domain: backend contract and key derivation

mod backend;
mod key;

pub use backend::CacheBackend;
pub use key::CacheKeyParams;
