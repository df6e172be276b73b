//! Cache key derivation
//!
//! Plain string keys pass through untouched (the store adds its namespace
//! prefix). Structured keys are built from a primary identifier plus named
//! components held in a `BTreeMap`, so two logically-equal keys always render
//! identically regardless of the order their fields were added in.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

/// Parameters for structured cache key derivation
#[derive(Debug, Clone, Default)]
pub struct CacheKeyParams {
    /// Primary identifier (e.g. a digest, a key id)
    pub primary: String,
    /// Named components, sorted for deterministic rendering
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Renders the parameters into a cache key
    pub fn render(&self) -> String {
        let mut parts = vec![self.primary.clone()];

        for (k, v) in &self.components {
            parts.push(format!("{}={}", k, v));
        }

        parts.join(":")
    }

    /// Renders into a fixed-width hash key, for inputs too large or too
    /// irregular to embed verbatim
    pub fn render_hashed(&self) -> String {
        let rendered = self.render();
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        rendered.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_plain() {
        let params = CacheKeyParams::new("resolve");
        assert_eq!(params.render(), "resolve");
    }

    #[test]
    fn test_render_with_components() {
        let params = CacheKeyParams::new("stats")
            .with_component("host", "web-1")
            .with_component("window", "60");

        assert_eq!(params.render(), "stats:host=web-1:window=60");
    }

    #[test]
    fn test_component_order_is_irrelevant() {
        let a = CacheKeyParams::new("k")
            .with_component("zebra", "z")
            .with_component("apple", "a");
        let b = CacheKeyParams::new("k")
            .with_component("apple", "a")
            .with_component("zebra", "z");

        assert_eq!(a.render(), b.render());
        assert_eq!(a.render_hashed(), b.render_hashed());
    }

    #[test]
    fn test_render_hashed_is_fixed_width() {
        let params = CacheKeyParams::new("x".repeat(500));
        assert_eq!(params.render_hashed().len(), 16);
    }
}
