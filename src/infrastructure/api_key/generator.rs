//! Secret generation and digest verification
//!
//! Secrets are high-entropy, shown exactly once at creation. Only a sha256
//! digest and a short lookup prefix are ever stored.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Number of random characters included in the lookup prefix
const PREFIX_RANDOM_CHARS: usize = 8;

/// Result of generating a new secret
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// The full plaintext secret (only surfaced once, at creation)
    pub secret: String,
    /// The lookup prefix stored alongside the digest
    pub prefix: String,
    /// The digest stored for verification
    pub hash: String,
}

/// Generator for gateway credentials
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    /// Type prefix for all generated secrets (e.g. "fm_")
    prefix: String,
    /// Number of random bytes per secret
    secret_bytes: usize,
}

impl SecretGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            secret_bytes: 32,
        }
    }

    /// Generator for fleet-metrics gateway keys
    pub fn fleet() -> Self {
        Self::new("fm_")
    }

    /// Generate a new secret
    pub fn generate(&self) -> GeneratedSecret {
        let mut random_bytes = vec![0u8; self.secret_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let encoded = URL_SAFE_NO_PAD.encode(&random_bytes);
        let secret = format!("{}{}", self.prefix, encoded);
        let prefix = format!(
            "{}{}",
            self.prefix,
            &encoded[..PREFIX_RANDOM_CHARS.min(encoded.len())]
        );
        let hash = self.hash_secret(&secret);

        GeneratedSecret {
            secret,
            prefix,
            hash,
        }
    }

    /// Digest a secret for storage
    pub fn hash_secret(&self, secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        let digest = hasher.finalize();
        format!("sha256${}", URL_SAFE_NO_PAD.encode(digest))
    }

    /// Verify a presented secret against a stored digest
    pub fn verify_secret(&self, secret: &str, stored_hash: &str) -> bool {
        constant_time_compare(&self.hash_secret(secret), stored_hash)
    }

    /// Extract the lookup prefix from a presented secret
    pub fn extract_prefix(secret: &str) -> Option<&str> {
        let underscore = secret.find('_')?;
        let end = (underscore + 1 + PREFIX_RANDOM_CHARS).min(secret.len());
        Some(&secret[..end])
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::fleet()
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;

    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_shape() {
        let generator = SecretGenerator::fleet();
        let generated = generator.generate();

        assert!(generated.secret.starts_with("fm_"));
        assert!(generated.prefix.starts_with("fm_"));
        assert_eq!(generated.prefix.len(), "fm_".len() + 8);
        assert!(generated.hash.starts_with("sha256$"));
        // 32 bytes base64-encoded plus prefix
        assert!(generated.secret.len() > 40);
    }

    #[test]
    fn test_secrets_are_unique() {
        let generator = SecretGenerator::fleet();
        let a = generator.generate();
        let b = generator.generate();

        assert_ne!(a.secret, b.secret);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_verify_secret() {
        let generator = SecretGenerator::fleet();
        let generated = generator.generate();

        assert!(generator.verify_secret(&generated.secret, &generated.hash));
        assert!(!generator.verify_secret("fm_wrong", &generated.hash));
    }

    #[test]
    fn test_hash_is_deterministic() {
        let generator = SecretGenerator::fleet();
        assert_eq!(
            generator.hash_secret("fm_fixed"),
            generator.hash_secret("fm_fixed")
        );
    }

    #[test]
    fn test_extract_prefix() {
        assert_eq!(
            SecretGenerator::extract_prefix("fm_abc12345xyz789"),
            Some("fm_abc12345")
        );
        assert_eq!(SecretGenerator::extract_prefix("fm_abc"), Some("fm_abc"));
        assert_eq!(SecretGenerator::extract_prefix("noprefix"), None);
    }

    #[test]
    fn test_prefix_matches_generated_secret() {
        let generator = SecretGenerator::fleet();
        let generated = generator.generate();

        assert_eq!(
            SecretGenerator::extract_prefix(&generated.secret),
            Some(generated.prefix.as_str())
        );
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("same", "same"));
        assert!(!constant_time_compare("same", "diff"));
        assert!(!constant_time_compare("same", "sam"));
    }
}
