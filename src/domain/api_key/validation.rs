//! API key identifier validation

use thiserror::Error;

const MAX_ID_LENGTH: usize = 64;

/// Validation errors for API key identifiers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiKeyValidationError {
    #[error("API key ID cannot be empty")]
    Empty,

    #[error("API key ID cannot exceed {MAX_ID_LENGTH} characters (got {0})")]
    TooLong(usize),

    #[error("API key ID may only contain alphanumeric characters and hyphens: '{0}'")]
    InvalidCharacters(String),
}

/// Validates an API key identifier: non-empty, bounded, alphanumeric + hyphens
pub fn validate_api_key_id(id: &str) -> Result<(), ApiKeyValidationError> {
    if id.is_empty() {
        return Err(ApiKeyValidationError::Empty);
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(ApiKeyValidationError::TooLong(id.len()));
    }

    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiKeyValidationError::InvalidCharacters(id.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(validate_api_key_id("ops-dashboard").is_ok());
        assert!(validate_api_key_id("key1").is_ok());
        assert!(validate_api_key_id(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_empty_id() {
        assert_eq!(validate_api_key_id(""), Err(ApiKeyValidationError::Empty));
    }

    #[test]
    fn test_too_long_id() {
        assert_eq!(
            validate_api_key_id(&"a".repeat(65)),
            Err(ApiKeyValidationError::TooLong(65))
        );
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            validate_api_key_id("no spaces"),
            Err(ApiKeyValidationError::InvalidCharacters(_))
        ));
        assert!(matches!(
            validate_api_key_id("no_underscores"),
            Err(ApiKeyValidationError::InvalidCharacters(_))
        ));
    }
}
