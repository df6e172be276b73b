//! API key entity and capability types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_api_key_id, ApiKeyValidationError};

/// API key identifier - alphanumeric + hyphens, max 64 characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Create a new ApiKeyId after validation
    pub fn new(id: impl Into<String>) -> Result<Self, ApiKeyValidationError> {
        let id = id.into();
        validate_api_key_id(&id)?;
        Ok(Self(id))
    }

    /// Generate a new unique identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKeyId {
    type Error = ApiKeyValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ApiKeyId> for String {
    fn from(id: ApiKeyId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single named capability a key may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    ViewStats,
    ViewKeys,
    CreateKey,
    DeleteKey,
    PowerCommands,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ViewStats => write!(f, "view-stats"),
            Self::ViewKeys => write!(f, "view-keys"),
            Self::CreateKey => write!(f, "create-key"),
            Self::DeleteKey => write!(f, "delete-key"),
            Self::PowerCommands => write!(f, "power-commands"),
        }
    }
}

/// Fixed-field capability set. Every flag defaults to false: a capability not
/// explicitly granted is denied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub view_stats: bool,
    pub view_keys: bool,
    pub create_key: bool,
    pub delete_key: bool,
    pub power_commands: bool,
}

impl Capabilities {
    /// No capabilities granted
    pub fn none() -> Self {
        Self::default()
    }

    /// Every capability granted
    pub fn all() -> Self {
        Self {
            view_stats: true,
            view_keys: true,
            create_key: true,
            delete_key: true,
            power_commands: true,
        }
    }

    /// Read-only access to metric stats
    pub fn read_only() -> Self {
        Self {
            view_stats: true,
            ..Self::default()
        }
    }

    /// Check whether a specific capability is granted
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ViewStats => self.view_stats,
            Capability::ViewKeys => self.view_keys,
            Capability::CreateKey => self.create_key,
            Capability::DeleteKey => self.delete_key,
            Capability::PowerCommands => self.power_commands,
        }
    }
}

/// An API key as held by the registry.
///
/// The plaintext secret is never stored: only its sha256 digest plus a short
/// lookup prefix survive creation. `rate_limit` is an advisory per-key quota
/// consumed by the dashboard; the admission gate does not enforce it (only
/// unresolved traffic is throttled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    id: ApiKeyId,
    name: String,
    secret_hash: String,
    key_prefix: String,
    capabilities: Capabilities,
    is_active: bool,
    rate_limit: Option<u32>,
    usage_count: u64,
    last_used_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new active key with no capabilities
    pub fn new(
        id: ApiKeyId,
        name: impl Into<String>,
        secret_hash: impl Into<String>,
        key_prefix: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            secret_hash: secret_hash.into(),
            key_prefix: key_prefix.into(),
            capabilities: Capabilities::none(),
            is_active: true,
            rate_limit: None,
            usage_count: 0,
            last_used_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: Option<u32>) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_expires_at(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn rate_limit(&self) -> Option<u32> {
        self.rate_limit
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether the key currently authorizes requests
    pub fn is_valid(&self) -> bool {
        if !self.is_active {
            return false;
        }

        match self.expires_at {
            Some(expires_at) => Utc::now() < expires_at,
            None => true,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.allows(capability)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
        self.touch();
    }

    pub fn set_rate_limit(&mut self, rate_limit: Option<u32>) {
        self.rate_limit = rate_limit;
        self.touch();
    }

    pub fn set_expires_at(&mut self, expires_at: Option<DateTime<Utc>>) {
        self.expires_at = expires_at;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    /// Bump the monotonic usage counter and last-used timestamp
    pub fn mark_used(&mut self) {
        self.usage_count += 1;
        self.last_used_at = Some(Utc::now());
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Partial update applied by `ApiKeyRegistry::update`; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiKeyPatch {
    pub name: Option<String>,
    pub capabilities: Option<Capabilities>,
    pub rate_limit: Option<u32>,
    pub is_active: Option<bool>,
    pub expires_at: Option<DateTime<Utc>>,
}
