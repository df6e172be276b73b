//! Request admission gate
//!
//! Runs ahead of every route. Extracts the presented credential, resolves it
//! through the registry, throttles unresolved traffic per client address, and
//! attaches an [`AuthContext`] for handlers to check capabilities against.
//! After the response is produced, keyed requests are reported to the usage
//! recorder.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use crate::api::state::AppState;
use crate::api::types::{ApiError, RateLimitMeta};
use crate::domain::api_key::{ApiKey, Capability};
use crate::domain::usage::UsageLogEntry;

/// Custom header checked first when extracting the credential
const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter fallback for clients that cannot set headers
const API_KEY_QUERY_PARAM: &str = "api_key";

/// Per-request authentication outcome, inserted as a request extension.
///
/// Anonymous requests carry an empty context; route handlers decide whether
/// that is acceptable via [`AuthContext::require`].
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    api_key: Option<ApiKey>,
}

impl AuthContext {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        Self { api_key }
    }

    pub fn api_key(&self) -> Option<&ApiKey> {
        self.api_key.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api_key.is_some()
    }

    /// Demand a capability: 401 when anonymous, 403 when the key lacks it
    pub fn require(&self, capability: Capability) -> Result<&ApiKey, ApiError> {
        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ApiError::unauthorized("API key required"))?;

        if !key.allows(capability) {
            return Err(ApiError::forbidden(format!(
                "API key lacks the '{}' capability",
                capability
            )));
        }

        Ok(key)
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Admission middleware. Resolution failures (repository down) reject with a
/// server error rather than silently downgrading the request to anonymous.
pub async fn admission(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = match extract_credential(request.headers(), request.uri()) {
        Some(secret) => match state.registry.resolve(&secret).await {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("Credential resolution failed: {}", e);
                return ApiError::internal("Credential resolution failed").into_response();
            }
        },
        None => None,
    };

    let addr = client_addr(&request);

    if resolved.is_none() {
        let decision = state.limiter.check(addr);

        if !decision.allowed {
            debug!(client = %addr, "Throttling unresolved request");
            return ApiError::rate_limited(
                "Too many unauthenticated requests, retry later or present an API key",
                RateLimitMeta {
                    limit: decision.limit,
                    remaining: decision.remaining,
                    reset_in_seconds: decision.reset_in.as_secs_f64().ceil() as u64,
                },
            )
            .into_response();
        }
    }

    let key_id = resolved.as_ref().map(|key| key.id().clone());
    let endpoint = request.uri().path().to_string();
    let method = request.method().to_string();

    request.extensions_mut().insert(AuthContext::new(resolved));

    let started = Instant::now();
    let response = next.run(request).await;

    if let Some(id) = key_id {
        state.recorder.record(UsageLogEntry::new(
            id,
            endpoint,
            method,
            response.status().as_u16(),
            started.elapsed().as_millis() as u64,
            addr.to_string(),
        ));
    }

    response
}

/// Pull the credential from the request, in precedence order: `x-api-key`
/// header, then `Authorization: Bearer`, then the `api_key` query parameter.
/// Empty values are treated as absent.
fn extract_credential(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    if let Some(value) = headers.get(API_KEY_HEADER) {
        if let Ok(value) = value.to_str() {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                let token = token.trim();
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    if let Some(query) = uri.query() {
        for pair in query.split('&') {
            if let Some(value) = pair
                .strip_prefix(API_KEY_QUERY_PARAM)
                .and_then(|rest| rest.strip_prefix('='))
            {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

fn client_addr(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
