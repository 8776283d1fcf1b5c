//! Server locator.
//!
//! Before a transport can be opened, the platform is asked where the
//! channel's socket server lives: a GET of
//! `https://{domain}/socketconfig/{channel}.json` returns a list of
//! servers, secure ones preferred. The HTTP fetch sits behind a trait so
//! the handshake can be exercised without a network.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use cuebot_core::{ConnectError, ConnectResult};

/// HTTP GET capability for the socket-config metadata fetch.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Fetches the body at `url`.
    async fn get(&self, url: &str) -> ConnectResult<String>;
}

/// Builds the socket-config metadata URL for a channel.
pub fn socket_config_url(domain: &str, channel: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("http") {
        format!("{domain}/socketconfig/{channel}.json")
    } else {
        format!("https://{domain}/socketconfig/{channel}.json")
    }
}

/// Picks the transport endpoint out of a socket-config body.
///
/// Secure servers win; without one, the first listed server is used.
pub fn pick_server(body: &str) -> ConnectResult<String> {
    let config: Value = serde_json::from_str(body).map_err(|e| ConnectError::SocketConfig {
        reason: format!("invalid socket config: {e}"),
    })?;

    if let Some(error) = config.get("error").and_then(Value::as_str) {
        return Err(ConnectError::SocketConfig {
            reason: error.to_string(),
        });
    }

    let servers = config
        .get("servers")
        .and_then(Value::as_array)
        .ok_or_else(|| ConnectError::SocketConfig {
            reason: "no servers in socket config".into(),
        })?;

    let url_of = |server: &Value| {
        server
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let secure = servers
        .iter()
        .filter(|s| s.get("secure").and_then(Value::as_bool).unwrap_or(false))
        .find_map(url_of);
    if let Some(url) = secure {
        debug!(url = %url, "using secure server");
        return Ok(url);
    }

    servers
        .iter()
        .find_map(url_of)
        .inspect(|url| debug!(url = %url, "no secure servers, using first listed"))
        .ok_or_else(|| ConnectError::SocketConfig {
            reason: "no servers in socket config".into(),
        })
}

/// Rewrites an http(s) server URL into its ws(s) form.
pub fn transport_url(server: &str) -> String {
    if let Some(rest) = server.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        server.to_string()
    }
}

/// Resolves the transport endpoint for a channel.
pub async fn resolve_endpoint(
    fetch: &dyn HttpFetch,
    domain: &str,
    channel: &str,
) -> ConnectResult<String> {
    let url = socket_config_url(domain, channel);
    info!(url = %url, "fetching socket config");
    let body = fetch.get(&url).await?;
    pick_server(&body)
}

// =============================================================================
// ReqwestFetch
// =============================================================================

/// [`HttpFetch`] backed by a shared `reqwest` client.
#[cfg(feature = "ws-client")]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

#[cfg(feature = "ws-client")]
impl ReqwestFetch {
    /// Creates a fetcher with the given request timeout.
    ///
    /// Fails when the HTTP client cannot be initialized, e.g. when the
    /// TLS backend is unavailable.
    pub fn new(timeout: std::time::Duration) -> ConnectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConnectError::SocketConfig {
                reason: format!("http client init failed: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "ws-client")]
#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> ConnectResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConnectError::SocketConfig {
                reason: format!("socket config fetch failed: {e}"),
            })?;
        let response = response
            .error_for_status()
            .map_err(|e| ConnectError::SocketConfig {
                reason: format!("socket config fetch failed: {e}"),
            })?;
        response.text().await.map_err(|e| ConnectError::SocketConfig {
            reason: format!("socket config body unreadable: {e}"),
        })
    }
}
