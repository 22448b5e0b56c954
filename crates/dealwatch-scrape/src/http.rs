//! HTTP transport seam.
//!
//! The fetcher talks to the network through [`HttpTransport`] so retry and
//! throttle behavior can be exercised against a scripted fake. The
//! production implementation wraps a shared `reqwest` client; connection
//! pooling happens there, never at the application layer.

use crate::error::FetchError;
use crate::identity::Identity;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A completed HTTP exchange, reduced to what the pipeline needs.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Seam over the HTTP client.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with the given identity. Transport-level failures
    /// (connect, DNS, timeout) map to [`FetchError::Network`]; any HTTP
    /// response, whatever its status, comes back as an [`HttpResponse`].
    async fn get(&self, url: &str, identity: &Identity) -> Result<HttpResponse, FetchError>;
}

/// Production transport over `reqwest`.
///
/// One client is shared for direct traffic; clients for proxied identities
/// are built on first use and cached per proxy URL, since a proxy is a
/// client-level setting in `reqwest`.
pub struct ReqwestTransport {
    direct: reqwest::Client,
    by_proxy: Mutex<HashMap<String, reqwest::Client>>,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build the transport with a per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let direct = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self {
            direct,
            by_proxy: Mutex::new(HashMap::new()),
            timeout,
        })
    }

    fn client_for(&self, proxy: Option<&str>) -> Result<reqwest::Client, FetchError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };
        let mut cache = self
            .by_proxy
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = cache.get(proxy) {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .proxy(reqwest::Proxy::all(proxy).map_err(|e| FetchError::Network(e.to_string()))?)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        cache.insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, identity: &Identity) -> Result<HttpResponse, FetchError> {
        let client = self.client_for(identity.proxy.as_deref())?;
        let response = client
            .get(url)
            .header(reqwest::header::USER_AGENT, &identity.user_agent)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}
