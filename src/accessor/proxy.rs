//! Egress rotation for the HTTP accessor
//!
//! Every configured proxy gets its own pre-built client. Sessions take the
//! clients in round-robin order, so consecutive pages leave through
//! different outbound identities.

use crate::config::{ProxyConfig, UserAgentConfig};
use crate::ConfigError;
use reqwest::{Client, Proxy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Round-robin pool of HTTP clients, one per egress identity
#[derive(Debug)]
pub struct ProxyRotation {
    clients: Vec<Client>,
    labels: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyRotation {
    /// Builds one client per configured proxy, or a single direct client
    ///
    /// # Returns
    ///
    /// * `Ok(ProxyRotation)` - At least one usable client
    /// * `Err(ConfigError::Egress)` - A proxy could not be set up, or a proxy
    ///   is required and none is configured
    pub fn build(
        user_agent: &UserAgentConfig,
        proxy: Option<&ProxyConfig>,
        navigation_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut clients = Vec::new();
        let mut labels = Vec::new();

        match proxy {
            Some(proxy) if !proxy.urls.is_empty() => {
                for proxy_url in &proxy.urls {
                    let egress = Proxy::all(proxy_url.as_str()).map_err(|e| {
                        ConfigError::Egress(format!("invalid proxy '{}': {}", proxy_url, e))
                    })?;
                    let client = build_http_client(user_agent, navigation_timeout, Some(egress))
                        .map_err(|e| {
                            ConfigError::Egress(format!(
                                "failed to build client for proxy '{}': {}",
                                proxy_url, e
                            ))
                        })?;
                    clients.push(client);
                    labels.push(proxy_url.clone());
                }
            }
            Some(proxy) if proxy.required => {
                return Err(ConfigError::Egress(
                    "proxy is required but no proxy URL is configured".to_string(),
                ));
            }
            _ => {
                let client = build_http_client(user_agent, navigation_timeout, None).map_err(
                    |e| ConfigError::Egress(format!("failed to build HTTP client: {}", e)),
                )?;
                clients.push(client);
                labels.push("direct".to_string());
            }
        }

        tracing::info!("Egress pool ready with {} identities", clients.len());

        Ok(Self {
            clients,
            labels,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the next client and the label of its egress identity
    pub fn next_client(&self) -> (&Client, &str) {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        (&self.clients[index], &self.labels[index])
    }

    /// Number of egress identities in the pool
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Builds an HTTP client with proper configuration
///
/// The overall request timeout doubles as the navigation timeout.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    navigation_timeout: Duration,
    proxy: Option<Proxy>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(navigation_timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }

    builder.build()
}
