//! Rate-limited HTTP client for the museum APIs
//!
//! The Met fetcher may issue several detail requests in one cycle while it
//! samples for an object with an image. Every museum request waits for a
//! permit from a token bucket first so a run of misses stays polite.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::Result;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 5,
            burst_size: 5,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A rate-limited HTTP client wrapper
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    /// Create a new rate-limited client
    pub fn new(name: &str, config: RateLimitConfig) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        let limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            client: Client::builder().timeout(config.timeout).build()?,
            limiter,
            name: name.to_string(),
        })
    }

    /// Client for the Met collection API (documented limit is 80 req/s)
    pub fn for_met() -> Result<Self> {
        Self::new("met", RateLimitConfig::default())
    }

    /// Client for the Rijksmuseum collection API
    pub fn for_rijksmuseum() -> Result<Self> {
        Self::new(
            "rijksmuseum",
            RateLimitConfig {
                requests_per_second: 2,
                burst_size: 2,
                ..Default::default()
            },
        )
    }

    /// Wait for rate limit and make a GET request
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request");

        Ok(self.client.get(url).send().await?)
    }

    /// Wait for rate limit and make a GET request with query parameters
    pub async fn get_with_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        query: &T,
    ) -> Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request with query");

        Ok(self.client.get(url).query(query).send().await?)
    }

    /// Wait for a rate limit permit
    pub async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}
