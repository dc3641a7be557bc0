//! IP geolocation with a bounded, TTL-aware cache
//!
//! Lookups go to an external JSON service (ip-api.com compatible) through
//! the [`GeoProvider`] capability, so the resolver is testable without
//! network access. Results are cached with per-entry time-to-live:
//! successful lookups for 24 hours, service-confirmed failures for
//! 5 minutes, and network/timeout failures for 1 minute, distinguishing
//! "the service has no data" from "we could not ask".
//!
//! The resolver never returns an error: any failure degrades to a `fail`
//! result tagged `fetch_failed` and the caller falls back to unknowns.

use anyhow::Result;
use async_trait::async_trait;
use moka::{future::Cache, Expiry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Message tag for results synthesized on network failure or timeout.
pub const FETCH_FAILED: &str = "fetch_failed";

/// Response fields requested from the lookup service.
const GEO_FIELDS: &str = "status,message,query,country,countryCode,region,regionName,city";

/// Tagged result of a geolocation lookup, mirroring the service's wire
/// format (`status` discriminates the variants).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GeoResult {
    #[serde(rename_all = "camelCase")]
    Success {
        #[serde(default)]
        country: Option<String>,
        #[serde(default)]
        country_code: Option<String>,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        region_name: Option<String>,
        #[serde(default)]
        city: Option<String>,
        #[serde(default)]
        query: Option<String>,
    },
    Fail {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        query: Option<String>,
    },
}

impl GeoResult {
    /// Synthesized failure for an unreachable or too-slow service.
    pub fn fetch_failed(ip: &str) -> Self {
        GeoResult::Fail {
            message: Some(FETCH_FAILED.to_string()),
            query: Some(ip.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GeoResult::Success { .. })
    }

    /// True for failures we synthesized locally, as opposed to failures the
    /// service itself reported.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            GeoResult::Fail { message, .. } if message.as_deref() == Some(FETCH_FAILED)
        )
    }
}

/// One call to the external geolocation service.
#[async_trait]
pub trait GeoProvider: Send + Sync {
    /// Fetch the geolocation of `ip`. An empty string asks the service to
    /// infer the address from its own connecting peer.
    async fn fetch(&self, ip: &str) -> Result<GeoResult>;
}

/// HTTP provider for ip-api.com style services
/// (`GET {base}/json/{ip}?fields=...&lang=...`).
pub struct IpApiProvider {
    client: reqwest::Client,
    base_url: String,
    lang: String,
}

impl IpApiProvider {
    pub fn new(base_url: &str, lang: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            lang: lang.to_string(),
        })
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    async fn fetch(&self, ip: &str) -> Result<GeoResult> {
        let url = format!("{}/json/{}", self.base_url, ip);
        let result = self
            .client
            .get(&url)
            .query(&[("fields", GEO_FIELDS), ("lang", self.lang.as_str())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?
            .json::<GeoResult>()
            .await?;
        Ok(result)
    }
}

/// Cache sizing and expiry for the resolver.
#[derive(Debug, Clone)]
pub struct GeoCacheConfig {
    pub capacity: u64,
    /// TTL for successful lookups.
    pub success_ttl: Duration,
    /// TTL for failures reported by the service.
    pub fail_ttl: Duration,
    /// TTL for network/timeout failures.
    pub error_ttl: Duration,
}

impl Default for GeoCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            success_ttl: Duration::from_secs(24 * 60 * 60),
            fail_ttl: Duration::from_secs(5 * 60),
            error_ttl: Duration::from_secs(60),
        }
    }
}

struct GeoResultExpiry {
    success_ttl: Duration,
    fail_ttl: Duration,
    error_ttl: Duration,
}

impl GeoResultExpiry {
    fn ttl_for(&self, result: &GeoResult) -> Duration {
        if result.is_success() {
            self.success_ttl
        } else if result.is_fetch_failure() {
            self.error_ttl
        } else {
            self.fail_ttl
        }
    }
}

impl Expiry<String, GeoResult> for GeoResultExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &GeoResult,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(self.ttl_for(value))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &GeoResult,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.ttl_for(value))
    }
}

/// Caching geolocation resolver over an injected provider.
pub struct GeoResolver {
    provider: Arc<dyn GeoProvider>,
    cache: Cache<String, GeoResult>,
    call_timeout: Duration,
}

impl GeoResolver {
    pub fn new(
        provider: Arc<dyn GeoProvider>,
        call_timeout: Duration,
        cache_config: GeoCacheConfig,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(cache_config.capacity)
            .expire_after(GeoResultExpiry {
                success_ttl: cache_config.success_ttl,
                fail_ttl: cache_config.fail_ttl,
                error_ttl: cache_config.error_ttl,
            })
            .build();

        Self {
            provider,
            cache,
            call_timeout,
        }
    }

    /// Resolve `ip` to a geolocation result, serving live cache entries
    /// without an external call. Always returns a value.
    ///
    /// Concurrent misses for the same address may each reach the provider
    /// and overwrite one another's cache entry; the lookup is idempotent so
    /// last write wins.
    pub async fn resolve(&self, ip: &str) -> GeoResult {
        if let Some(hit) = self.cache.get(ip).await {
            return hit;
        }

        let result = match tokio::time::timeout(self.call_timeout, self.provider.fetch(ip)).await {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                tracing::debug!(ip = %ip, error = %err, "geolocation lookup failed");
                GeoResult::fetch_failed(ip)
            }
            Err(_) => {
                tracing::debug!(
                    ip = %ip,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "geolocation lookup timed out"
                );
                GeoResult::fetch_failed(ip)
            }
        };

        self.cache.insert(ip.to_string(), result.clone()).await;
        result
    }
}
