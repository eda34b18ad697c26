//! Geo Resolver
//!
//! 1. 无法解析为 IP 的地址直接失败（InvalidAddress），不访问任何外部服务
//! 2. 私有/回环地址：用本机公网 IP 代替
//!    - 按顺序尝试 [`PublicIpDiscovery`]，第一个返回公网地址的胜出
//!    - 若该结果不带国家，再走一遍国家查询链
//!    - 全部失败 → ResolutionExhausted
//! 3. 公网地址：按顺序尝试 [`CountryLookup`]，第一个成功的胜出；
//!    全部失败时返回国家为 UNKNOWN 的结果
//!
//! 每个 provider 每次解析最多调用一次，超时视为失败并立即尝试下一个。

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, error, info, trace, warn};

use super::external_api::{EchoLookup, ExternalApiLookup, SelfLookup};
use super::maxmind::MaxMindProvider;
use super::provider::{CountryLookup, DetectedVia, GeoInfo, GeoLookupResult, PublicIpDiscovery};
use crate::config::GeoConfig;
use crate::errors::{GeoBlockError, Result};
use crate::utils::ip::is_private_or_local;

/// 私有地址共用一个缓存条目：它们都解析为本机公网 IP
const SELF_CACHE_KEY: &str = "<self>";

pub struct GeoResolver {
    country_lookups: Vec<Arc<dyn CountryLookup>>,
    discoveries: Vec<Arc<dyn PublicIpDiscovery>>,
    provider_timeout: Duration,
    cache: Option<Cache<String, GeoLookupResult>>,
}

pub struct GeoResolverBuilder {
    country_lookups: Vec<Arc<dyn CountryLookup>>,
    discoveries: Vec<Arc<dyn PublicIpDiscovery>>,
    provider_timeout: Duration,
    cache_ttl: Option<Duration>,
    cache_capacity: u64,
}

impl GeoResolverBuilder {
    pub fn with_country_lookup(mut self, provider: Arc<dyn CountryLookup>) -> Self {
        self.country_lookups.push(provider);
        self
    }

    pub fn with_discovery(mut self, provider: Arc<dyn PublicIpDiscovery>) -> Self {
        self.discoveries.push(provider);
        self
    }

    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// A zero TTL disables caching.
    pub fn cache(mut self, ttl: Duration, capacity: u64) -> Self {
        self.cache_ttl = (!ttl.is_zero()).then_some(ttl);
        self.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> GeoResolver {
        let cache = self.cache_ttl.map(|ttl| {
            Cache::builder()
                .time_to_live(ttl)
                .max_capacity(self.cache_capacity)
                .build()
        });

        GeoResolver {
            country_lookups: self.country_lookups,
            discoveries: self.discoveries,
            provider_timeout: self.provider_timeout,
            cache,
        }
    }
}

impl GeoResolver {
    pub fn builder() -> GeoResolverBuilder {
        GeoResolverBuilder {
            country_lookups: Vec::new(),
            discoveries: Vec::new(),
            provider_timeout: Duration::from_secs(5),
            cache_ttl: None,
            cache_capacity: 0,
        }
    }

    /// 根据 `[geo]` 配置组装 provider 链
    ///
    /// 国家查询：MaxMind（若配置且可读）→ country_lookup_urls
    /// 公网 IP 探测：self_lookup_url → echo_urls
    pub fn from_config(config: &GeoConfig) -> Self {
        let lookup_timeout = Duration::from_millis(config.provider_timeout_ms);
        let echo_timeout = Duration::from_millis(config.echo_timeout_ms);

        let mut builder = Self::builder()
            .provider_timeout(lookup_timeout.max(echo_timeout))
            .cache(
                Duration::from_secs(config.cache_ttl_secs),
                config.cache_capacity,
            );

        if let Some(ref path) = config.maxminddb_path {
            match MaxMindProvider::new(path) {
                Ok(provider) => {
                    info!("GeoIP: Using MaxMind database at {}", path);
                    builder = builder.with_country_lookup(Arc::new(provider));
                }
                Err(e) => warn!("GeoIP: {}, continuing with external APIs only", e),
            }
        }

        for url in &config.country_lookup_urls {
            builder = builder.with_country_lookup(Arc::new(ExternalApiLookup::new(url, lookup_timeout)));
        }

        builder = builder.with_discovery(Arc::new(SelfLookup::new(
            &config.self_lookup_url,
            lookup_timeout,
        )));
        for url in &config.echo_urls {
            builder = builder.with_discovery(Arc::new(EchoLookup::new(url, echo_timeout)));
        }

        let resolver = builder.build();
        info!(
            "GeoIP: country lookups [{}], public IP discovery [{}]",
            resolver.country_lookup_names().join(", "),
            resolver.discovery_names().join(", ")
        );
        resolver
    }

    pub fn country_lookup_names(&self) -> Vec<&str> {
        self.country_lookups.iter().map(|p| p.name()).collect()
    }

    pub fn discovery_names(&self) -> Vec<&str> {
        self.discoveries.iter().map(|p| p.name()).collect()
    }

    /// 解析客户端地址
    ///
    /// `Err` 只在地址无法解析或私有地址的公网 IP 探测全部失败时返回；
    /// 调用方应把它当作国家未知，而不是放行/拒绝的依据。
    pub async fn resolve(&self, client_ip: &str) -> Result<GeoLookupResult> {
        let addr: IpAddr = client_ip.trim().parse().map_err(|_| {
            GeoBlockError::invalid_address(format!("'{}' is not an IP address", client_ip))
        })?;

        let is_private = is_private_or_local(&addr);
        let key = if is_private {
            SELF_CACHE_KEY.to_string()
        } else {
            addr.to_string()
        };

        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&key).await
        {
            trace!("GeoIP cache hit for {} -> {}", key, hit.country);
            return Ok(hit);
        }

        let result = if is_private {
            debug!("Private IP {} detected, discovering host public IP", addr);
            self.discover_public().await?
        } else {
            let info = self.lookup_country(&key).await;
            GeoLookupResult::new(key.clone(), info, DetectedVia::Direct)
        };

        // 只缓存完整结果，失败的 provider 恢复后下一次请求即可生效
        if result.has_country()
            && let Some(cache) = &self.cache
        {
            cache.insert(key, result.clone()).await;
        }

        Ok(result)
    }

    async fn bounded<T, F>(&self, provider: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.provider_timeout, fut)
            .await
            .unwrap_or_else(|_| {
                Err(GeoBlockError::timeout(format!(
                    "{} did not answer within {:?}",
                    provider, self.provider_timeout
                )))
            })
    }

    async fn lookup_country(&self, ip: &str) -> Option<GeoInfo> {
        for provider in &self.country_lookups {
            match self.bounded(provider.name(), provider.lookup(ip)).await {
                Ok(info) => {
                    debug!("GeoIP {} resolved {} -> {}", provider.name(), ip, info.country);
                    return Some(info);
                }
                Err(e) if e.is_recoverable() => {
                    warn!("GeoIP {} failed for {}: {}", provider.name(), ip, e)
                }
                Err(e) => error!("GeoIP {} rejected {}: {}", provider.name(), ip, e),
            }
        }
        warn!("Could not determine country for IP {}", ip);
        None
    }

    async fn discover_public(&self) -> Result<GeoLookupResult> {
        for provider in &self.discoveries {
            let discovered = match self.bounded(provider.name(), provider.discover()).await {
                Ok(discovered) => discovered,
                Err(e) => {
                    if e.is_recoverable() {
                        warn!("Public IP discovery via {} failed: {}", provider.name(), e);
                    } else {
                        error!("Public IP discovery via {} errored: {}", provider.name(), e);
                    }
                    continue;
                }
            };

            if is_private_or_local(&discovered.ip) {
                warn!(
                    "Public IP discovery via {} returned non-public address {}",
                    provider.name(),
                    discovered.ip
                );
                continue;
            }

            let ip = discovered.ip.to_string();
            info!("Got public IP from {}: {}", provider.name(), ip);
            let info = match discovered.info {
                Some(info) => Some(info),
                None => self.lookup_country(&ip).await,
            };
            return Ok(GeoLookupResult::new(ip, info, DetectedVia::PublicIpDiscovery));
        }

        Err(GeoBlockError::resolution_exhausted(
            "could not discover a public IP from any provider",
        ))
    }
}
