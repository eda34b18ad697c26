//! 外部 GeoIP API 实现
//!
//! - [`ExternalApiLookup`]: URL 模板（`{ip}` 占位符）查询国家，如 ipinfo.io / ip-api.com
//! - [`SelfLookup`]: 查询本机公网 IP + 国家（ipinfo.io/json）
//! - [`EchoLookup`]: 纯文本返回本机公网 IP（ipify 等）
//!
//! ureq 是同步客户端，请求放在 spawn_blocking 中执行，超时由 Agent 控制。

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{trace, warn};
use ureq::Agent;

use super::country::CountryCode;
use super::provider::{CountryLookup, DiscoveredIp, GeoInfo, PublicIpDiscovery};
use crate::errors::{GeoBlockError, Result};

fn build_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// 用 URL 的 host 作为 provider 名称
fn host_of(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .split(['/', '?'])
        .next()
        .filter(|host| !host.is_empty())
        .unwrap_or(url)
        .to_string()
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn get_json(agent: &Agent, url: &str) -> Result<serde_json::Value> {
    let resp = agent.get(url).call().map_err(|e| {
        warn!("GeoIP API request to \"{}\" failed: {}", url, e);
        GeoBlockError::provider(format!("request to {} failed: {}", url, e))
    })?;

    resp.into_body().read_json().map_err(|e| {
        warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
        GeoBlockError::provider(format!("invalid JSON from {}: {}", url, e))
    })
}

fn non_empty(json: &serde_json::Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| json[*key].as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// 解析常见 GeoIP API 返回格式
///
/// ipinfo.io: `{"ip": "...", "country": "US", "city": "...", "region": "...", "org": "..."}`
/// ip-api.com: `{"status": "success", "countryCode": "US", "regionName": "...", "isp": "..."}`
/// 失败时 ip-api 返回 `{"status": "fail"}`，ipinfo 对私有地址返回 `{"bogon": true}`
pub fn parse_geo_json(json: &serde_json::Value) -> Option<GeoInfo> {
    if json["status"].as_str() == Some("fail") || json["bogon"].as_bool() == Some(true) {
        trace!("External API returned fail/bogon status");
        return None;
    }

    let country = ["countryCode", "country_code", "country"]
        .iter()
        .find_map(|key| CountryCode::from_provider(json[*key].as_str()))?;

    Some(GeoInfo {
        country,
        city: non_empty(json, &["city"]),
        region: non_empty(json, &["region", "regionName", "region_name"]),
        isp: non_empty(json, &["isp", "org"]),
    })
}

/// 外部 API 国家查询
pub struct ExternalApiLookup {
    name: String,
    url_template: String,
    agent: Agent,
}

impl ExternalApiLookup {
    /// `url_template` 使用 `{ip}` 作为占位符
    /// 例如: `https://ipinfo.io/{ip}/json`
    pub fn new(url_template: &str, timeout: Duration) -> Self {
        Self {
            name: host_of(url_template),
            url_template: url_template.to_string(),
            agent: build_agent(timeout),
        }
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<GeoInfo> {
        let json = get_json(&agent, &url)?;
        parse_geo_json(&json)
            .ok_or_else(|| GeoBlockError::provider(format!("no country in response from {}", url)))
    }
}

#[async_trait]
impl CountryLookup for ExternalApiLookup {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let url = self.url_template.replace("{ip}", ip);
        let agent = self.agent.clone();
        run_blocking(move || Self::fetch_sync(agent, url)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// "IP + country" 探测：一次请求同时拿到本机公网 IP 和国家，两者缺一即失败
pub struct SelfLookup {
    name: String,
    url: String,
    agent: Agent,
}

impl SelfLookup {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            name: host_of(url),
            url: url.to_string(),
            agent: build_agent(timeout),
        }
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<DiscoveredIp> {
        let json = get_json(&agent, &url)?;

        let ip: IpAddr = json["ip"]
            .as_str()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| GeoBlockError::provider(format!("no usable ip in response from {}", url)))?;
        let info = parse_geo_json(&json).ok_or_else(|| {
            GeoBlockError::provider(format!("no country in response from {}", url))
        })?;

        Ok(DiscoveredIp {
            ip,
            info: Some(info),
        })
    }
}

#[async_trait]
impl PublicIpDiscovery for SelfLookup {
    async fn discover(&self) -> Result<DiscoveredIp> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        run_blocking(move || Self::fetch_sync(agent, url)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 纯文本 "what is my IP" 服务
pub struct EchoLookup {
    name: String,
    url: String,
    agent: Agent,
}

impl EchoLookup {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            name: host_of(url),
            url: url.to_string(),
            agent: build_agent(timeout),
        }
    }

    pub fn parse_body(body: &str) -> Option<IpAddr> {
        body.trim().parse().ok()
    }

    fn fetch_sync(agent: Agent, url: String) -> Result<DiscoveredIp> {
        let body = agent
            .get(&url)
            .call()
            .and_then(|resp| resp.into_body().read_to_string())
            .map_err(|e| GeoBlockError::provider(format!("request to {} failed: {}", url, e)))?;

        let ip = Self::parse_body(&body)
            .ok_or_else(|| GeoBlockError::provider(format!("{} did not return an IP", url)))?;

        Ok(DiscoveredIp { ip, info: None })
    }
}

#[async_trait]
impl PublicIpDiscovery for EchoLookup {
    async fn discover(&self) -> Result<DiscoveredIp> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        run_blocking(move || Self::fetch_sync(agent, url)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
