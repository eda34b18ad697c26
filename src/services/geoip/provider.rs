//! GeoIP Provider 抽象层
//!
//! 两类策略：
//! - [`CountryLookup`]: 给定公网 IP，返回国家
//! - [`PublicIpDiscovery`]: 不给参数，返回本机的公网 IP（可能附带国家）
//!
//! 解析器按固定顺序遍历策略列表，第一个成功的结果胜出。

use std::net::IpAddr;

use async_trait::async_trait;
use serde::Serialize;

use super::country::CountryCode;
use crate::errors::Result;

/// 地理位置信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: CountryCode,
    pub city: Option<String>,
    pub region: Option<String>,
    pub isp: Option<String>,
}

impl GeoInfo {
    pub fn country_only(country: CountryCode) -> Self {
        Self {
            country,
            city: None,
            region: None,
            isp: None,
        }
    }
}

/// 本机公网 IP 探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredIp {
    pub ip: IpAddr,
    /// "IP + country" 服务会带上国家；纯 echo 服务为 None
    pub info: Option<GeoInfo>,
}

/// How the resolved IP was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedVia {
    /// The extracted client address was public and looked up as-is.
    Direct,
    /// The client address was private; the host's public address was used.
    PublicIpDiscovery,
}

/// Outcome of one resolution attempt. The IP is always known here; the
/// country may still be [`CountryCode::UNKNOWN`] when every lookup failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoLookupResult {
    pub ip: String,
    pub country: CountryCode,
    pub city: Option<String>,
    pub region: Option<String>,
    pub isp: Option<String>,
    pub detected_via: DetectedVia,
}

impl GeoLookupResult {
    pub fn new(ip: String, info: Option<GeoInfo>, detected_via: DetectedVia) -> Self {
        match info {
            Some(info) => Self {
                ip,
                country: info.country,
                city: info.city,
                region: info.region,
                isp: info.isp,
                detected_via,
            },
            None => Self {
                ip,
                country: CountryCode::UNKNOWN,
                city: None,
                region: None,
                isp: None,
                detected_via,
            },
        }
    }

    pub fn has_country(&self) -> bool {
        !self.country.is_unknown()
    }
}

/// 国家查询 trait
#[async_trait]
pub trait CountryLookup: Send + Sync {
    /// 查询公网 IP 的地理位置；失败返回 Provider / Timeout 错误
    async fn lookup(&self, ip: &str) -> Result<GeoInfo>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &str;
}

/// 公网 IP 探测 trait
#[async_trait]
pub trait PublicIpDiscovery: Send + Sync {
    async fn discover(&self) -> Result<DiscoveredIp>;

    fn name(&self) -> &str;
}
