//! GeoIP 服务模块
//!
//! 提供 IP 地址 → 国家的解析，支持：
//! - MaxMind GeoLite2 本地数据库（可选）
//! - 外部 API 查询链 (ipinfo.io / ip-api.com 格式)
//! - 私有地址的本机公网 IP 探测

pub mod country;
mod external_api;
mod maxmind;
mod provider;
mod resolver;

pub use country::{CountryCode, country_name, parse_country_list};
pub use external_api::{EchoLookup, ExternalApiLookup, SelfLookup, parse_geo_json};
pub use maxmind::MaxMindProvider;
pub use provider::{
    CountryLookup, DetectedVia, DiscoveredIp, GeoInfo, GeoLookupResult, PublicIpDiscovery,
};
pub use resolver::{GeoResolver, GeoResolverBuilder};
