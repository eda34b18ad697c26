//! MaxMind GeoLite2 数据库实现
//!
//! 使用本地 MaxMind GeoLite2-City.mmdb 文件查询国家，放在国家查询链的最前面

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::trace;

use super::country::CountryCode;
use super::provider::{CountryLookup, GeoInfo};
use crate::errors::{GeoBlockError, Result};

/// MaxMind GeoIP Provider
pub struct MaxMindProvider {
    reader: Arc<Reader<Vec<u8>>>,
}

impl MaxMindProvider {
    /// 从文件路径创建 MaxMind Provider
    pub fn new(path: &str) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| {
            GeoBlockError::config(format!("failed to open MaxMind database {}: {}", path, e))
        })?;
        Ok(Self {
            reader: Arc::new(reader),
        })
    }
}

#[async_trait]
impl CountryLookup for MaxMindProvider {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let ip_addr: IpAddr = ip
            .parse()
            .map_err(|_| GeoBlockError::invalid_address(format!("not an IP address: {}", ip)))?;

        let result = self
            .reader
            .lookup(ip_addr)
            .map_err(|e| GeoBlockError::provider(format!("MaxMind lookup for {} failed: {}", ip, e)))?;
        let record: Option<maxminddb::geoip2::City> = result
            .decode()
            .map_err(|e| GeoBlockError::provider(format!("MaxMind decode for {} failed: {}", ip, e)))?;

        let city = record
            .ok_or_else(|| GeoBlockError::provider(format!("{} not found in MaxMind database", ip)))?;

        let country = CountryCode::from_provider(city.country.iso_code).ok_or_else(|| {
            GeoBlockError::provider(format!("MaxMind record for {} has no country", ip))
        })?;
        let city_name = city.city.names.english.map(|s| s.to_string());

        trace!(
            "MaxMind lookup for {}: country={}, city={:?}",
            ip, country, city_name
        );

        Ok(GeoInfo {
            country,
            city: city_name,
            region: None,
            isp: None,
        })
    }

    fn name(&self) -> &str {
        "MaxMind"
    }
}
