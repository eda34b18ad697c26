use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::services::{AppServices, AppStartTime};
use crate::config::StaticConfig;
use crate::services::{AccessGate, BlockListStore, GeoResolver, MemoryOnly};

/// 准备服务器启动的上下文：解析链、封禁列表、网关
pub fn prepare_server_startup(config: &StaticConfig) -> Result<AppServices> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let resolver = Arc::new(GeoResolver::from_config(&config.geo));

    let block_list = Arc::new(
        BlockListStore::with_persistence(Arc::new(MemoryOnly))
            .context("Failed to initialize block list")?,
    );
    warn!("Block list is in-memory only and resets on restart");

    let gate = Arc::new(AccessGate::new(
        resolver.clone(),
        block_list.clone(),
        config.geo.unknown_country_policy,
    ));
    info!("Unknown-country policy: {}", gate.policy());

    debug!("Pre-startup completed in {:?}", start_time.elapsed());

    Ok(AppServices {
        resolver,
        block_list,
        gate,
        start_time: AppStartTime::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnknownCountryPolicy;

    #[test]
    fn test_startup_wires_policy_and_empty_list() {
        let services = prepare_server_startup(&StaticConfig::default()).unwrap();
        assert_eq!(services.gate.policy(), UnknownCountryPolicy::Allow);
        assert!(services.block_list.is_empty());
    }

    #[test]
    fn test_startup_honours_fail_closed() {
        let mut config = StaticConfig::default();
        config.geo.unknown_country_policy = UnknownCountryPolicy::Deny;

        let services = prepare_server_startup(&config).unwrap();
        assert_eq!(services.gate.policy(), UnknownCountryPolicy::Deny);
    }
}
