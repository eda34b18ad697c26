//! Block List Store
//!
//! 进程内的被封禁国家集合：
//! - 读：`is_blocked` / `snapshot`，无锁（ArcSwap load）
//! - 写：`set_blocked` 整体替换，单次原子 swap，读者不会看到半更新的集合
//!
//! 默认不持久化，重启后为空。`BlockListPersistence` 是为持久化预留的接口。

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::errors::Result;
use crate::services::geoip::CountryCode;

pub type CountrySet = BTreeSet<CountryCode>;

/// Load/save hook the store can be composed with.
pub trait BlockListPersistence: Send + Sync {
    fn load(&self) -> Result<Vec<CountryCode>>;

    fn save(&self, countries: &CountrySet) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// No persistence: the list lives and dies with the process.
pub struct MemoryOnly;

impl BlockListPersistence for MemoryOnly {
    fn load(&self) -> Result<Vec<CountryCode>> {
        Ok(Vec::new())
    }

    fn save(&self, _countries: &CountrySet) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

pub struct BlockListStore {
    current: ArcSwap<CountrySet>,
    persistence: Arc<dyn BlockListPersistence>,
    // 串行化写者，保证 swap 与 save 顺序一致
    write_lock: Mutex<()>,
}

impl BlockListStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(CountrySet::new()),
            persistence: Arc::new(MemoryOnly),
            write_lock: Mutex::new(()),
        }
    }

    /// Build a store seeded from `persistence.load()`.
    pub fn with_persistence(persistence: Arc<dyn BlockListPersistence>) -> Result<Self> {
        let initial: CountrySet = persistence
            .load()?
            .into_iter()
            .filter(|code| !code.is_unknown())
            .collect();
        info!(
            "Block list initialized from {} backend with {} countries",
            persistence.name(),
            initial.len()
        );
        Ok(Self {
            current: ArcSwap::from_pointee(initial),
            persistence,
            write_lock: Mutex::new(()),
        })
    }

    /// 整体替换被封禁国家列表（不合并）
    ///
    /// `UNKNOWN` 不会进入列表：未知国家由 unknown-country 策略决定。
    pub fn set_blocked<I>(&self, countries: I) -> Arc<CountrySet>
    where
        I: IntoIterator<Item = CountryCode>,
    {
        let next: Arc<CountrySet> = Arc::new(
            countries
                .into_iter()
                .filter(|code| !code.is_unknown())
                .collect(),
        );

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.current.store(next.clone());
        if let Err(e) = self.persistence.save(&next) {
            warn!(
                "Failed to persist block list via {}: {}",
                self.persistence.name(),
                e
            );
        }

        next
    }

    pub fn is_blocked(&self, code: &CountryCode) -> bool {
        self.current.load().contains(code)
    }

    pub fn snapshot(&self) -> Arc<CountrySet> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }
}

impl Default for BlockListStore {
    fn default() -> Self {
        Self::new()
    }
}
