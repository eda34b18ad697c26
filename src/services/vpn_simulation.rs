//! VPN 模拟
//!
//! 不做真实解析：直接把请求当作来自指定国家，复用网关的封禁判定。

use chrono::{DateTime, Utc};
use tracing::info;

use crate::services::access_gate::{AccessGate, DecisionReason};
use crate::services::geoip::CountryCode;

/// 模拟出口 IP（固定表，便于手工测试时对照）
const SIMULATED_IPS: &[(&str, &str)] = &[
    ("US", "23.185.0.1"),
    ("DE", "185.199.108.153"),
    ("RU", "46.4.96.137"),
    ("CN", "103.21.244.8"),
    ("FR", "46.19.37.108"),
    ("GB", "151.101.193.140"),
    ("AU", "1.128.0.195"),
    ("CA", "142.112.0.42"),
    ("JP", "210.251.121.3"),
    ("BR", "191.232.38.25"),
    ("IN", "103.21.244.15"),
    ("NL", "185.40.4.193"),
    ("IT", "151.101.1.140"),
    ("ES", "185.199.110.153"),
    ("SE", "185.40.4.194"),
];

/// Deterministic simulated address for a country.
///
/// Codes missing from the table map to `5.{100+a}.{10+b}.1`, where `a`/`b`
/// are the letter indexes, so every code gets its own routable address.
pub fn simulated_ip(code: &CountryCode) -> String {
    let raw = code.as_str();
    if let Some((_, ip)) = SIMULATED_IPS.iter().find(|(c, _)| *c == raw) {
        return (*ip).to_string();
    }

    let (a, b) = match raw.as_bytes() {
        [a, b] => (a.saturating_sub(b'A'), b.saturating_sub(b'A')),
        _ => (0, 0),
    };
    format!("5.{}.{}.1", 100 + u16::from(a), 10 + u16::from(b))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedAccess {
    pub country_code: CountryCode,
    pub country_name: &'static str,
    pub simulated_ip: String,
    pub is_blocked: bool,
    pub reason: DecisionReason,
    pub timestamp: DateTime<Utc>,
}

impl SimulatedAccess {
    pub fn message(&self) -> String {
        if self.is_blocked {
            format!(
                "Access denied: {} ({}) is blocked",
                self.country_name, self.country_code
            )
        } else {
            format!(
                "Access granted from {} ({})",
                self.country_name, self.country_code
            )
        }
    }
}

pub fn simulate(gate: &AccessGate, country_code: CountryCode) -> SimulatedAccess {
    let (allowed, reason) = gate.check_country(&country_code);
    let access = SimulatedAccess {
        country_code,
        country_name: country_code.name().unwrap_or("Unknown Country"),
        simulated_ip: simulated_ip(&country_code),
        is_blocked: !allowed,
        reason,
        timestamp: Utc::now(),
    };

    info!(
        "VPN simulation: country={} simulated_ip={} {}",
        access.country_code,
        access.simulated_ip,
        if access.is_blocked { "BLOCKED" } else { "ALLOWED" }
    );
    access
}
