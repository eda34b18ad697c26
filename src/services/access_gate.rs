//! Access Decision Gate
//!
//! 解析调用方国家 → 查询封禁列表 → 生成一次性的 [`AccessDecision`]。
//! 国家未知时不查询封禁列表，由 [`UnknownCountryPolicy`] 明确决定放行或拒绝。

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::UnknownCountryPolicy;
use crate::errors::Result;
use crate::services::block_list::BlockListStore;
use crate::services::geoip::{CountryCode, DetectedVia, GeoLookupResult, GeoResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    NotBlocked,
    CountryBlocked,
    UnknownCountryAllowed,
    UnknownCountryDenied,
}

/// Outcome of one gate evaluation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub country_code: CountryCode,
    /// Address extracted from the request.
    pub client_ip: String,
    /// Address the country was resolved for; differs from `client_ip` after
    /// public IP discovery.
    pub actual_ip: String,
    pub detected_via: DetectedVia,
    pub timestamp: DateTime<Utc>,
    pub reason: DecisionReason,
}

impl AccessDecision {
    pub fn actual_ip_differs(&self) -> bool {
        self.actual_ip != self.client_ip
    }

    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// 403 响应体
    pub fn denied_response(&self) -> DeniedResponse {
        let (error, message, reason) = match self.reason {
            DecisionReason::UnknownCountryDenied => (
                "Country Unknown",
                "Access denied: Your country could not be determined".to_string(),
                "Unknown-country policy in effect",
            ),
            _ => (
                "Country Blocked",
                format!(
                    "Access denied: Your country ({}) has been blocked",
                    self.country_code
                ),
                "Geo-blocking policy in effect",
            ),
        };

        DeniedResponse {
            success: false,
            error,
            message,
            country_code: self.country_code,
            client_ip: self.client_ip.clone(),
            actual_ip: self.actual_ip_differs().then(|| self.actual_ip.clone()),
            detected_via: self.detected_via,
            blocked_at: self.timestamp_rfc3339(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeniedResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
    pub country_code: CountryCode,
    pub client_ip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_ip: Option<String>,
    pub detected_via: DetectedVia,
    pub blocked_at: String,
    pub reason: &'static str,
}

pub struct AccessGate {
    resolver: Arc<GeoResolver>,
    block_list: Arc<BlockListStore>,
    policy: UnknownCountryPolicy,
}

impl AccessGate {
    pub fn new(
        resolver: Arc<GeoResolver>,
        block_list: Arc<BlockListStore>,
        policy: UnknownCountryPolicy,
    ) -> Self {
        Self {
            resolver,
            block_list,
            policy,
        }
    }

    pub fn policy(&self) -> UnknownCountryPolicy {
        self.policy
    }

    /// 完整的网关流程：解析 + 判定 + 审计日志
    pub async fn evaluate(&self, client_ip: &str) -> AccessDecision {
        let resolved = self.resolver.resolve(client_ip).await;
        let decision = self.decide(client_ip, resolved);
        log_decision(&decision);
        decision
    }

    /// 解析失败按未知国家处理，`actual_ip` 退回到客户端地址
    pub fn decide(&self, client_ip: &str, resolved: Result<GeoLookupResult>) -> AccessDecision {
        let (country_code, actual_ip, detected_via) = match resolved {
            Ok(result) => (result.country, result.ip, result.detected_via),
            Err(e) => {
                warn!("Geo resolution failed for {}: {}", client_ip, e);
                (
                    CountryCode::UNKNOWN,
                    client_ip.to_string(),
                    DetectedVia::Direct,
                )
            }
        };

        let (allowed, reason) = self.check_country(&country_code);
        AccessDecision {
            allowed,
            country_code,
            client_ip: client_ip.to_string(),
            actual_ip,
            detected_via,
            timestamp: Utc::now(),
            reason,
        }
    }

    /// 只依据国家判定，不做任何解析（simulate-vpn 也走这里）
    pub fn check_country(&self, code: &CountryCode) -> (bool, DecisionReason) {
        if code.is_unknown() {
            return match self.policy {
                UnknownCountryPolicy::Allow => (true, DecisionReason::UnknownCountryAllowed),
                UnknownCountryPolicy::Deny => (false, DecisionReason::UnknownCountryDenied),
            };
        }

        if self.block_list.is_blocked(code) {
            (false, DecisionReason::CountryBlocked)
        } else {
            (true, DecisionReason::NotBlocked)
        }
    }
}

fn log_decision(decision: &AccessDecision) {
    if decision.allowed {
        info!(
            "Access ALLOWED: client_ip={} actual_ip={} country={} reason={:?}",
            decision.client_ip, decision.actual_ip, decision.country_code, decision.reason
        );
    } else {
        warn!(
            "Access BLOCKED: client_ip={} actual_ip={} country={} reason={:?}",
            decision.client_ip, decision.actual_ip, decision.country_code, decision.reason
        );
    }
}
