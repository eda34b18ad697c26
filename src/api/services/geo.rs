//! 面向调用方的地理接口：ip-info / test-access / simulate-vpn

use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, Responder, web};
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{info, trace};

use crate::errors::GeoBlockError;
use crate::services::{AccessDecision, AccessGate, CountryCode, GeoResolver, simulate};
use crate::utils::extract_client_ip;

use super::helpers::{error_response, json_response};
use super::types::{IpInfoResponse, SimulateVpnRequest, SimulateVpnResponse, TestAccessResponse};

const UNKNOWN_DETAIL: &str = "Unknown";

pub struct GeoService;

impl GeoService {
    /// 位置探测，不受封禁列表影响
    pub async fn ip_info(
        req: HttpRequest,
        resolver: web::Data<Arc<GeoResolver>>,
    ) -> impl Responder {
        let client_ip = extract_client_ip(&req);
        trace!("ip-info request from {}", client_ip);

        let body = match resolver.resolve(&client_ip).await {
            Ok(result) => IpInfoResponse {
                ip: result.ip,
                country_code: result.country,
                country_name: result
                    .country
                    .name()
                    .unwrap_or(UNKNOWN_DETAIL)
                    .to_string(),
                city: result.city.unwrap_or_else(|| UNKNOWN_DETAIL.to_string()),
                region: result.region.unwrap_or_else(|| UNKNOWN_DETAIL.to_string()),
                isp: result.isp.unwrap_or_else(|| UNKNOWN_DETAIL.to_string()),
            },
            Err(e) => {
                info!("ip-info could not resolve {}: {}", client_ip, e);
                IpInfoResponse {
                    ip: client_ip,
                    country_code: CountryCode::UNKNOWN,
                    country_name: UNKNOWN_DETAIL.to_string(),
                    city: UNKNOWN_DETAIL.to_string(),
                    region: UNKNOWN_DETAIL.to_string(),
                    isp: UNKNOWN_DETAIL.to_string(),
                }
            }
        };

        info!(
            "IP info: {} -> {} ({})",
            body.ip, body.country_code, body.country_name
        );
        json_response(StatusCode::OK, &body)
    }

    /// 受网关保护；决策由中间件放入 extensions
    pub async fn test_access(
        req: HttpRequest,
        gate: web::Data<Arc<AccessGate>>,
    ) -> impl Responder {
        let existing = req.extensions().get::<AccessDecision>().cloned();
        let decision = match existing {
            Some(decision) => decision,
            None => gate.evaluate(&extract_client_ip(&req)).await,
        };

        if !decision.allowed {
            return json_response(StatusCode::FORBIDDEN, &decision.denied_response());
        }

        json_response(
            StatusCode::OK,
            &TestAccessResponse {
                success: true,
                message: "Access granted! You can access this API.",
                client_ip: decision.client_ip.clone(),
                country_code: decision.country_code,
                timestamp: decision.timestamp_rfc3339(),
                server_time: Utc::now().timestamp(),
            },
        )
    }

    pub async fn simulate_vpn(
        gate: web::Data<Arc<AccessGate>>,
        payload: web::Json<SimulateVpnRequest>,
    ) -> impl Responder {
        let raw = payload.country_code.trim();
        if raw.is_empty() {
            return error_response(&GeoBlockError::validation("Country code is required"));
        }
        let country_code = match CountryCode::parse(raw) {
            Ok(code) => code,
            Err(e) => return error_response(&e),
        };

        let access = simulate(&gate, country_code);
        let status = if access.is_blocked {
            StatusCode::FORBIDDEN
        } else {
            StatusCode::OK
        };

        json_response(
            status,
            &SimulateVpnResponse {
                success: !access.is_blocked,
                message: access.message(),
                country_code: access.country_code,
                country_name: access.country_name.to_string(),
                simulated_ip: access.simulated_ip,
                is_blocked: access.is_blocked,
                timestamp: access.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
                error: access
                    .is_blocked
                    .then(|| "Country is geo-blocked".to_string()),
            },
        )
    }
}
