//! 管理接口：替换封禁列表 / 离线校验

use actix_web::http::StatusCode;
use actix_web::{Responder, web};
use std::sync::Arc;
use tracing::info;

use crate::errors::Result;
use crate::services::geoip::parse_country_list;
use crate::services::{BlockListStore, CountryCode, CountrySet};

use super::helpers::{error_response, json_response};
use super::types::{
    BlockCountriesRequest, BlockCountriesResponse, TestResult, ValidateBlockingRequest,
    ValidateBlockingResponse, ValidationSummary,
};

pub const STATUS_GRANTED: &str = "Access granted";
pub const STATUS_DENIED: &str = "Access denied (geo-blocked)";

/// 按假设的封禁列表逐个判定，保持 `tests` 的原始顺序
pub fn validate_against(blocked: &CountrySet, tests: &[CountryCode]) -> ValidateBlockingResponse {
    let mut summary = ValidationSummary {
        total_tests: tests.len(),
        ..Default::default()
    };

    let test_results = tests
        .iter()
        .map(|country| {
            let is_blocked = blocked.contains(country);
            if is_blocked {
                summary.blocked_count += 1;
            } else {
                summary.allowed_count += 1;
            }
            TestResult {
                country: *country,
                blocked: is_blocked,
                status: if is_blocked {
                    STATUS_DENIED
                } else {
                    STATUS_GRANTED
                },
            }
        })
        .collect();

    ValidateBlockingResponse {
        test_results,
        summary,
    }
}

pub struct AdminService;

impl AdminService {
    fn parse_validation(
        payload: &ValidateBlockingRequest,
        store: &BlockListStore,
    ) -> Result<(Arc<CountrySet>, Vec<CountryCode>)> {
        let blocked = match &payload.blocked_countries {
            Some(raw) => Arc::new(parse_country_list(raw)?.into_iter().collect()),
            None => store.snapshot(),
        };
        let tests = payload
            .test_countries
            .iter()
            .map(|raw| CountryCode::parse(raw))
            .collect::<Result<Vec<_>>>()?;
        Ok((blocked, tests))
    }

    pub async fn block_countries(
        store: web::Data<Arc<BlockListStore>>,
        payload: web::Json<BlockCountriesRequest>,
    ) -> impl Responder {
        let countries = match parse_country_list(&payload.countries) {
            Ok(countries) => countries,
            Err(e) => return error_response(&e),
        };

        let applied = store.set_blocked(countries);
        let blocked_countries: Vec<CountryCode> = applied.iter().copied().collect();

        info!(
            "Block list replaced with {} countries: {:?}",
            blocked_countries.len(),
            blocked_countries
                .iter()
                .map(CountryCode::as_str)
                .collect::<Vec<_>>()
        );

        json_response(
            StatusCode::OK,
            &BlockCountriesResponse {
                message: format!("Successfully blocked {} countries", blocked_countries.len()),
                blocked_countries,
                success: true,
            },
        )
    }

    pub async fn validate_blocking(
        store: web::Data<Arc<BlockListStore>>,
        payload: web::Json<ValidateBlockingRequest>,
    ) -> impl Responder {
        let (blocked, tests) = match Self::parse_validation(&payload, &store) {
            Ok(parsed) => parsed,
            Err(e) => return error_response(&e),
        };

        let response = validate_against(&blocked, &tests);
        info!(
            "Validation complete: {} blocked, {} allowed",
            response.summary.blocked_count, response.summary.allowed_count
        );
        json_response(StatusCode::OK, &response)
    }
}
