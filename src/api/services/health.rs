use actix_web::http::StatusCode;
use actix_web::{Responder, web};
use std::sync::Arc;
use tracing::trace;

use crate::services::BlockListStore;

use super::helpers::json_response;
use super::types::HealthResponse;

// 应用启动时间
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

pub struct HealthService;

impl HealthService {
    /// 不经过网关，也不访问外部 provider
    pub async fn health_check(
        store: web::Data<Arc<BlockListStore>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let now = chrono::Utc::now();
        let uptime = (now - app_start_time.start_datetime).num_seconds().max(0) as u64;

        json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "healthy",
                timestamp: now.to_rfc3339(),
                uptime,
                blocked_countries: store.len(),
            },
        )
    }
}
