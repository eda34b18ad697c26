pub mod admin;
pub mod geo;
pub mod health;
pub mod helpers;
pub mod types;

use actix_web::web;
use std::sync::Arc;

use crate::api::middleware::GeoGate;
use crate::services::{AccessGate, BlockListStore, GeoResolver};

pub use admin::AdminService;
pub use geo::GeoService;
pub use health::{AppStartTime, HealthService};
pub use helpers::{error_response, json_error_handler, json_response, method_not_allowed};

/// 路由依赖的共享组件，全部以 `web::Data<Arc<T>>` 注入
#[derive(Clone)]
pub struct AppServices {
    pub resolver: Arc<GeoResolver>,
    pub block_list: Arc<BlockListStore>,
    pub gate: Arc<AccessGate>,
    pub start_time: AppStartTime,
}

/// `/api` 路由
///
/// 每个资源的 default service 处理 405 / 裸 OPTIONS。
pub fn api_routes(gate: Arc<AccessGate>) -> actix_web::Scope {
    web::scope("/api")
        .service(
            web::resource("/ip-info")
                .route(web::get().to(GeoService::ip_info))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/test-access")
                .route(web::get().to(GeoService::test_access))
                .default_service(web::to(method_not_allowed))
                .wrap(GeoGate::new(gate)),
        )
        .service(
            web::resource("/simulate-vpn")
                .route(web::post().to(GeoService::simulate_vpn))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/block-countries")
                .route(web::post().to(AdminService::block_countries))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/validate-blocking")
                .route(web::post().to(AdminService::validate_blocking))
                .default_service(web::to(method_not_allowed)),
        )
}

pub fn health_routes() -> actix_web::Resource {
    web::resource("/health")
        .route(web::get().to(HealthService::health_check))
        .route(web::head().to(HealthService::health_check))
        .default_service(web::to(method_not_allowed))
}

/// 注册共享组件和全部路由；服务器和测试共用
pub fn configure(cfg: &mut web::ServiceConfig, services: &AppServices) {
    cfg.app_data(web::Data::new(services.resolver.clone()))
        .app_data(web::Data::new(services.block_list.clone()))
        .app_data(web::Data::new(services.gate.clone()))
        .app_data(web::Data::new(services.start_time.clone()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health_routes())
        .service(api_routes(services.gate.clone()));
}
