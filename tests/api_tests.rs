//! HTTP API tests
//!
//! Full route table with in-test GeoIP providers; no network access.

use actix_web::http::header::{self, ContentType};
use actix_web::http::{Method, StatusCode};
use actix_web::test::{self, TestRequest};
use actix_web::App;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use geoblocker::api::middleware::RequestLog;
use geoblocker::api::services::{AppServices, AppStartTime, configure};
use geoblocker::config::{CorsConfig, UnknownCountryPolicy};
use geoblocker::errors::{GeoBlockError, Result};
use geoblocker::runtime::modes::server::build_cors_middleware;
use geoblocker::services::geoip::{CountryLookup, DiscoveredIp, GeoInfo, PublicIpDiscovery};
use geoblocker::services::{AccessGate, BlockListStore, CountryCode, GeoResolver};

// =============================================================================
// Test Setup
// =============================================================================

/// 按 IP 查表；表中没有的地址视为 provider 失败
struct TableLookup(HashMap<&'static str, &'static str>);

#[async_trait]
impl CountryLookup for TableLookup {
    async fn lookup(&self, ip: &str) -> Result<GeoInfo> {
        let code = self
            .0
            .get(ip)
            .ok_or_else(|| GeoBlockError::provider(format!("{} not in table", ip)))?;
        Ok(GeoInfo {
            country: CountryCode::parse(code)?,
            city: Some("Test City".to_string()),
            region: None,
            isp: Some("Test ISP".to_string()),
        })
    }

    fn name(&self) -> &str {
        "table"
    }
}

/// 固定返回本机公网地址 193.10.5.9 (SE)
struct FixedDiscovery;

#[async_trait]
impl PublicIpDiscovery for FixedDiscovery {
    async fn discover(&self) -> Result<DiscoveredIp> {
        let ip: IpAddr = "193.10.5.9"
            .parse()
            .map_err(|_| GeoBlockError::provider("bad ip"))?;
        Ok(DiscoveredIp {
            ip,
            info: Some(GeoInfo::country_only(CountryCode::parse("SE")?)),
        })
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

fn app_services(policy: UnknownCountryPolicy) -> AppServices {
    let table = HashMap::from([
        ("85.10.1.1", "DE"),
        ("8.8.8.8", "US"),
        ("46.4.96.137", "RU"),
    ]);
    let resolver = Arc::new(
        GeoResolver::builder()
            .with_country_lookup(Arc::new(TableLookup(table)))
            .with_discovery(Arc::new(FixedDiscovery))
            .build(),
    );
    let block_list = Arc::new(BlockListStore::new());
    let gate = Arc::new(AccessGate::new(
        resolver.clone(),
        block_list.clone(),
        policy,
    ));

    AppServices {
        resolver,
        block_list,
        gate,
        start_time: AppStartTime::now(),
    }
}

macro_rules! init_app {
    ($services:expr) => {{
        let services = $services.clone();
        test::init_service(
            App::new()
                .wrap(build_cors_middleware(&CorsConfig::default()))
                .wrap(RequestLog)
                .configure(move |cfg| configure(cfg, &services)),
        )
        .await
    }};
}

fn post_json(uri: &str, body: Value) -> TestRequest {
    TestRequest::post().uri(uri).set_json(body)
}

fn assert_rfc3339(value: &Value) {
    let raw = value.as_str().expect("timestamp should be a string");
    assert!(
        chrono::DateTime::parse_from_rfc3339(raw).is_ok(),
        "not RFC3339: {}",
        raw
    );
}

// =============================================================================
// simulate-vpn
// =============================================================================

#[actix_web::test]
async fn test_simulate_vpn_blocked_country_returns_403() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    let resp = test::call_service(
        &app,
        post_json("/api/block-countries", json!({"countries": ["DE"]})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        post_json("/api/simulate-vpn", json!({"country_code": "DE"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "DE");
    assert_eq!(body["is_blocked"], true);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Access denied: Germany (DE) is blocked");
    assert_eq!(body["error"], "Country is geo-blocked");
    assert_rfc3339(&body["timestamp"]);
}

#[actix_web::test]
async fn test_simulate_vpn_allowed_country_returns_simulated_ip() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("DE").unwrap()]);
    let app = init_app!(services);

    let resp = test::call_service(
        &app,
        post_json("/api/simulate-vpn", json!({"country_code": "us"})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["is_blocked"], false);
    assert_eq!(body["country_code"], "US");
    assert_eq!(body["country_name"], "United States");
    assert!(!body["simulated_ip"].as_str().unwrap().is_empty());
    assert!(body.get("error").is_none());
}

#[actix_web::test]
async fn test_simulate_vpn_rejects_invalid_code() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    for bad in ["", "Germany", "D3"] {
        let resp = test::call_service(
            &app,
            post_json("/api/simulate-vpn", json!({"country_code": bad})).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "input {:?}", bad);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}

// =============================================================================
// block-countries / validate-blocking
// =============================================================================

#[actix_web::test]
async fn test_block_countries_normalizes_list() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    let resp = test::call_service(
        &app,
        post_json("/api/block-countries", json!({"countries": ["ru", "CN", " ru "]})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["blocked_countries"], json!(["CN", "RU"]));
    assert_eq!(body["message"], "Successfully blocked 2 countries");
    assert_eq!(services.block_list.len(), 2);
}

#[actix_web::test]
async fn test_block_countries_replaces_previous_list() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    for countries in [json!(["RU", "CN"]), json!(["DE"])] {
        let resp = test::call_service(
            &app,
            post_json("/api/block-countries", json!({ "countries": countries })).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let snapshot = services.block_list.snapshot();
    let codes: Vec<&str> = snapshot.iter().map(CountryCode::as_str).collect();
    assert_eq!(codes, vec!["DE"]);
}

#[actix_web::test]
async fn test_block_then_validate_uses_live_list() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    test::call_service(
        &app,
        post_json("/api/block-countries", json!({"countries": ["RU", "CN"]})).to_request(),
    )
    .await;

    let resp = test::call_service(
        &app,
        post_json("/api/validate-blocking", json!({"test_countries": ["RU", "US"]})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["summary"]["blocked_count"], 1);
    assert_eq!(body["summary"]["allowed_count"], 1);
    assert_eq!(body["summary"]["total_tests"], 2);
    assert_eq!(body["test_results"][0]["country"], "RU");
    assert_eq!(body["test_results"][0]["status"], "Access denied (geo-blocked)");
    assert_eq!(body["test_results"][1]["status"], "Access granted");
}

#[actix_web::test]
async fn test_validate_with_hypothetical_list_does_not_mutate() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("FR").unwrap()]);
    let app = init_app!(services);

    let resp = test::call_service(
        &app,
        post_json(
            "/api/validate-blocking",
            json!({"blocked_countries": ["RU", "CN"], "test_countries": ["RU", "US", "FR"]}),
        ).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["summary"]["blocked_count"], 1);
    assert_eq!(body["summary"]["allowed_count"], 2);

    let snapshot = services.block_list.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains(&CountryCode::parse("FR").unwrap()));
}

#[actix_web::test]
async fn test_malformed_body_returns_400_without_mutation() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("DE").unwrap()]);
    let app = init_app!(services);

    let req = TestRequest::post()
        .uri("/api/block-countries")
        .insert_header(ContentType::json())
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "E007");

    // 缺少必填字段
    let resp = test::call_service(
        &app,
        post_json("/api/block-countries", json!({"codes": ["RU"]})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // 非法国家代码
    let resp = test::call_service(
        &app,
        post_json("/api/block-countries", json!({"countries": ["RU", "Russia"]})).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], "E001");

    let snapshot = services.block_list.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains(&CountryCode::parse("DE").unwrap()));
}

// =============================================================================
// test-access (gated)
// =============================================================================

#[actix_web::test]
async fn test_access_blocked_country_returns_403() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("DE").unwrap()]);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/test-access")
        .insert_header(("X-Forwarded-For", "85.10.1.1, 10.0.0.1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(resp.headers().get("x-client-country").is_none());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Country Blocked");
    assert_eq!(body["country_code"], "DE");
    assert_eq!(body["client_ip"], "85.10.1.1");
    assert_eq!(body["detected_via"], "direct");
    assert_eq!(body["reason"], "Geo-blocking policy in effect");
    assert!(body.get("actual_ip").is_none());
    assert_rfc3339(&body["blocked_at"]);
}

#[actix_web::test]
async fn test_access_allowed_country_returns_200_with_metadata() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("DE").unwrap()]);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/test-access")
        .peer_addr("8.8.8.8:40000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("x-client-country").unwrap(), "US");
    assert_eq!(resp.headers().get("x-client-ip").unwrap(), "8.8.8.8");
    assert!(resp.headers().contains_key("x-request-id"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Access granted! You can access this API.");
    assert_eq!(body["client_ip"], "8.8.8.8");
    assert_eq!(body["country_code"], "US");
    assert!(body["server_time"].as_i64().unwrap() > 0);
    assert_rfc3339(&body["timestamp"]);
}

#[actix_web::test]
async fn test_access_private_client_reports_discovered_ip() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("SE").unwrap()]);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/test-access")
        .peer_addr("127.0.0.1:50000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "SE");
    assert_eq!(body["client_ip"], "127.0.0.1");
    assert_eq!(body["actual_ip"], "193.10.5.9");
    assert_eq!(body["detected_via"], "public_ip_discovery");
}

#[actix_web::test]
async fn test_access_unknown_country_fails_open_by_default() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("US").unwrap()]);
    let app = init_app!(services);

    // 93.184.216.34 不在查询表中 → 国家未知
    let req = TestRequest::get()
        .uri("/api/test-access")
        .insert_header(("X-Real-IP", "93.184.216.34"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["country_code"], "UNKNOWN");
}

#[actix_web::test]
async fn test_access_unknown_country_denied_when_fail_closed() {
    let services = app_services(UnknownCountryPolicy::Deny);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/test-access")
        .insert_header(("CF-Connecting-IP", "93.184.216.34"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Country Unknown");
    assert_eq!(body["reason"], "Unknown-country policy in effect");
}

// =============================================================================
// ip-info / health
// =============================================================================

#[actix_web::test]
async fn test_ip_info_is_never_blocked() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services
        .block_list
        .set_blocked([CountryCode::parse("DE").unwrap()]);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/ip-info")
        .insert_header(("X-Forwarded-For", "85.10.1.1"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ip"], "85.10.1.1");
    assert_eq!(body["country_code"], "DE");
    assert_eq!(body["country_name"], "Germany");
    assert_eq!(body["city"], "Test City");
    assert_eq!(body["region"], "Unknown");
    assert_eq!(body["isp"], "Test ISP");
}

#[actix_web::test]
async fn test_ip_info_private_client_uses_public_ip() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    let req = TestRequest::get()
        .uri("/api/ip-info")
        .peer_addr("192.168.1.20:8000".parse().unwrap())
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;

    assert_eq!(body["ip"], "193.10.5.9");
    assert_eq!(body["country_code"], "SE");
    assert_eq!(body["country_name"], "Sweden");
}

#[actix_web::test]
async fn test_health_reports_block_list_size() {
    let services = app_services(UnknownCountryPolicy::Allow);
    services.block_list.set_blocked([
        CountryCode::parse("RU").unwrap(),
        CountryCode::parse("CN").unwrap(),
    ]);
    let app = init_app!(services);

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["blocked_countries"], 2);
    assert_rfc3339(&body["timestamp"]);
}

// =============================================================================
// Methods / CORS
// =============================================================================

#[actix_web::test]
async fn test_unsupported_method_returns_405() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    for (method, uri) in [
        (Method::GET, "/api/block-countries"),
        (Method::GET, "/api/simulate-vpn"),
        (Method::DELETE, "/api/validate-blocking"),
        (Method::POST, "/api/ip-info"),
    ] {
        let req = TestRequest::default()
            .method(method.clone())
            .uri(uri)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(
            resp.status(),
            StatusCode::METHOD_NOT_ALLOWED,
            "{} {}",
            method,
            uri
        );
    }
}

#[actix_web::test]
async fn test_bare_options_returns_200() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    for uri in ["/api/test-access", "/api/block-countries", "/api/ip-info"] {
        let req = TestRequest::default()
            .method(Method::OPTIONS)
            .uri(uri)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "OPTIONS {}", uri);
    }
}

#[actix_web::test]
async fn test_cors_preflight_is_permissive() {
    let services = app_services(UnknownCountryPolicy::Allow);
    let app = init_app!(services);

    let req = TestRequest::default()
        .method(Method::OPTIONS)
        .uri("/api/simulate-vpn")
        .insert_header((header::ORIGIN, "http://localhost:3000"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_METHOD, "POST"))
        .insert_header((header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}
