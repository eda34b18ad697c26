//! HTTP 请求/响应类型

use serde::{Deserialize, Serialize};

use crate::services::CountryCode;

/// 统一错误响应
#[derive(Serialize, Debug, Clone)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct IpInfoResponse {
    pub ip: String,
    pub country_code: CountryCode,
    pub country_name: String,
    pub city: String,
    pub region: String,
    pub isp: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct TestAccessResponse {
    pub success: bool,
    pub message: &'static str,
    pub client_ip: String,
    pub country_code: CountryCode,
    pub timestamp: String,
    pub server_time: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SimulateVpnRequest {
    pub country_code: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct SimulateVpnResponse {
    pub success: bool,
    pub message: String,
    pub country_code: CountryCode,
    pub country_name: String,
    pub simulated_ip: String,
    pub is_blocked: bool,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct BlockCountriesRequest {
    pub countries: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct BlockCountriesResponse {
    pub message: String,
    pub blocked_countries: Vec<CountryCode>,
    pub success: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ValidateBlockingRequest {
    /// 省略时使用当前生效的列表（只读）
    #[serde(default)]
    pub blocked_countries: Option<Vec<String>>,
    pub test_countries: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub country: CountryCode,
    pub blocked: bool,
    pub status: &'static str,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub blocked_count: usize,
    pub allowed_count: usize,
    pub total_tests: usize,
}

#[derive(Serialize, Debug, Clone)]
pub struct ValidateBlockingResponse {
    pub test_results: Vec<TestResult>,
    pub summary: ValidationSummary,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// 运行秒数
    pub uptime: u64,
    pub blocked_countries: usize,
}
