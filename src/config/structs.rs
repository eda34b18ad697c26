use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::errors::{GeoBlockError, Result};

/// 国家无法确定时的处理策略
///
/// `Allow` (fail-open) 是默认值：默认 block list 为空，放行可以避免误封。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum UnknownCountryPolicy {
    #[default]
    Allow,
    Deny,
}

impl std::fmt::Display for UnknownCountryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 静态配置（从 TOML + 环境变量加载，启动时使用）
///
/// - server: 监听地址、端口、worker 数量
/// - logging: 日志配置
/// - geo: GeoIP 解析链、超时、缓存、未知国家策略
/// - cors: 跨域配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：GEOBLOCK，分隔符：__
    /// 示例：GEOBLOCK__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                if std::path::Path::new(path).exists() {
                    eprintln!("[INFO] Configuration loaded from: {}", path);
                }
                config
            }
            Err(e) => {
                eprintln!("{}", e.format_colored());
                Self::default()
            }
        }
    }

    /// Strict variant of [`StaticConfig::load`]: surfaces parse errors instead of
    /// falling back to defaults.
    pub fn try_load(path: &str) -> Result<Self> {
        use config::{Config, Environment, File};

        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("GEOBLOCK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: StaticConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.geo.provider_timeout_ms == 0 || self.geo.echo_timeout_ms == 0 {
            return Err(GeoBlockError::config(
                "geo timeouts must be greater than zero",
            ));
        }
        if let Some(bad) = self
            .geo
            .country_lookup_urls
            .iter()
            .find(|url| !url.contains("{ip}"))
        {
            return Err(GeoBlockError::config(format!(
                "country lookup url '{}' is missing the {{ip}} placeholder",
                bad
            )));
        }
        Ok(())
    }

    /// 写入 TOML 文件
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GeoBlockError::serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// GeoIP 解析配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    #[serde(default)]
    pub unknown_country_policy: UnknownCountryPolicy,

    /// 单个 provider 调用的上限（毫秒）
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,

    /// "what is my IP" 类服务的超时（毫秒）
    #[serde(default = "default_echo_timeout_ms")]
    pub echo_timeout_ms: u64,

    /// 解析结果缓存 TTL，0 表示关闭缓存
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,

    /// MaxMindDB 文件路径 (GeoLite2-City.mmdb)
    /// 配置且可读时，放在国家查询链的最前面
    #[serde(default)]
    pub maxminddb_path: Option<String>,

    /// 同时返回本机公网 IP 和国家的服务
    #[serde(default = "default_self_lookup_url")]
    pub self_lookup_url: String,

    /// 只返回本机公网 IP（纯文本）的服务，按顺序尝试
    #[serde(default = "default_echo_urls")]
    pub echo_urls: Vec<String>,

    /// 国家查询服务，使用 {ip} 作为占位符
    #[serde(default = "default_country_lookup_urls")]
    pub country_lookup_urls: Vec<String>,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,
    #[serde(default = "default_cors_max_age")]
    pub max_age: usize,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_provider_timeout_ms() -> u64 {
    5000
}

fn default_echo_timeout_ms() -> u64 {
    3000
}

fn default_cache_ttl_secs() -> u64 {
    15 * 60
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_self_lookup_url() -> String {
    "https://ipinfo.io/json".to_string()
}

fn default_echo_urls() -> Vec<String> {
    vec![
        "https://api.ipify.org?format=text".to_string(),
        "https://checkip.amazonaws.com".to_string(),
        "https://icanhazip.com".to_string(),
    ]
}

fn default_country_lookup_urls() -> Vec<String> {
    vec!["https://ipinfo.io/{ip}/json".to_string()]
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

fn default_cors_max_age() -> usize {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            unknown_country_policy: UnknownCountryPolicy::default(),
            provider_timeout_ms: default_provider_timeout_ms(),
            echo_timeout_ms: default_echo_timeout_ms(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
            maxminddb_path: None,
            self_lookup_url: default_self_lookup_url(),
            echo_urls: default_echo_urls(),
            country_lookup_urls: default_country_lookup_urls(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            max_age: default_cors_max_age(),
        }
    }
}
