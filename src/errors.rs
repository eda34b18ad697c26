use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum GeoBlockError {
    Validation(String),
    InvalidAddress(String),
    Provider(String),
    Timeout(String),
    ResolutionExhausted(String),
    Config(String),
    Serialization(String),
    Io(String),
}

impl GeoBlockError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            GeoBlockError::Validation(_) => "E001",
            GeoBlockError::InvalidAddress(_) => "E002",
            GeoBlockError::Provider(_) => "E003",
            GeoBlockError::Timeout(_) => "E004",
            GeoBlockError::ResolutionExhausted(_) => "E005",
            GeoBlockError::Config(_) => "E006",
            GeoBlockError::Serialization(_) => "E007",
            GeoBlockError::Io(_) => "E008",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeoBlockError::Validation(_) => "Validation Error",
            GeoBlockError::InvalidAddress(_) => "Invalid Address",
            GeoBlockError::Provider(_) => "Provider Error",
            GeoBlockError::Timeout(_) => "Provider Timeout",
            GeoBlockError::ResolutionExhausted(_) => "Resolution Exhausted",
            GeoBlockError::Config(_) => "Configuration Error",
            GeoBlockError::Serialization(_) => "Serialization Error",
            GeoBlockError::Io(_) => "IO Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeoBlockError::Validation(msg) => msg,
            GeoBlockError::InvalidAddress(msg) => msg,
            GeoBlockError::Provider(msg) => msg,
            GeoBlockError::Timeout(msg) => msg,
            GeoBlockError::ResolutionExhausted(msg) => msg,
            GeoBlockError::Config(msg) => msg,
            GeoBlockError::Serialization(msg) => msg,
            GeoBlockError::Io(msg) => msg,
        }
    }

    /// HTTP status used when the error reaches a client.
    ///
    /// Resolution errors never reach a client through the gate (they become an
    /// unknown country), but the mapping stays total.
    pub fn http_status(&self) -> StatusCode {
        match self {
            GeoBlockError::Validation(_) | GeoBlockError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            GeoBlockError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
            GeoBlockError::Provider(_)
            | GeoBlockError::Timeout(_)
            | GeoBlockError::ResolutionExhausted(_) => StatusCode::BAD_GATEWAY,
            GeoBlockError::Config(_) | GeoBlockError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 临时性的 provider 故障（不可用 / 超时），其余错误按异常处理
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GeoBlockError::Provider(_) | GeoBlockError::Timeout(_)
        )
    }

    /// 格式化为彩色输出（用于启动错误）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeoBlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeoBlockError {}

// 便捷的构造函数
impl GeoBlockError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Validation(msg.into())
    }

    pub fn invalid_address<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::InvalidAddress(msg.into())
    }

    pub fn provider<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Provider(msg.into())
    }

    pub fn timeout<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Timeout(msg.into())
    }

    pub fn resolution_exhausted<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::ResolutionExhausted(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Config(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Serialization(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        GeoBlockError::Io(msg.into())
    }
}

impl From<std::io::Error> for GeoBlockError {
    fn from(err: std::io::Error) -> Self {
        GeoBlockError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for GeoBlockError {
    fn from(err: serde_json::Error) -> Self {
        GeoBlockError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for GeoBlockError {
    fn from(err: config::ConfigError) -> Self {
        GeoBlockError::Config(err.to_string())
    }
}

impl From<tokio::task::JoinError> for GeoBlockError {
    fn from(err: tokio::task::JoinError) -> Self {
        GeoBlockError::Provider(format!("lookup task failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, GeoBlockError>;
