//! API 帮助函数

use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::{Method, StatusCode};
use actix_web::{HttpRequest, HttpResponse};
use serde::Serialize;
use tracing::debug;

use crate::errors::GeoBlockError;

use super::types::ErrorBody;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// 从 GeoBlockError 构建错误响应（自动映射 HTTP 状态码）
pub fn error_response(err: &GeoBlockError) -> HttpResponse {
    json_response(
        err.http_status(),
        &ErrorBody {
            success: false,
            error: err.error_type().to_string(),
            code: err.code(),
            message: err.message().to_string(),
        },
    )
}

/// JSON body 解析失败统一返回 400
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejecting body for {} {}: {}", req.method(), req.path(), err);
    let response = error_response(&GeoBlockError::serialization(format!(
        "Invalid JSON request: {}",
        err
    )));
    InternalError::from_response(err, response).into()
}

/// 资源的默认 handler：裸 OPTIONS 返回 200，其它方法 405
pub async fn method_not_allowed(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return HttpResponse::Ok().finish();
    }

    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorBody {
            success: false,
            error: "Method Not Allowed".to_string(),
            code: "E405",
            message: format!("{} is not supported on {}", req.method(), req.path()),
        },
    )
}
