//! Request log middleware
//!
//! 每个请求一个 span（request_id / method / path / endpoint），结束时一行访问日志。
//! 上游已带合法的 `X-Request-ID` 时沿用，否则生成 UUID；响应总是回写该 ID。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    dev::{ServiceRequest, ServiceResponse},
    http::{
        StatusCode,
        header::{HeaderName, HeaderValue},
    },
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::Instant;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// 超过该耗时的请求用 warn 记录（多半是外部 GeoIP 查询慢）
const SLOW_REQUEST_MS: f64 = 2000.0;
const MAX_REQUEST_ID_LEN: usize = 64;

/// 请求 ID，可从 request extensions 中提取
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    /// 沿用上游 ID（仅字母数字、`-`、`_`），否则新生成
    fn from_inbound(value: Option<&HeaderValue>) -> Self {
        let inbound = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_REQUEST_ID_LEN
                    && id
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
            });

        match inbound {
            Some(id) => RequestId(id.to_string()),
            None => RequestId(Uuid::new_v4().to_string()),
        }
    }
}

/// 日志里的端点分类
fn classify_endpoint(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "/api/test-access" => "gated",
        "/api/block-countries" | "/api/validate-blocking" => "admin",
        "/api/ip-info" | "/api/simulate-vpn" => "geo",
        "/health" => "health",
        _ => "other",
    }
}

fn log_completion(status: StatusCode, elapsed_ms: f64) {
    if status.is_server_error() {
        warn!("Completed {} in {:.2}ms", status.as_u16(), elapsed_ms);
    } else if elapsed_ms > SLOW_REQUEST_MS {
        warn!("Completed {} in {:.2}ms (slow)", status.as_u16(), elapsed_ms);
    } else {
        info!("Completed {} in {:.2}ms", status.as_u16(), elapsed_ms);
    }
}

#[derive(Clone, Default)]
pub struct RequestLog;

impl<S, B> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLogService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLogService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let start = Instant::now();

        let request_id = RequestId::from_inbound(req.headers().get(X_REQUEST_ID));
        let header_value = HeaderValue::from_str(&request_id.0).ok();
        let span = info_span!(
            "request",
            request_id = %request_id.0,
            method = %req.method(),
            path = %req.path(),
            endpoint = classify_endpoint(req.path()),
        );
        req.extensions_mut().insert(request_id);

        Box::pin(
            async move {
                let result = srv.call(req).await;
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

                let mut response = result.inspect_err(|e| {
                    warn!("Request failed after {:.2}ms: {}", elapsed_ms, e);
                })?;
                log_completion(response.status(), elapsed_ms);

                if let Some(value) = header_value {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(X_REQUEST_ID), value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}
