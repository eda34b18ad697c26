//! Geo-blocking middleware
//!
//! 包在受保护的资源外层：
//! - 拒绝：直接返回 403 + JSON，内层 handler 不会执行
//! - 放行：把 [`AccessDecision`] 放进 request extensions，响应附带
//!   `X-Client-Country` / `X-Client-IP`

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::{
        Method,
        header::{CONTENT_TYPE, HeaderName, HeaderValue},
    },
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::trace;

use crate::services::{AccessDecision, AccessGate};
use crate::utils::extract_client_ip;

pub const X_CLIENT_COUNTRY: &str = "x-client-country";
pub const X_CLIENT_IP: &str = "x-client-ip";

#[derive(Clone)]
pub struct GeoGate {
    gate: Arc<AccessGate>,
}

impl GeoGate {
    pub fn new(gate: Arc<AccessGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GeoGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = GeoGateMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GeoGateMiddleware {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct GeoGateMiddleware<S> {
    service: Rc<S>,
    gate: Arc<AccessGate>,
}

impl<S, B> GeoGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_denied(
        req: ServiceRequest,
        decision: &AccessDecision,
    ) -> ServiceResponse<EitherBody<B>> {
        req.into_response(
            HttpResponse::Forbidden()
                .insert_header((CONTENT_TYPE, "application/json; charset=utf-8"))
                .json(decision.denied_response())
                .map_into_right_body(),
        )
    }

    fn decorate(response: &mut ServiceResponse<EitherBody<B>>, decision: &AccessDecision) {
        let headers = response.headers_mut();
        if let Ok(value) = HeaderValue::from_str(decision.country_code.as_str()) {
            headers.insert(HeaderName::from_static(X_CLIENT_COUNTRY), value);
        }
        if let Ok(value) = HeaderValue::from_str(&decision.client_ip) {
            headers.insert(HeaderName::from_static(X_CLIENT_IP), value);
        }
    }
}

impl<S, B> Service<ServiceRequest> for GeoGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
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
        let gate = self.gate.clone();

        Box::pin(async move {
            // OPTIONS 交给资源的默认 handler，不做解析
            if req.method() == Method::OPTIONS {
                trace!("Skipping geo gate for OPTIONS {}", req.path());
                return srv.call(req).await.map(|res| res.map_into_left_body());
            }

            let client_ip = extract_client_ip(req.request());
            let decision = gate.evaluate(&client_ip).await;

            if !decision.allowed {
                return Ok(Self::handle_denied(req, &decision));
            }

            req.extensions_mut().insert(decision.clone());
            let mut response = srv.call(req).await?.map_into_left_body();
            Self::decorate(&mut response, &decision);
            Ok(response)
        })
    }
}
