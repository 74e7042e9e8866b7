//! Rate limiting middleware.
//!
//! Counts requests per bucket and forwarded client address using the
//! limiter in [`AppState`]. Preflight requests are never counted.

use actix_web::{
    Error, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::Method,
    http::header::{HeaderName, HeaderValue},
    web,
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use counsel_core::ports::{RateLimitDecision, RateLimitKey};

use crate::middleware::error::AppError;
use crate::state::AppState;

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    bucket: &'static str,
}

impl RateLimitMiddleware {
    pub fn new(bucket: &'static str) -> Self {
        Self { bucket }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            bucket: self.bucket,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    bucket: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        let state = req.app_data::<web::Data<AppState>>().cloned();
        let Some(state) = state.filter(|_| *req.method() != Method::OPTIONS) else {
            return Box::pin(async move {
                let res = service.call(req).await?;
                Ok(res.map_into_left_body())
            });
        };

        let forwarded_for = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok());
        let key = RateLimitKey::from_forwarded_for(self.bucket, forwarded_for);

        Box::pin(async move {
            let remaining = match state
                .rate_limiter
                .check(&key, &state.rate_limit_policy)
                .await
            {
                Ok(RateLimitDecision::Denied { retry_after_secs }) => {
                    tracing::warn!(key = %key, retry_after_secs, "Rate limit exceeded");
                    let response = AppError::RateLimited { retry_after_secs }.error_response();
                    return Ok(req.into_response(response).map_into_right_body());
                }
                Ok(RateLimitDecision::Allowed { remaining }) => Some(remaining),
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Rate limiter error, failing open");
                    None
                }
            };

            let mut res = service.call(req).await?;
            if let Some(remaining) = remaining {
                res.headers_mut().insert(
                    HeaderName::from_static("x-ratelimit-remaining"),
                    HeaderValue::from(remaining),
                );
            }
            Ok(res.map_into_left_body())
        })
    }
}
