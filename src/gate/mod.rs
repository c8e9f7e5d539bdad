//! Request gate: the single entry point applied to every inbound request.
//!
//! Non-API paths pass untouched. Every `/api` path is rate-limited by
//! category and client identity; paths outside the public allow-list then
//! require a valid session token, whose identity is injected into the
//! request headers consumed downstream. A request either fully passes all
//! applicable checks or is rejected with the canonical status and a
//! fixed-shape `{"error": string}` body.

use crate::auth::{Category, RateLimiter, TokenService};
use crate::error::{AppError, AuthError};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;
use tracing::warn;

/// Paths reachable without a session. Exact matches, not prefixes; rate
/// limiting still applies to all of them.
pub const PUBLIC_PATHS: [&str; 4] = ["/api/login", "/api/register", "/api/contact", "/api/discount"];

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

struct GateInner {
    tokens: TokenService,
    limiter: Arc<RateLimiter>,
}

/// Middleware factory. Owns the rate-limit registry and the token service;
/// tests construct isolated instances with their own limiter and clock.
#[derive(Clone)]
pub struct RequestGate {
    inner: Arc<GateInner>,
}

impl RequestGate {
    pub fn new(tokens: TokenService, limiter: Arc<RateLimiter>) -> Self {
        Self {
            inner: Arc::new(GateInner { tokens, limiter }),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = GateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GateMiddleware {
            service,
            inner: self.inner.clone(),
        }))
    }
}

pub struct GateMiddleware<S> {
    service: S,
    inner: Arc<GateInner>,
}

impl<S, B> Service<ServiceRequest> for GateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();

        // Only the API surface is governed; health and friends pass through.
        if !path.starts_with("/api") {
            return self.forward(req);
        }

        let identity = client_identity(&req);
        let category = Category::resolve(req.method(), &path);

        if self.inner.limiter.check(category, &identity).is_err() {
            warn!(
                category = category.name(),
                client = %redact_identity(&identity),
                path = %path,
                "rate limit exceeded"
            );
            return reject(req, AuthError::RateLimited);
        }

        if PUBLIC_PATHS.contains(&path.as_str()) {
            return self.forward(req);
        }

        let verified = TokenService::extract_from_request(req.request())
            .ok_or(AuthError::AuthRequired)
            .and_then(|token| self.inner.tokens.verify(&token));

        let claims = match verified {
            Ok(claims) => claims,
            Err(e) => {
                // Audit record for the rejection. Emitting it can neither
                // block nor fail the response.
                warn!(
                    target: "audit",
                    path = %path,
                    method = %req.method(),
                    client = %redact_identity(&identity),
                    reason = %e,
                    "authentication rejected"
                );
                return reject(req, e);
            }
        };

        let id_value = HeaderValue::from_str(&claims.sub.to_string());
        let email_value = HeaderValue::from_str(&claims.email);
        match (id_value, email_value) {
            (Ok(id), Ok(email)) => {
                let headers = req.headers_mut();
                headers.insert(HeaderName::from_static(USER_ID_HEADER), id);
                headers.insert(HeaderName::from_static(USER_EMAIL_HEADER), email);
            }
            // A claim that cannot travel as a header never reaches handlers.
            _ => return reject(req, AuthError::InvalidToken),
        }

        self.forward(req)
    }
}

impl<S, B> GateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    fn forward(
        &self,
        req: ServiceRequest,
    ) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}

fn reject<B: 'static>(
    req: ServiceRequest,
    err: AuthError,
) -> LocalBoxFuture<'static, Result<ServiceResponse<EitherBody<B>>, Error>> {
    let response = AppError::from(err).error_response();
    Box::pin(ready(Ok(req.into_response(response).map_into_right_body())))
}

/// Rate-limit identity: first forwarded-for hop, then x-real-ip, then the
/// raw connection address. Untrusted unless the service sits behind a
/// trusted proxy.
fn client_identity(req: &ServiceRequest) -> String {
    for name in ["x-forwarded-for", "x-real-ip"] {
        if let Some(value) = req.headers().get(name).and_then(|v| v.to_str().ok()) {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Masks the final address segment before the identity reaches logs.
fn redact_identity(identity: &str) -> String {
    if let Some(i) = identity.rfind('.') {
        format!("{}.x", &identity[..i])
    } else if let Some(i) = identity.rfind(':') {
        format!("{}:x", &identity[..i])
    } else {
        identity.chars().take(8).collect()
    }
}
