use super::{AppState, is_public};
use crate::server::telemetry::{increment_auth_failures, increment_requests, record_request_duration};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use miniblog_core::{Error, Result};
use std::time::Instant;

/// The authenticated caller, inserted as a request extension by
/// [`authenticate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

/// Counts requests and records their duration.
pub async fn track(request: Request, next: Next) -> Response {
    increment_requests();
    let start = Instant::now();
    let response = next.run(request).await;
    record_request_duration(start.elapsed().as_secs_f64() * 1000.0);
    response
}

/// Resolves the bearer token into a [`Subject`].
pub async fn authenticate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    if is_public(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let subject = match token.map(|token| state.validator.validate(token)) {
        Some(Ok(subject)) => subject,
        Some(Err(err)) => {
            increment_auth_failures("authn");
            return Err(err);
        }
        None => {
            increment_auth_failures("authn");
            tracing::debug!("request without bearer token");
            return Err(Error::TokenInvalid);
        }
    };

    request.extensions_mut().insert(Subject(subject));
    Ok(next.run(request).await)
}

/// Checks the [`Subject`] against the request path and method.
pub async fn authorize(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    if is_public(request.method(), request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let Some(Subject(subject)) = request.extensions().get::<Subject>() else {
        return Err(Error::TokenInvalid);
    };
    let object = request.uri().path();
    let action = request.method().as_str();

    tracing::debug!(%subject, %object, %action, "authorizing request");
    if !state.authorizer.authorize(subject, object, action) {
        increment_auth_failures("authz");
        return Err(Error::Unauthorized);
    }

    Ok(next.run(request).await)
}
