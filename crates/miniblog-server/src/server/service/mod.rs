//! HTTP surface of the service.
//!
//! ## Structure
//!
//! - [`handler`] - `UserService` and the axum handlers built on it.
//! - [`middleware`] - request accounting, authentication and authorization.
//!
//! [`router`] assembles both into the application [`Router`].

pub mod handler;
pub mod middleware;

use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{CACHE_CONTROL, EXPIRES, LAST_MODIFIED, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use handler::UserService;
use miniblog_core::{Authorizer, Error, TokenValidator};
use std::{any::Any, sync::Arc};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

const X_XSS_PROTECTION: HeaderName = HeaderName::from_static("x-xss-protection");

/// Everything a request handler or middleware may need.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub validator: Arc<dyn TokenValidator>,
    pub authorizer: Arc<dyn Authorizer>,
}

/// Routes reachable without a bearer token.
pub fn is_public(method: &Method, path: &str) -> bool {
    path == "/healthz" || (method == Method::POST && path == "/v1/users")
}

/// Turns a panic anywhere below into the generic 500 response.
fn panicked(panic: Box<dyn Any + Send + 'static>) -> Response {
    let context = panic
        .downcast_ref::<&str>()
        .map(|msg| (*msg).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    tracing::error!(%context, "request handler panicked");
    Error::Store { context }.into_response()
}

/// HTTP date of the moment the response leaves the service.
fn last_modified(_: &Response) -> Option<HeaderValue> {
    let now = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    HeaderValue::from_str(&now.to_string()).ok()
}

/// Builds the application router.
///
/// Layers run outside-in: request id, tracing, response headers, CORS, panic
/// recovery, accounting, then authentication and authorization for everything
/// but the public routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handler::healthz))
        .route(
            "/v1/users",
            post(handler::create_user).get(handler::list_users),
        )
        .route(
            "/v1/users/{name}",
            get(handler::get_user)
                .put(handler::update_user)
                .delete(handler::delete_user),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authorize,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate,
        ))
        .layer(axum::middleware::from_fn(middleware::track))
        .layer(CatchPanicLayer::custom(panicked))
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin),
        )
        // Never cache.
        .layer(SetResponseHeaderLayer::if_not_present(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, max-age=0, must-revalidate"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            EXPIRES,
            HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            LAST_MODIFIED,
            last_modified,
        ))
        // Browser hardening.
        .layer(SetResponseHeaderLayer::if_not_present(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
