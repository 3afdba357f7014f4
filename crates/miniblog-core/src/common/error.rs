//! Error types for the user service.
//!
//! This module defines the central `Error` enum shared by the store, the
//! authentication layer and the HTTP handlers. It implements
//! [`IntoResponse`] so handlers can return it directly: every variant maps to
//! an HTTP status and a stable, machine-readable error code.
//!
//! The enum is `Clone` because a single failed lookup may be fanned out to
//! every caller that was coalesced onto it.
//!
//! ## Error Cases
//! - `UserNotFound`: the requested user does not exist.
//! - `UserAlreadyExists`: a create collided with an existing username.
//! - `InvalidRequest`: the request was malformed or failed validation.
//! - `TokenInvalid`: the bearer token was missing, malformed or expired.
//! - `Unauthorized`: the authenticated subject may not perform the request.
//! - `Store`: the storage backend failed.
//! - `ServiceShutdown`: a request arrived while the service was shutting down.

use crate::ErrorResponse;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the user service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No user with the requested username exists.
    #[error("User was not found")]
    UserNotFound,

    /// A user with the same username already exists.
    #[error("User already exists")]
    UserAlreadyExists,

    /// The client request was invalid.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Authentication failed.
    #[error("Token was invalid")]
    TokenInvalid,

    /// The subject is authenticated but not allowed to act on the resource.
    #[error("Unauthorized")]
    Unauthorized,

    /// The storage backend failed.
    #[error("Store error: {context}")]
    Store { context: String },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// HTTP status returned for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::UserAlreadyExists => StatusCode::CONFLICT,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable error code carried in the response body.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UserNotFound => "ResourceNotFound.UserNotFound",
            Self::UserAlreadyExists => "FailedOperation.UserAlreadyExist",
            Self::InvalidRequest { .. } => "InvalidParameter",
            Self::TokenInvalid => "AuthFailure.TokenInvalid",
            Self::Unauthorized => "AuthFailure.Unauthorized",
            Self::Store { .. } => "InternalError",
            Self::ServiceShutdown => "Unavailable",
        }
    }
}

impl From<Error> for ErrorResponse {
    fn from(err: Error) -> Self {
        let message = match &err {
            // Backend details stay in the logs.
            Error::Store { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        Self {
            code: err.code().to_string(),
            message,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorResponse::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: Error) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn not_found_maps_to_404() {
        let (status, body) = body_of(Error::UserNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.code, "ResourceNotFound.UserNotFound");
        assert_eq!(body.message, "User was not found");
    }

    #[tokio::test]
    async fn invalid_request_keeps_its_reason() {
        let (status, body) = body_of(Error::invalid("limit must be positive")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "InvalidParameter");
        assert!(body.message.contains("limit must be positive"));
    }

    #[tokio::test]
    async fn store_failures_do_not_leak_context() {
        let (status, body) = body_of(Error::Store {
            context: "connection refused to 10.0.0.7".into(),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code, "InternalError");
        assert!(!body.message.contains("10.0.0.7"));
    }

    #[test]
    fn every_variant_has_a_distinct_code() {
        let all = [
            Error::UserNotFound,
            Error::UserAlreadyExists,
            Error::invalid("x"),
            Error::TokenInvalid,
            Error::Unauthorized,
            Error::Store { context: "x".into() },
            Error::ServiceShutdown,
        ];
        let mut codes: Vec<_> = all.iter().map(Error::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
        assert_eq!(Error::ServiceShutdown.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(Error::TokenInvalid.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Unauthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(Error::UserAlreadyExists.status(), StatusCode::CONFLICT);
    }
}
