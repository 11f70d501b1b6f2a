//! Request-level error responses
//!
//! Authentication errors end the page load: nothing renders without a token.
//! Resource errors never reach this type from the landing page (they are
//! rendered per resource); only endpoints serving a single resource return
//! them as a whole response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] pkce_auth::Error),

    #[error(transparent)]
    Resource(#[from] paging::Error),

    #[error("unknown session: {0}")]
    SessionNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// HTTP status and stable machine-readable code for the response body.
    fn classify(&self) -> (StatusCode, &'static str) {
        use pkce_auth::Error as Auth;
        use paging::Error as Resource;

        match self {
            AppError::Auth(Auth::MissingAuthorizationCode) => {
                (StatusCode::BAD_REQUEST, "missing_authorization_code")
            }
            AppError::Auth(Auth::AuthorizationDenied { .. }) => {
                (StatusCode::FORBIDDEN, "authorization_denied")
            }
            AppError::Auth(Auth::MissingVerifier) => (StatusCode::BAD_REQUEST, "restart_sign_in"),
            AppError::Auth(Auth::TokenExchange { .. } | Auth::Http(_)) => {
                (StatusCode::BAD_GATEWAY, "token_exchange_failed")
            }
            AppError::Auth(
                Auth::Store(_) | Auth::InvalidVerifierLength(_) | Auth::InvalidConfig(_),
            ) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
            AppError::Resource(Resource::PaginationViolation(_)) => {
                (StatusCode::BAD_GATEWAY, "pagination_protocol_violation")
            }
            AppError::Resource(_) => (StatusCode::BAD_GATEWAY, "resource_fetch_failed"),
            AppError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();
        let message = match &self {
            AppError::Auth(pkce_auth::Error::MissingVerifier) => {
                "Sign-in could not be completed. Please restart sign-in.".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(serde_json::json!({
                "error": code,
                "message": message,
            })),
        )
            .into_response()
    }
}
