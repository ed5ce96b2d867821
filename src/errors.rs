use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Failure modes of the QR token codec.
///
/// `SignatureMismatch` and `Expired` are distinct here so the reason can be
/// logged, but callers outside the codec must treat them as one generic
/// rejection (see [`TokenError::is_rejection`]).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed QR payload: {0}")]
    Parse(String),

    #[error("signature mismatch")]
    SignatureMismatch,

    #[error("token expired")]
    Expired,

    #[error("invalid product id: {0}")]
    InvalidProductId(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TokenError {
    /// True for outcomes that must be reported as a generic "invalid" to callers.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TokenError::SignatureMismatch | TokenError::Expired)
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid or expired QR code")]
    InvalidToken,

    #[error("malformed QR payload: {0}")]
    MalformedToken(String),

    #[error("invalid product id: {0}")]
    InvalidProductId(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("signing key not configured")]
    NotConfigured,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            // Collapse both verification failures so callers cannot tell them apart.
            TokenError::SignatureMismatch | TokenError::Expired => AppError::InvalidToken,
            TokenError::Parse(msg) => AppError::MalformedToken(msg),
            TokenError::InvalidProductId(msg) => AppError::InvalidProductId(msg),
            TokenError::Configuration(msg) => {
                tracing::error!("QR codec misconfigured: {}", msg);
                AppError::NotConfigured
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, code, msg) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "verification_error",
                "invalid_token",
                "invalid or expired QR code".to_string(),
            ),
            AppError::MalformedToken(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "malformed_token",
                format!("failed to parse QR code: {}", e),
            ),
            AppError::InvalidProductId(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "invalid_product_id",
                e.clone(),
            ),
            AppError::BadRequest(e) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                e.clone(),
            ),
            AppError::ProductNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found_error",
                "product_not_found",
                format!("product '{}' not found in system", id),
            ),
            AppError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "configuration_error",
                "signing_key_missing",
                "QR signing is not configured".to_string(),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
