use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::product::Product;
use crate::models::token::validate_product_id;
use crate::render;

use super::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub product_id: String,
}

#[derive(Deserialize, Default)]
pub struct IssueQuery {
    /// `png` adds a rendered barcode to the response as a data URL.
    pub format: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub product_id: String,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
    pub signature: String,
    /// Canonical text to hand to the barcode renderer.
    pub payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_url: Option<String>,
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    /// Text decoded from the scanned barcode.
    pub payload: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub product_id: String,
    pub issued_at_ms: i64,
    pub product: Product,
}

// ── Handlers ─────────────────────────────────────────────────

/// POST /api/v1/qr/issue: sign a QR payload for a registered product
///
/// `?format=png` also renders the payload and returns it as `dataUrl`.
pub async fn issue_qr(
    State(state): State<Arc<AppState>>,
    Query(query): Query<IssueQuery>,
    Json(req): Json<IssueRequest>,
) -> Result<(StatusCode, Json<IssueResponse>), AppError> {
    let want_png = match query.format.as_deref() {
        None | Some("json") => false,
        Some("png") => true,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unsupported format '{}', expected 'json' or 'png'",
                other
            )))
        }
    };

    validate_product_id(&req.product_id).map_err(AppError::InvalidProductId)?;

    if state.catalog.find(&req.product_id).await?.is_none() {
        tracing::info!(product_id = %req.product_id, "refusing to issue QR for unknown product");
        return Err(AppError::ProductNotFound(req.product_id));
    }

    let token = state.codec.issue(&req.product_id)?;
    let payload = token.encode();
    let data_url = if want_png {
        Some(render::render_data_url(&payload)?)
    } else {
        None
    };

    tracing::info!(
        product_id = %token.product_id,
        issued_at_ms = token.issued_at_ms,
        "QR payload issued"
    );

    Ok((
        StatusCode::CREATED,
        Json(IssueResponse {
            expires_at_ms: token
                .issued_at_ms
                .saturating_add(state.codec.freshness_window_ms()),
            product_id: token.product_id,
            issued_at_ms: token.issued_at_ms,
            signature: token.signature,
            payload,
            data_url,
        }),
    ))
}

/// POST /api/v1/qr/verify: verify a scanned payload and resolve its product
pub async fn verify_qr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let token = state.codec.verify_payload(&req.payload)?;

    let product = state
        .catalog
        .find(&token.product_id)
        .await?
        .ok_or_else(|| AppError::ProductNotFound(token.product_id.clone()))?;

    tracing::info!(product_id = %token.product_id, "QR payload verified");

    Ok(Json(VerifyResponse {
        product_id: token.product_id,
        issued_at_ms: token.issued_at_ms,
        product,
    }))
}

/// GET /api/v1/products/:id: product metadata
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let found = state.catalog.find(&id).await?;
    match found {
        Some(product) => Ok(Json(product)),
        None => Err(AppError::ProductNotFound(id)),
    }
}
