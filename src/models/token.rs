// Signed QR token, the only entity the codec deals with.
// Field names and order are the wire format shared by issuer and scanner.

use serde::{Deserialize, Serialize};

use crate::errors::TokenError;

/// Byte capacity of a version-40 QR code in byte mode at error-correction level M,
/// the level payloads are rendered at.
pub const MAX_QR_PAYLOAD_LEN: usize = 2331;

/// Longest product id accepted at issue and parse time.
pub const MAX_PRODUCT_ID_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QrToken {
    #[serde(rename = "productId")]
    pub product_id: String,
    /// Milliseconds since the Unix epoch at issue time.
    #[serde(rename = "timestamp")]
    pub issued_at_ms: i64,
    /// Lowercase hex HMAC-SHA256 over `productId:timestamp`.
    pub signature: String,
}

impl QrToken {
    /// Canonical compact JSON, e.g. `{"productId":"prod-42","timestamp":1000,"signature":"…"}`.
    pub fn encode(&self) -> String {
        // Plain struct of strings and integers; serde_json cannot fail on it.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse the canonical text. Does not check signature or freshness.
    pub fn decode(text: &str) -> Result<Self, TokenError> {
        if text.len() > MAX_QR_PAYLOAD_LEN {
            return Err(TokenError::Parse(format!(
                "payload is {} bytes, QR capacity is {}",
                text.len(),
                MAX_QR_PAYLOAD_LEN
            )));
        }

        let token: QrToken =
            serde_json::from_str(text.trim()).map_err(|e| TokenError::Parse(e.to_string()))?;

        validate_product_id(&token.product_id).map_err(TokenError::Parse)?;
        Ok(token)
    }
}

/// Product ids must be non-empty, at most [`MAX_PRODUCT_ID_LEN`] bytes, and free of
/// control characters.
pub fn validate_product_id(product_id: &str) -> Result<(), String> {
    if product_id.is_empty() {
        return Err("productId must not be empty".to_string());
    }
    if product_id.len() > MAX_PRODUCT_ID_LEN {
        return Err(format!(
            "productId is {} bytes, max is {}",
            product_id.len(),
            MAX_PRODUCT_ID_LEN
        ));
    }
    if product_id.chars().any(char::is_control) {
        return Err("productId must not contain control characters".to_string());
    }
    Ok(())
}
