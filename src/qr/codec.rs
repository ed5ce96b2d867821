use std::sync::Arc;

use crate::errors::TokenError;
use crate::models::token::{validate_product_id, QrToken};

use super::clock::{Clock, SystemClock};
use super::signer::{self, KeyRing};

/// Default freshness window: 24 hours.
pub const DEFAULT_FRESHNESS_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

/// Default tolerance for tokens stamped slightly in the future: 1 minute.
pub const DEFAULT_CLOCK_SKEW_MS: i64 = 60 * 1000;

/// Issues and verifies signed, time-bound QR tokens.
///
/// Holds no per-token state: verification is a pure function of the token,
/// the key ring and the current time. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct QrCodec {
    keys: KeyRing,
    freshness_window_ms: i64,
    clock_skew_ms: i64,
    clock: Arc<dyn Clock>,
}

impl QrCodec {
    pub fn new(keys: KeyRing) -> Self {
        Self {
            keys,
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            clock_skew_ms: DEFAULT_CLOCK_SKEW_MS,
            clock: Arc::new(SystemClock),
        }
    }

    /// Values below 1 ms are clamped to 1 ms so a token always verifies at
    /// the instant it was issued.
    pub fn with_freshness_window_ms(mut self, window_ms: i64) -> Self {
        self.freshness_window_ms = window_ms.max(1);
        self
    }

    /// Negative values are clamped to 0 (no tolerance for future timestamps).
    pub fn with_clock_skew_ms(mut self, skew_ms: i64) -> Self {
        self.clock_skew_ms = skew_ms.max(0);
        self
    }

    pub fn clock_skew_ms(&self) -> i64 {
        self.clock_skew_ms
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn freshness_window_ms(&self) -> i64 {
        self.freshness_window_ms
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_configured()
    }

    /// Sign `product_id` at the current time.
    ///
    /// Refuses to produce a token when no signing key is provisioned.
    pub fn issue(&self, product_id: &str) -> Result<QrToken, TokenError> {
        let key = self.keys.signing_key().ok_or_else(|| {
            TokenError::Configuration("QR signing key is not provisioned".to_string())
        })?;
        validate_product_id(product_id).map_err(TokenError::InvalidProductId)?;

        let issued_at_ms = self.clock.now_ms();
        let signature = signer::sign(key, product_id, issued_at_ms);

        tracing::debug!(product_id, issued_at_ms, "issued QR token");

        Ok(QrToken {
            product_id: product_id.to_string(),
            issued_at_ms,
            signature,
        })
    }

    /// Issue and encode in one step, yielding the text handed to the barcode renderer.
    pub fn issue_payload(&self, product_id: &str) -> Result<String, TokenError> {
        self.issue(product_id).map(|t| t.encode())
    }

    /// Check signature then freshness. Returns the product id on success.
    ///
    /// The returned error distinguishes `SignatureMismatch` from `Expired` for
    /// logging; anything facing an untrusted caller must collapse the two.
    pub fn verify(&self, token: &QrToken) -> Result<String, TokenError> {
        if self.keys.verification_keys().next().is_none() {
            return Err(TokenError::Configuration(
                "no QR verification key is provisioned".to_string(),
            ));
        }

        let signed = self.keys.verification_keys().any(|key| {
            signer::signature_matches(key, &token.product_id, token.issued_at_ms, &token.signature)
        });
        if !signed {
            tracing::warn!(product_id = %token.product_id, "QR token rejected: signature mismatch");
            return Err(TokenError::SignatureMismatch);
        }

        let now = self.clock.now_ms();
        let age_ms = now.saturating_sub(token.issued_at_ms);

        if age_ms >= self.freshness_window_ms {
            tracing::debug!(
                product_id = %token.product_id,
                age_ms,
                window_ms = self.freshness_window_ms,
                "QR token rejected: expired"
            );
            return Err(TokenError::Expired);
        }

        if age_ms < -self.clock_skew_ms {
            tracing::warn!(
                product_id = %token.product_id,
                ahead_ms = -age_ms,
                skew_ms = self.clock_skew_ms,
                "QR token rejected: issued in the future"
            );
            return Err(TokenError::Expired);
        }

        Ok(token.product_id.clone())
    }

    /// Decode scanned text and verify it.
    pub fn verify_payload(&self, text: &str) -> Result<QrToken, TokenError> {
        let token = QrToken::decode(text)?;
        self.verify(&token)?;
        Ok(token)
    }
}

impl std::fmt::Debug for QrCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrCodec")
            .field("keys", &self.keys)
            .field("freshness_window_ms", &self.freshness_window_ms)
            .field("clock_skew_ms", &self.clock_skew_ms)
            .finish_non_exhaustive()
    }
}
