//! Signed, time-bound QR payloads.
//!
//! A token binds a product id to its issue time with an HMAC-SHA256 tag:
//!
//! ```text
//! signature = hex(HMAC-SHA256(secret, "<productId>:<issuedAtMs>"))
//! ```
//!
//! Verification recomputes the tag under every accepted key (constant-time
//! compare), then checks that the token is younger than the freshness window
//! and not stamped further in the future than the clock-skew tolerance.

pub mod clock;
pub mod codec;
pub mod signer;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codec::{QrCodec, DEFAULT_CLOCK_SKEW_MS, DEFAULT_FRESHNESS_WINDOW_MS};
pub use signer::{KeyRing, SecretKey};
