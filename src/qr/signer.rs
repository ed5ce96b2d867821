use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded HMAC-SHA256 tag.
pub const SIGNATURE_HEX_LEN: usize = 64;

/// Shared secret used to sign QR tokens.
///
/// Treated as opaque bytes. The bytes are wiped on drop and never appear in
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey(Vec<u8>);

impl SecretKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for SecretKey {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey(<{} bytes redacted>)", self.0.len())
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Signing key plus retired keys that are still honoured during rotation.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    current: Option<SecretKey>,
    previous: Vec<SecretKey>,
}

impl KeyRing {
    pub fn new(current: Option<SecretKey>, previous: Vec<SecretKey>) -> Self {
        Self {
            current: current.filter(|k| !k.is_empty()),
            previous: previous.into_iter().filter(|k| !k.is_empty()).collect(),
        }
    }

    pub fn single(key: impl Into<SecretKey>) -> Self {
        Self::new(Some(key.into()), Vec::new())
    }

    /// Key used for new signatures, if one is provisioned.
    pub fn signing_key(&self) -> Option<&SecretKey> {
        self.current.as_ref()
    }

    /// All keys accepted by verification, current key first.
    pub fn verification_keys(&self) -> impl Iterator<Item = &SecretKey> {
        self.current.iter().chain(self.previous.iter())
    }

    pub fn is_configured(&self) -> bool {
        self.current.is_some()
    }
}

/// The exact bytes covered by a token signature: `<productId>:<issuedAtMs>`.
pub fn signing_message(product_id: &str, issued_at_ms: i64) -> String {
    format!("{}:{}", product_id, issued_at_ms)
}

/// HMAC-SHA256 of the signing message, as lowercase hex.
pub fn sign(key: &SecretKey, product_id: &str, issued_at_ms: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(signing_message(product_id, issued_at_ms).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of `signature` against the expected tag under `key`.
///
/// Compares the hex text itself, so a signature differing only in letter
/// case is rejected.
pub fn signature_matches(
    key: &SecretKey,
    product_id: &str,
    issued_at_ms: i64,
    signature: &str,
) -> bool {
    let expected = sign(key, product_id, issued_at_ms);
    bool::from(expected.as_bytes().ct_eq(signature.as_bytes()))
}
