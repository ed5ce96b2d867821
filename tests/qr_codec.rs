//! Behavioural tests for the QR token codec.
//!
//! Tests cover:
//! - Round-trip of issued tokens through the canonical text encoding
//! - Acceptance right after issue, and idempotent re-verification
//! - Tamper rejection on every field
//! - The freshness window boundary and the future-skew guard
//! - Cross-key rejection and key rotation
//!
//! Time is driven by `FixedClock`, so nothing here depends on the wall clock.

use std::sync::Arc;

use agrichain_qr::errors::TokenError;
use agrichain_qr::models::token::QrToken;
use agrichain_qr::qr::{FixedClock, KeyRing, QrCodec, SecretKey, DEFAULT_FRESHNESS_WINDOW_MS};

const HOUR_MS: i64 = 60 * 60 * 1000;

fn codec(key: &str, clock: &Arc<FixedClock>) -> QrCodec {
    QrCodec::new(KeyRing::single(key)).with_clock(clock.clone())
}

/// Replace the character at `idx` with a different one of the same class.
fn flip_char(s: &str, idx: usize) -> String {
    s.char_indices()
        .map(|(i, c)| {
            if i != idx {
                c
            } else if c.is_ascii_digit() {
                if c == '9' { '0' } else { ((c as u8) + 1) as char }
            } else if c == 'z' {
                'a'
            } else if c == 'f' {
                '0'
            } else {
                ((c as u8) + 1) as char
            }
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Scenario from the product dashboard: prod-42, key "k", issued at t=1000
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_prod_42_valid_after_one_hour_expired_after_25() {
    let clock = Arc::new(FixedClock::new(1000));
    let codec = codec("k", &clock);

    let token = codec.issue("prod-42").unwrap();
    assert_eq!(token.issued_at_ms, 1000);
    let signature = token.signature.clone();

    let scanned = QrToken {
        product_id: "prod-42".into(),
        issued_at_ms: 1000,
        signature,
    };

    clock.set(1000 + 3_600_000);
    assert_eq!(codec.verify(&scanned).unwrap(), "prod-42");

    clock.set(1000 + 90_000_000);
    assert_eq!(codec.verify(&scanned), Err(TokenError::Expired));
}

// ═══════════════════════════════════════════════════════════════════════════
// Round-trip and acceptance
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_round_trip_preserves_token() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = codec("k", &clock);

    for id in ["prod-1", "BATCH-2024-001", "farmer:7/lot 3", "बासमती-चावल", "\"quoted\""] {
        let token = codec.issue(id).unwrap();
        let decoded = QrToken::decode(&token.encode()).unwrap();
        assert_eq!(decoded, token, "round-trip failed for {:?}", id);
    }
}

#[test]
fn test_fresh_token_verifies_and_is_idempotent() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = codec("k", &clock);
    let token = codec.issue("prod-1").unwrap();

    for _ in 0..5 {
        assert_eq!(codec.verify(&token).unwrap(), "prod-1");
    }
}

#[test]
fn test_reissue_yields_independent_valid_tokens() {
    let clock = Arc::new(FixedClock::new(10_000));
    let codec = codec("k", &clock);

    let first = codec.issue("prod-1").unwrap();
    clock.advance(1);
    let second = codec.issue("prod-1").unwrap();

    assert_ne!(first.signature, second.signature);
    assert!(codec.verify(&first).is_ok());
    assert!(codec.verify(&second).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════
// Tamper rejection
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_any_flipped_character_is_rejected() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = codec("k", &clock);
    let token = codec.issue("prod-42").unwrap();

    for idx in 0..token.product_id.len() {
        let mut t = token.clone();
        t.product_id = flip_char(&token.product_id, idx);
        assert_ne!(t.product_id, token.product_id);
        let err = codec.verify(&t).unwrap_err();
        assert!(err.is_rejection(), "productId flip at {} gave {:?}", idx, err);
    }

    let ts = token.issued_at_ms.to_string();
    for idx in 0..ts.len() {
        let mut t = token.clone();
        t.issued_at_ms = flip_char(&ts, idx).parse().unwrap();
        assert_ne!(t.issued_at_ms, token.issued_at_ms);
        let err = codec.verify(&t).unwrap_err();
        assert!(err.is_rejection(), "timestamp flip at {} gave {:?}", idx, err);
    }

    for idx in 0..token.signature.len() {
        let mut t = token.clone();
        t.signature = flip_char(&token.signature, idx);
        assert_ne!(t.signature, token.signature);
        assert_eq!(codec.verify(&t), Err(TokenError::SignatureMismatch));
    }
}

#[test]
fn test_tampered_payload_text_is_rejected() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = codec("k", &clock);
    let payload = codec.issue_payload("prod-1").unwrap();

    let forged = payload.replace("prod-1", "prod-2");
    let err = codec.verify_payload(&forged).unwrap_err();
    assert!(err.is_rejection());
}

#[test]
fn test_legacy_base64_signature_is_not_accepted() {
    // Old dashboards "signed" with base64(message + secret); that must never verify.
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = codec("agricchain-secret-key-2024", &clock);
    let token = QrToken {
        product_id: "prod-1".into(),
        issued_at_ms: 1_717_000_000_000,
        signature: "cHJvZC0xOjE3MTcwMDAwMDAwMDBhZ3JpY2NoYWluLXNlY3JldC1rZXktMjAyNA".into(),
    };
    assert_eq!(codec.verify(&token), Err(TokenError::SignatureMismatch));
}

// ═══════════════════════════════════════════════════════════════════════════
// Freshness window
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_expiry_boundary() {
    let now = 1_717_000_000_000;
    let key = SecretKey::from("k");
    let clock = Arc::new(FixedClock::new(now));
    let codec = codec("k", &clock);

    let token_at = |issued_at_ms: i64| QrToken {
        product_id: "prod-1".into(),
        issued_at_ms,
        signature: agrichain_qr::qr::signer::sign(&key, "prod-1", issued_at_ms),
    };

    let too_old = token_at(now - DEFAULT_FRESHNESS_WINDOW_MS - 1);
    assert_eq!(codec.verify(&too_old), Err(TokenError::Expired));

    let exactly_window = token_at(now - DEFAULT_FRESHNESS_WINDOW_MS);
    assert_eq!(codec.verify(&exactly_window), Err(TokenError::Expired));

    let just_inside = token_at(now - DEFAULT_FRESHNESS_WINDOW_MS + 1);
    assert_eq!(codec.verify(&just_inside).unwrap(), "prod-1");
}

#[test]
fn test_custom_window() {
    let clock = Arc::new(FixedClock::new(0));
    let codec = codec("k", &clock).with_freshness_window_ms(HOUR_MS);
    let token = codec.issue("prod-1").unwrap();

    clock.set(HOUR_MS - 1);
    assert!(codec.verify(&token).is_ok());
    clock.set(HOUR_MS);
    assert_eq!(codec.verify(&token), Err(TokenError::Expired));
}

#[test]
fn test_token_from_far_future_is_rejected() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000 + 2 * HOUR_MS));
    let issuer = codec("k", &clock);
    let token = issuer.issue("prod-1").unwrap();

    // Verifier's clock is two hours behind the issuer's.
    let verifier_clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let verifier = codec("k", &verifier_clock);
    assert_eq!(verifier.verify(&token), Err(TokenError::Expired));

    let lenient = codec("k", &verifier_clock).with_clock_skew_ms(3 * HOUR_MS);
    assert!(lenient.verify(&token).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════
// Keys
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cross_key_rejection() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let a = codec("key-a", &clock);
    let b = codec("key-b", &clock);

    let token = a.issue("prod-1").unwrap();
    assert_eq!(b.verify(&token), Err(TokenError::SignatureMismatch));
    assert!(a.verify(&token).is_ok());
}

#[test]
fn test_rotation_accepts_retired_key_until_removed() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let old = codec("2024-key", &clock);
    let token = old.issue("prod-1").unwrap();

    let rotated = QrCodec::new(KeyRing::new(
        Some(SecretKey::from("2025-key")),
        vec![SecretKey::from("2024-key")],
    ))
    .with_clock(clock.clone());
    assert!(rotated.verify(&token).is_ok());

    let retired = codec("2025-key", &clock);
    assert_eq!(retired.verify(&token), Err(TokenError::SignatureMismatch));
}

#[test]
fn test_issue_refuses_without_key() {
    let codec = QrCodec::new(KeyRing::default());
    assert!(matches!(codec.issue("prod-1"), Err(TokenError::Configuration(_))));
    assert!(matches!(codec.issue_payload("prod-1"), Err(TokenError::Configuration(_))));
}

// ═══════════════════════════════════════════════════════════════════════════
// Concurrency: the codec is shared without locks
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_concurrent_issue_and_verify() {
    let clock = Arc::new(FixedClock::new(1_717_000_000_000));
    let codec = Arc::new(codec("k", &clock));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let codec = codec.clone();
            std::thread::spawn(move || {
                let id = format!("prod-{}", i);
                for _ in 0..100 {
                    let payload = codec.issue_payload(&id).unwrap();
                    assert_eq!(codec.verify_payload(&payload).unwrap().product_id, id);
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
