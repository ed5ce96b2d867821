use std::path::PathBuf;

use crate::qr::{KeyRing, QrCodec, SecretKey, DEFAULT_CLOCK_SKEW_MS, DEFAULT_FRESHNESS_WINDOW_MS};

/// Minimum secret length enforced in production.
pub const MIN_PRODUCTION_SECRET_LEN: usize = 32;

#[derive(Debug)]
pub struct Config {
    pub port: u16,
    /// Current signing key. `None` means Issue fails with a configuration error.
    pub secret_key: Option<SecretKey>,
    /// Retired keys still accepted by Verify during rotation.
    /// Set via AGRICHAIN_QR_PREVIOUS_SECRETS (comma-separated).
    pub previous_keys: Vec<SecretKey>,
    /// Set via AGRICHAIN_QR_FRESHNESS_MS. Default: 86400000 (24h).
    pub freshness_window_ms: i64,
    /// Set via AGRICHAIN_QR_CLOCK_SKEW_MS. Default: 60000.
    pub clock_skew_ms: i64,
    /// JSON or YAML product catalog loaded at startup.
    pub catalog_path: Option<PathBuf>,
    pub dashboard_origin: String,
}

impl Config {
    pub fn key_ring(&self) -> KeyRing {
        KeyRing::new(self.secret_key.clone(), self.previous_keys.clone())
    }

    /// Build the process-wide codec from this configuration.
    pub fn codec(&self) -> QrCodec {
        QrCodec::new(self.key_ring())
            .with_freshness_window_ms(self.freshness_window_ms)
            .with_clock_skew_ms(self.clock_skew_ms)
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|name| std::env::var(name).ok())
}

/// Build a `Config` from an arbitrary variable source (the process environment in `load`).
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let env_mode = lookup("AGRICHAIN_ENV")
        .or_else(|| lookup("RUST_ENV"))
        .unwrap_or_default();
    let production = env_mode == "production";

    let secret_key = lookup("AGRICHAIN_QR_SECRET")
        .filter(|s| !s.is_empty())
        .map(|s| SecretKey::new(s.into_bytes()));

    match &secret_key {
        None if production => anyhow::bail!(
            "AGRICHAIN_QR_SECRET is not set. QR tokens cannot be signed in production without it."
        ),
        None => tracing::warn!(
            "AGRICHAIN_QR_SECRET is not set; QR issuing is disabled. Run `agrichain-qr keygen` to create one."
        ),
        Some(key) if production && key.len() < MIN_PRODUCTION_SECRET_LEN => anyhow::bail!(
            "AGRICHAIN_QR_SECRET is {} bytes; at least {} are required in production",
            key.len(),
            MIN_PRODUCTION_SECRET_LEN
        ),
        Some(_) => {}
    }

    let previous_keys = lookup("AGRICHAIN_QR_PREVIOUS_SECRETS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SecretKey::from)
        .collect();

    let freshness_window_ms = lookup("AGRICHAIN_QR_FRESHNESS_MS")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_FRESHNESS_WINDOW_MS);
    if freshness_window_ms <= 0 {
        anyhow::bail!(
            "AGRICHAIN_QR_FRESHNESS_MS must be positive, got {}",
            freshness_window_ms
        );
    }

    let clock_skew_ms = lookup("AGRICHAIN_QR_CLOCK_SKEW_MS")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .unwrap_or(DEFAULT_CLOCK_SKEW_MS);

    Ok(Config {
        port: lookup("AGRICHAIN_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080),
        secret_key,
        previous_keys,
        freshness_window_ms,
        clock_skew_ms,
        catalog_path: lookup("AGRICHAIN_CATALOG_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from),
        dashboard_origin: lookup("DASHBOARD_ORIGIN")
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
    })
}
