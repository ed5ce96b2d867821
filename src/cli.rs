use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use rand::RngCore;
use zeroize::Zeroize;

use crate::config::MIN_PRODUCTION_SECRET_LEN;
use crate::qr::QrCodec;
use crate::render;

/// Message for every rejected payload, identical to the HTTP API's.
pub const REJECTION_MESSAGE: &str = "invalid or expired QR code";

/// AgriChain QR: signed, time-bound QR payloads for product verification
#[derive(Parser)]
#[command(name = "agrichain-qr", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP service
    Serve {
        /// Port to bind (defaults to AGRICHAIN_PORT, then 8080)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Issue a signed QR payload for a product
    Issue {
        /// Product identifier to bind into the payload
        product_id: String,

        /// Also write the rendered QR code to this PNG file
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// Verify a scanned QR payload (reads stdin when omitted)
    Verify {
        payload: Option<String>,
    },

    /// Generate a random secret suitable for AGRICHAIN_QR_SECRET
    Keygen {
        /// Number of random bytes (hex-encoded on output)
        #[arg(long, default_value = "32")]
        bytes: usize,
    },
}

/// `issue`: print the canonical payload, optionally rendering it to a PNG file.
pub fn run_issue(
    codec: &QrCodec,
    product_id: &str,
    png: Option<&Path>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let payload = codec
        .issue_payload(product_id)
        .context("failed to issue QR payload")?;

    if let Some(path) = png {
        let image = render::render_png(&payload)?;
        std::fs::write(path, image)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(product_id, path = %path.display(), "QR code written");
    }

    writeln!(out, "{}", payload)?;
    Ok(())
}

/// `verify`: check `payload`, or the text read from `input` when absent, and
/// print the product id.
pub fn run_verify(
    codec: &QrCodec,
    payload: Option<String>,
    mut input: impl Read,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let payload = match payload {
        Some(p) => p,
        None => {
            let mut buf = String::new();
            input
                .read_to_string(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        }
    };

    match codec.verify_payload(&payload) {
        Ok(token) => {
            writeln!(out, "{}", token.product_id)?;
            Ok(())
        }
        Err(e) if e.is_rejection() => anyhow::bail!(REJECTION_MESSAGE),
        Err(e) => Err(e.into()),
    }
}

/// `keygen`: print `bytes` random bytes from the OS RNG as hex.
pub fn run_keygen(bytes: usize, out: &mut impl Write) -> anyhow::Result<()> {
    if bytes < MIN_PRODUCTION_SECRET_LEN {
        anyhow::bail!(
            "refusing to generate a {}-byte secret; production requires at least {}",
            bytes,
            MIN_PRODUCTION_SECRET_LEN
        );
    }
    let mut key = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut key);
    let mut encoded = hex::encode(&key);
    key.zeroize();
    let written = writeln!(out, "{}", encoded);
    encoded.zeroize();
    written?;
    Ok(())
}
