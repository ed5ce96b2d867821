//! Barcode rendering for issued payloads.
//!
//! Matches what the dashboard has always printed: error-correction level M,
//! a one-module quiet zone, at least 256 px wide, black on white PNG.

use std::io::Cursor;

use anyhow::Context;
use base64::Engine;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

pub const QR_EC_LEVEL: EcLevel = EcLevel::M;

/// Minimum edge length of the rendered image in pixels.
pub const QR_MIN_WIDTH_PX: u32 = 256;

/// Quiet zone around the symbol, in modules.
pub const QR_MARGIN_MODULES: u32 = 1;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Render `payload` as a PNG QR code.
pub fn render_png(payload: &str) -> anyhow::Result<Vec<u8>> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), QR_EC_LEVEL)
        .map_err(|e| anyhow::anyhow!("QR encoding failed: {}", e))?;

    let modules = code.width() as u32;
    let colors = code.to_colors();
    let total = modules + 2 * QR_MARGIN_MODULES;
    // Round the module size up so the image is never smaller than the minimum width.
    let scale = QR_MIN_WIDTH_PX.div_ceil(total).max(1);
    let side = total * scale;

    let img = GrayImage::from_fn(side, side, |px, py| {
        let mx = px / scale;
        let my = py / scale;
        let inside = (QR_MARGIN_MODULES..QR_MARGIN_MODULES + modules).contains(&mx)
            && (QR_MARGIN_MODULES..QR_MARGIN_MODULES + modules).contains(&my);
        let dark = inside && {
            let idx = ((my - QR_MARGIN_MODULES) * modules + (mx - QR_MARGIN_MODULES)) as usize;
            colors[idx] == Color::Dark
        };
        if dark {
            Luma([0u8])
        } else {
            Luma([255u8])
        }
    });

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .context("PNG encoding failed")?;
    Ok(buf)
}

/// Render `payload` as a `data:image/png;base64,...` URL, the form the dashboard embeds directly.
pub fn render_data_url(payload: &str) -> anyhow::Result<String> {
    let png = render_png(payload)?;
    Ok(format!(
        "{}{}",
        PNG_DATA_URL_PREFIX,
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}
