//! Pairing QR rendering

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use qrcode::QrCode;
use qrcode::render::svg;

pub use qrcode::types::QrError;

const MIN_DIMENSION: u32 = 256;

/// Encode a raw pairing payload as an SVG QR code wrapped in a base64 `data:` URI,
/// ready to drop into an `<img src>`.
pub fn render_data_uri(payload: &str) -> Result<String, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render::<svg::Color>()
        .min_dimensions(MIN_DIMENSION, MIN_DIMENSION)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();

    Ok(format!("data:image/svg+xml;base64,{}", B64.encode(image)))
}
