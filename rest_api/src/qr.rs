// rest_api/src/qr.rs

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::Luma;
use qrcode::{EcLevel, QrCode};

use models::{ProfileError, ProfileResult};

/// Side length of the rendered code in pixels.
const QR_SIZE_PX: u32 = 300;

/// Renders `data` as a black-on-white PNG QR code and returns it as an
/// inline `data:image/png;base64,...` string. Error correction is level
/// High, so up to roughly 30% of the symbol can be damaged or obscured and
/// still scan.
///
/// Deterministic: identical input produces identical output bytes. Input
/// over the symbol capacity surfaces as `EncodingError`; it is never
/// silently truncated.
pub fn encode_data_url(data: &str) -> ProfileResult<String> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::H)
        .map_err(|e| ProfileError::EncodingError(e.to_string()))?;
    let rendered = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_SIZE_PX, QR_SIZE_PX)
        .build();
    let mut png = Vec::new();
    image::DynamicImage::ImageLuma8(rendered)
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ProfileError::EncodingError(e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&png)))
}
