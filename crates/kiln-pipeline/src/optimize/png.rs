use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::ImageFormat;

/// Re-encode a PNG at the strongest compression with adaptive filtering.
pub(super) fn recompress(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;

    let mut out = Vec::new();
    let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive);
    img.write_with_encoder(encoder)?;

    Ok(out)
}
