//! Lossless optimization of image files.
//!
//! Every optimizer returns the bytes to publish and never changes decoded
//! pixels: GIF re-encodes are dropped when quantization alters a frame.
//! Raster re-encodes are only kept when they are smaller than the original.

mod gif;
mod jpeg;
mod png;

use std::path::Path;

use kiln_svg::{OptimizeOptions, SvgError};

/// Errors raised when a file cannot be optimized. Callers fall back to
/// copying the original bytes.
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("Malformed JPEG: {0}")]
    Jpeg(&'static str),

    #[error(transparent)]
    Svg(#[from] SvgError),

    #[error("SVG is not valid UTF-8")]
    Encoding,
}

/// File formats with a dedicated optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Png,
    Jpeg,
    Gif,
    Svg,
    Other,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "png" => Format::Png,
            "jpg" | "jpeg" => Format::Jpeg,
            "gif" => Format::Gif,
            "svg" => Format::Svg,
            _ => Format::Other,
        }
    }
}

/// Optimize `bytes` as `format`.
pub fn optimize(format: Format, bytes: &[u8]) -> Result<Vec<u8>, OptimizeError> {
    match format {
        Format::Png => Ok(smaller(bytes, png::recompress(bytes)?)),
        Format::Jpeg => Ok(smaller(bytes, jpeg::strip_metadata(bytes)?)),
        Format::Gif => Ok(smaller(bytes, gif::reencode(bytes)?)),
        Format::Svg => {
            let source = std::str::from_utf8(bytes).map_err(|_| OptimizeError::Encoding)?;
            Ok(kiln_svg::optimize(source, &OptimizeOptions::images())?.into_bytes())
        }
        Format::Other => Ok(bytes.to_vec()),
    }
}

fn smaller(original: &[u8], candidate: Vec<u8>) -> Vec<u8> {
    if candidate.len() < original.len() {
        candidate
    } else {
        original.to_vec()
    }
}
