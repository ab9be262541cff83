//! SVG processing for kiln.
//!
//! Provides the three steps the sprite and image tasks chain together:
//! minification, presentation attribute stripping, and combining icons into
//! a single `<symbol>` sprite.

pub mod optimize;
pub mod sprite;
pub mod strip;

mod xml;

pub use optimize::{optimize, OptimizeOptions};
pub use sprite::{symbol_id, SpriteBuilder, Symbol};
pub use strip::{strip_attributes, unescape_gt, PRESENTATION_ATTRIBUTES};

/// Errors that can occur while processing SVG documents.
#[derive(Debug, thiserror::Error)]
pub enum SvgError {
    #[error("Malformed SVG: {0}")]
    Xml(String),

    #[error("Document has no <svg> root element")]
    MissingRoot,

    #[error("Duplicate symbol id: {0}")]
    DuplicateId(String),
}
