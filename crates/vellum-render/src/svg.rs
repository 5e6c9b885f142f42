//! SVG rasterization hand-off.
//!
//! Vector rendering lives outside this pipeline. The builder collects an
//! inline `<svg>` subtree back into markup and hands it across this seam;
//! whatever comes back is attached to an image widget blueprint as
//! pre-decoded pixels.

use serde::Serialize;

/// A decoded RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixel data, `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

/// The collaborator that turns SVG markup into pixels.
pub trait SvgRasterizer {
    /// Rasterize the given `<svg>...</svg>` markup. `None` leaves the
    /// widget as a placeholder with no pixel data.
    fn rasterize(&self, markup: &str) -> Option<RasterImage>;
}

/// The default rasterizer: renders nothing, producing placeholder image
/// widgets. Embedders plug a real vector renderer in through
/// [`crate::scheduler::parse_document_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSvgRasterizer;

impl SvgRasterizer for NoopSvgRasterizer {
    fn rasterize(&self, _markup: &str) -> Option<RasterImage> {
        None
    }
}
