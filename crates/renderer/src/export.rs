use std::path::Path;

use image::imageops::flip_vertical_in_place;
use image::{ImageFormat, RgbaImage};
use tracing::info;

use crate::error::ExportError;
use crate::gl::RenderSurface;
use crate::pipeline::Canvas;

/// Renders `fragment_source` once and writes the frame to `path` as PNG.
///
/// The frame is also presented, so the canvas ends up showing what was saved.
pub fn export_png<S: RenderSurface>(
    canvas: &mut Canvas<S>,
    fragment_source: &str,
    path: &Path,
) -> Result<(), ExportError> {
    let (width, height) = canvas.surface().size();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptyFrame { width, height });
    }

    let pixels = canvas.snapshot(fragment_source)?;
    let mut frame =
        RgbaImage::from_raw(width, height, pixels).ok_or(ExportError::EmptyFrame { width, height })?;
    // GL rows start at the bottom edge.
    flip_vertical_in_place(&mut frame);
    frame.save_with_format(path, ImageFormat::Png)?;

    info!(path = %path.display(), width, height, "exported still frame");
    Ok(())
}
