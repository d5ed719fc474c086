//! Image Crop Tool
//!
//! Simulates zooming in: cuts a pixel box out of the source image and saves
//! it next to the source. Decode and encode run on the blocking pool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::GenericImageView;

use recon_core::{BoundingBox, CropTool, Result as CoreResult};

use crate::error::{Result, ToolError};

/// Output path for a crop: `{base}_crop_{xmin}_{ymin}{ext}` beside `source`
pub fn derived_path(source: &Path, bbox: &BoundingBox) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    source.with_file_name(format!("{}_crop_{}_{}{}", stem, bbox.xmin, bbox.ymin, ext))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCropper;

impl ImageCropper {
    pub fn new() -> Self {
        Self
    }

    fn crop_blocking(source: &Path, bbox: BoundingBox) -> Result<PathBuf> {
        let img = image::open(source)?;
        let (width, height) = img.dimensions();
        if !bbox.fits_within(width, height) {
            return Err(ToolError::Crop(format!(
                "box {} does not fit a {}x{} image",
                bbox, width, height
            )));
        }

        // fits_within guarantees non-negative, in-range edges
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let cropped = img.crop_imm(
            bbox.xmin as u32,
            bbox.ymin as u32,
            bbox.width() as u32,
            bbox.height() as u32,
        );

        let output = derived_path(source, &bbox);
        cropped.save(&output)?;
        Ok(output)
    }
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ToolError::Crop(format!("worker failed: {}", e)))?
}

/// Wrap any failure in the crop display prefix
fn crop_error(err: ToolError) -> recon_core::AgentError {
    match err {
        ToolError::Crop(_) => err.into(),
        other => ToolError::Crop(other.to_string()).into(),
    }
}

#[async_trait]
impl CropTool for ImageCropper {
    async fn dimensions(&self, path: &Path) -> CoreResult<(u32, u32)> {
        let path = path.to_path_buf();
        blocking(move || Ok(image::image_dimensions(&path)?))
            .await
            .map_err(crop_error)
    }

    async fn crop_image(&self, path: &Path, bbox: BoundingBox) -> CoreResult<PathBuf> {
        tracing::info!(tool = "crop_image", "[Tool: Visual Zoom] Cropping {} to {}...", path.display(), bbox);
        let source = path.to_path_buf();
        blocking(move || Self::crop_blocking(&source, bbox))
            .await
            .map_err(crop_error)
    }
}
