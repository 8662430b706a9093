//! Dominant color extraction for wallpapers.
//!
//! The dominant color of a wallpaper is the per-channel mean over a small
//! downscaled copy of the image. Averaging a 150x150 sample is cheap and
//! stable across slight wallpaper edits, which matters because the result
//! feeds a visible panel transition on every wallpaper change.

use std::path::Path;

use image::ImageReader;
use image::imageops::FilterType;
use thiserror::Error;

use crate::color::Rgb;

/// Edge length of the downscaled sample the mean is computed over.
const SAMPLE_SIZE: u32 = 150;

/// Errors that can occur while extracting a dominant color.
#[derive(Debug, Error)]
pub enum DominantError {
    /// The image file could not be opened.
    #[error("failed to read image '{path}'")]
    Read {
        /// Path of the image that failed.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The image file could not be decoded.
    #[error("failed to decode image '{path}'")]
    Decode {
        /// Path of the image that failed.
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Maps a wallpaper image path to its dominant color.
///
/// The engine only depends on this seam, so tests can substitute a source
/// returning a fixed color or a forced failure.
pub trait DominantColorSource: Send + Sync {
    /// Computes the dominant color of the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`DominantError`] if the file cannot be read or decoded.
    fn dominant_color(&self, path: &Path) -> Result<Rgb, DominantError>;
}

/// The default extractor: mean color over a downscaled sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageColor;

impl DominantColorSource for AverageColor {
    #[allow(clippy::cast_possible_truncation)]
    fn dominant_color(&self, path: &Path) -> Result<Rgb, DominantError> {
        let display = path.display().to_string();

        let img = ImageReader::open(path)
            .map_err(|source| DominantError::Read { path: display.clone(), source })?
            .decode()
            .map_err(|source| DominantError::Decode { path: display, source })?;

        let sample = img.resize_exact(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::CatmullRom).to_rgb8();

        let mut sums = [0_u64; 3];
        for pixel in sample.pixels() {
            sums[0] += u64::from(pixel[0]);
            sums[1] += u64::from(pixel[1]);
            sums[2] += u64::from(pixel[2]);
        }

        let count = u64::from(SAMPLE_SIZE) * u64::from(SAMPLE_SIZE);
        Ok(Rgb::new(
            (sums[0] / count) as u8,
            (sums[1] / count) as u8,
            (sums[2] / count) as u8,
        ))
    }
}
