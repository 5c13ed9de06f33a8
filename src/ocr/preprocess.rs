//! Image Preprocessing
//!
//! Grayscale decoding and cleanup applied before OCR: percentile contrast
//! stretch, Gaussian blur and adaptive mean thresholding, all from
//! `imageproc`.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::contrast::{adaptive_threshold, stretch_contrast};
use imageproc::filter::gaussian_blur_f32;
use imageproc::stats::{histogram, percentile};

use crate::error::ExtractError;

/// Preprocessing options
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    /// Always preprocess, regardless of contrast (default: true)
    pub force: bool,
    /// Pixel standard deviation below which an image is low contrast
    pub contrast_threshold: f64,
    /// Gaussian blur sigma
    pub blur_sigma: f32,
    /// Adaptive threshold block radius; the window is `2 * radius + 1` wide
    pub block_radius: u32,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            force: true,
            contrast_threshold: 50.0,
            blur_sigma: 1.8,
            block_radius: 20,
        }
    }
}

/// Decode an image file as 8-bit grayscale
pub fn load_grayscale(path: &Path) -> Result<GrayImage, ExtractError> {
    let image = image::open(path).map_err(|e| {
        ExtractError::ImageUnreadable(format!("{}: {}", path.display(), e))
    })?;
    Ok(image.to_luma8())
}

/// Standard deviation of pixel intensities
pub fn pixel_std_dev(image: &GrayImage) -> f64 {
    let hist = &histogram(image).channels[0];
    let count: u64 = hist.iter().map(|&c| c as u64).sum();
    if count == 0 {
        return 0.0;
    }

    let mean = hist
        .iter()
        .enumerate()
        .map(|(value, &c)| value as f64 * c as f64)
        .sum::<f64>()
        / count as f64;
    let variance = hist
        .iter()
        .enumerate()
        .map(|(value, &c)| {
            let d = value as f64 - mean;
            d * d * c as f64
        })
        .sum::<f64>()
        / count as f64;

    variance.sqrt()
}

/// Whether the image is low contrast enough to need preprocessing
pub fn needs_preprocessing(image: &GrayImage, options: &PreprocessOptions) -> bool {
    pixel_std_dev(image) < options.contrast_threshold
}

/// Stretch contrast, blur, then binarize with an adaptive threshold
pub fn preprocess(image: &GrayImage, options: &PreprocessOptions) -> GrayImage {
    if image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let stretched = enhance_contrast(image);
    let blurred = if options.blur_sigma > 0.0 {
        gaussian_blur_f32(&stretched, options.blur_sigma)
    } else {
        stretched
    };
    adaptive_threshold(&blurred, options.block_radius.max(1))
}

/// Map the 1st..99th percentile intensity range onto 0..=255.
///
/// Images whose range collapses to a single level are returned as is.
fn enhance_contrast(image: &GrayImage) -> GrayImage {
    let lower = percentile(image, 1);
    let upper = percentile(image, 99);
    if lower >= upper {
        return image.clone();
    }
    stretch_contrast(image, lower, upper, 0, 255)
}

/// Encode a grayscale image as PNG in memory
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, ExtractError> {
    let mut buffer = Vec::new();
    DynamicImage::ImageLuma8(image.clone())
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| ExtractError::Encode(e.to_string()))?;
    Ok(buffer)
}
