// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Renderer configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Default output side length in pixels.
pub const DEFAULT_IMAGE_SIZE: u32 = 64;

/// Settings shared by every renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Output side length in pixels. Must be a power of two.
    pub image_size: u32,
    /// Directory receiving per-crop PNG files.
    pub output_dir: Option<PathBuf>,
    /// Write every crop as a PNG into `output_dir`.
    pub save_images: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            output_dir: None,
            save_images: false,
        }
    }
}

impl RenderConfig {
    pub fn new(image_size: u32) -> Self {
        Self {
            image_size,
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `FLOORSET_IMAGE_SIZE`, `FLOORSET_OUTPUT_DIR` and
    /// `FLOORSET_SAVE_IMAGES`; unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self {
            image_size: std::env::var("FLOORSET_IMAGE_SIZE")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_IMAGE_SIZE),
            output_dir: std::env::var("FLOORSET_OUTPUT_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            save_images: std::env::var("FLOORSET_SAVE_IMAGES")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.image_size == 0 || !self.image_size.is_power_of_two() {
            return Err(Error::validation(format!(
                "image size must be a power of 2, got {}",
                self.image_size
            )));
        }
        if self.save_images && self.output_dir.is_none() {
            return Err(Error::validation("saving images requires an output directory"));
        }
        Ok(())
    }

    /// Border trimmed after oversampling, `ceil(size / 32)`.
    pub fn crop_px(&self) -> u32 {
        self.image_size.div_ceil(32)
    }
}

/// Options of the binary mask renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskConfig {
    /// Raster resolution of the cached floor canvas.
    pub pixels_per_unit: f64,
    /// Upper bound for either canvas side; resolution drops to fit.
    pub max_canvas_px: u32,
    /// Gray levels kept by quantization.
    pub palette_levels: u8,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            pixels_per_unit: 100.0,
            max_canvas_px: 16_384,
            palette_levels: 8,
        }
    }
}

impl MaskConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.pixels_per_unit.is_finite() && self.pixels_per_unit > 0.0) {
            return Err(Error::validation(format!(
                "pixels per unit must be positive, got {}",
                self.pixels_per_unit
            )));
        }
        if self.max_canvas_px == 0 {
            return Err(Error::validation("max canvas size must be positive"));
        }
        if self.palette_levels < 2 {
            return Err(Error::validation("palette needs at least 2 levels"));
        }
        Ok(())
    }
}

/// Options of the photo rectifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhotoConfig {
    /// Replacement for fully transparent pixels. `Some(0)` also enables the
    /// contrast boost before sharpening.
    pub empty_color: Option<u8>,
    /// Negate the source raster after loading.
    pub invert: bool,
}
