// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorset Imaging
//!
//! Fixed-size crops of floor plans for dataset generation:
//!
//! - [`MaskRenderer`]: black-on-white wall masks rasterized from the floor
//!   geometry
//! - [`PhotoRectifier`]: crops of the floor's source image, located in the
//!   floor's current (rotated, scaled, flipped) model space
//!
//! Both renderers buffer their crops and export them as a `uint8`
//! `[N, size, size, 3]` array plus a CSV index of crop names.
//!
//! ```rust,ignore
//! use floorset_core::Dataset;
//! use floorset_imaging::{CropRenderer, PhotoConfig, PhotoRectifier, RenderConfig};
//!
//! let db = Dataset::load("dataset/fp.json")?;
//! let floor = db.get(302)?;
//! let mut photo = PhotoRectifier::new(RenderConfig::new(64), PhotoConfig::default())?;
//! for rect in floor.rects() {
//!     photo.make_rect(floor, rect, 5.0)?;
//! }
//! photo.export("out/photo".as_ref(), true)?;
//! ```

use std::path::Path;
use std::time::Duration;

use floorset_core::{Component, Floor};
use image::RgbImage;

pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod image_ops;
pub mod mask;
pub mod photo;

pub use cache::{FifoCache, RasterKey, MAX_STORED_FLOORS};
pub use config::{MaskConfig, PhotoConfig, RenderConfig, DEFAULT_IMAGE_SIZE};
pub use error::{Error, Result};
pub use export::{CropBuffer, ExportedFiles, PartitionedExport};
pub use mask::MaskRenderer;
pub use photo::PhotoRectifier;

/// Produces and buffers fixed-size crops of a floor.
pub trait CropRenderer {
    /// Output side length in pixels.
    fn image_size(&self) -> u32;

    /// Crop centered on the mass center of `rect`, extending `crop_length`
    /// model units to each side. Returns the buffer index and the crop.
    fn make_rect(&mut self, floor: &Floor, rect: &Component, crop_length: f64) -> Result<(usize, RgbImage)>;

    /// Crop of a model-space region. Returns the buffer index and the crop.
    fn make_region(
        &mut self,
        floor: &Floor,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    ) -> Result<(usize, RgbImage)>;

    /// Crops currently buffered.
    fn buffered(&self) -> usize;

    /// Buffered crops in render order.
    fn images(&self) -> &[RgbImage];

    /// Writes the buffered crops and clears the buffer, keeping caches.
    fn flush(&mut self, path: &Path, compressed: bool) -> Result<ExportedFiles>;

    /// Releases every buffered crop and cached raster.
    fn close(&mut self) -> Result<()>;

    /// Buffer index of a crop name.
    fn file_id(&self, name: &str) -> Result<usize>;

    /// Duration of the last `make_region` call.
    fn last_render_time(&self) -> Option<Duration>;

    /// Writes the buffered crops, then closes the renderer.
    fn export(&mut self, path: &Path, compressed: bool) -> Result<ExportedFiles> {
        let files = self.flush(path, compressed)?;
        self.close()?;
        Ok(files)
    }
}

/// Name of a region crop, `{floor}-x-{xmin}-{xmax}-y-{ymin}-{ymax}`.
pub fn region_name(floor_id: u32, xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> String {
    format!("{floor_id}-x-{xmin:.2}-{xmax:.2}-y-{ymin:.2}-{ymax:.2}")
}

pub(crate) fn check_region(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<()> {
    let finite = [xmin, xmax, ymin, ymax].iter().all(|v| v.is_finite());
    if !(finite && xmax > xmin && ymax > ymin) {
        return Err(Error::Validation(format!(
            "region must have finite positive extent, got x {xmin}..{xmax}, y {ymin}..{ymax}"
        )));
    }
    Ok(())
}

pub(crate) fn check_rect(floor: &Floor, rect: &Component, crop_length: f64) -> Result<()> {
    if rect.as_rect().is_none() {
        return Err(Error::Validation(format!(
            "{} {} is not a rect",
            rect.kind(),
            rect.id()
        )));
    }
    if rect.floor_id() != floor.id() {
        return Err(Error::Validation(format!(
            "rect {} belongs to floor {}, not floor {}",
            rect.id(),
            rect.floor_id(),
            floor.id()
        )));
    }
    if !(crop_length > 0.0 && crop_length.is_finite()) {
        return Err(Error::Validation(format!(
            "crop length must be finite and positive, got {crop_length}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_names_use_two_decimals() {
        assert_eq!(region_name(302, 1.0, 2.5, -3.456, 0.0), "302-x-1.00-2.50-y--3.46-0.00");
    }

    #[test]
    fn degenerate_regions_are_rejected() {
        assert!(check_region(0.0, 1.0, 0.0, 1.0).is_ok());
        assert!(check_region(1.0, 1.0, 0.0, 1.0).is_err());
        assert!(check_region(0.0, 1.0, 2.0, 1.0).is_err());
        assert!(check_region(0.0, f64::NAN, 0.0, 1.0).is_err());
        assert!(check_region(0.0, 1.0, f64::NEG_INFINITY, 1.0).is_err());
    }
}
