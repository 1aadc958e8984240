// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crops of the floor's source photograph.
//!
//! The source image is prepared once per floor and mutation state: flipped
//! and resized by the mutator scale, then rotated by the mutator angle onto
//! an enlarged canvas. Crop centers given in the mutated model space are
//! mapped into that canvas analytically, so the vector geometry and the
//! photograph never need to be resampled together.

use std::f64::consts::PI;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use floorset_core::{Component, Floor};
use floorset_geometry::Point2D;
use image::{imageops, ImageReader, Rgb, RgbImage};

use crate::cache::{FifoCache, RasterKey, MAX_STORED_FLOORS};
use crate::config::{PhotoConfig, RenderConfig};
use crate::error::{Error, Result};
use crate::export::{save_png, CropBuffer, ExportedFiles};
use crate::image_ops;
use crate::{check_rect, check_region, region_name, CropRenderer};

/// Crops between forced releases of the cached source rasters.
pub const IMAGES_TO_CLEAR_MEMORY: usize = 10_000;

/// Largest crop window side, as a multiple of the output side.
const WINDOW_OVERSAMPLING: u32 = 4;

/// Source raster in one mutation state.
#[derive(Debug)]
pub struct BaseRaster {
    /// Flipped, resized and rotated pixels.
    pub pixels: RgbImage,
    /// Size after flip/resize, before rotation.
    pub unrotated: (f64, f64),
}

/// Pixel of `focus` (mutated model space) in the rotated base raster.
pub fn focus_pixel(floor: &Floor, base: &BaseRaster, focus: &Point2D) -> Point2D {
    let angle = floor.mutator_angle();
    let (ax, ay) = pixel_factors(floor);
    let (width, height) = base.unrotated;

    let mut p = focus.clone();
    p.rotate(&Point2D::origin(), -angle);
    p.x *= ax;
    p.y *= ay;
    if ax < 0.0 {
        p.x = width - p.x;
    }
    if ay > 0.0 {
        p.y = height - p.y;
    }

    let center = Point2D::new(width / 2.0, height / 2.0);
    let r = p.dist(&center);
    let theta = p.angle_to(&center) + PI * (1.0 - angle / 180.0);
    Point2D::new(
        f64::from(base.pixels.width()) / 2.0 + r * theta.cos(),
        f64::from(base.pixels.height()) / 2.0 + r * theta.sin(),
    )
}

/// Signed model-to-pixel factors; image y grows downward.
fn pixel_factors(floor: &Floor) -> (f64, f64) {
    let sc = floor.image_scale();
    (
        sc * floor.mutator_scale_x().signum(),
        sc * (-floor.mutator_scale_y()).signum(),
    )
}

/// Integer pixel window `(x1, y1, x2, y2)` around `focus`, `dx` and `dy`
/// model units to each side.
pub fn pixel_window(floor: &Floor, base: &BaseRaster, focus: &Point2D, dx: f64, dy: f64) -> (i64, i64, i64, i64) {
    let (ax, ay) = pixel_factors(floor);
    let center = focus_pixel(floor, base, focus);
    let (cx, cy) = (center.x / ax, center.y / ay);
    let xs = [((cx - dx) * ax) as i64, ((cx + dx) * ax) as i64];
    let ys = [((cy - dy) * ay) as i64, ((cy + dy) * ay) as i64];
    (xs[0].min(xs[1]), ys[0].min(ys[1]), xs[0].max(xs[1]), ys[0].max(ys[1]))
}

/// Renders crops of floor photographs.
#[derive(Debug)]
pub struct PhotoRectifier {
    config: RenderConfig,
    options: PhotoConfig,
    rasters: FifoCache<RasterKey, Rc<BaseRaster>>,
    buffer: CropBuffer,
    processed: usize,
    raster_loads: usize,
    last_render: Option<Duration>,
}

impl PhotoRectifier {
    pub fn new(config: RenderConfig, options: PhotoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            options,
            rasters: FifoCache::new(MAX_STORED_FLOORS),
            buffer: CropBuffer::new(),
            processed: 0,
            raster_loads: 0,
            last_render: None,
        })
    }

    /// Source rasters currently cached.
    pub fn cached_floors(&self) -> usize {
        self.rasters.len()
    }

    /// Source rasters decoded since construction.
    pub fn raster_loads(&self) -> usize {
        self.raster_loads
    }

    /// Crops rendered since the last `close`.
    pub fn processed(&self) -> usize {
        self.processed
    }

    fn decode(&self, path: &Path) -> Result<RgbImage> {
        let load_error = |reason: String| Error::FileLoad {
            path: path.to_path_buf(),
            reason,
        };
        let decoded = ImageReader::open(path)
            .map_err(|e| load_error(e.to_string()))?
            .with_guessed_format()
            .map_err(|e| load_error(e.to_string()))?
            .decode()
            .map_err(|e| load_error(e.to_string()))?;

        if !decoded.color().has_alpha() {
            return Ok(decoded.into_rgb8());
        }
        let rgba = decoded.into_rgba8();
        Ok(match self.options.empty_color {
            Some(color) => image_ops::flatten_alpha(&rgba, Some(color)),
            None => {
                let rgb = image_ops::flatten_alpha(&rgba, None);
                // Line art drawn on a transparent background
                if image_ops::is_all_black(&rgb) {
                    image_ops::flatten_alpha(&rgba, Some(u8::MAX))
                } else {
                    rgb
                }
            }
        })
    }

    /// Prepared source raster of `floor`, from cache when possible.
    pub fn base_raster(&mut self, floor: &Floor) -> Result<Rc<BaseRaster>> {
        let key = RasterKey::of(floor);
        if let Some(hit) = self.rasters.get(&key) {
            return Ok(Rc::clone(hit));
        }

        let started = Instant::now();
        let mut pixels = self.decode(floor.image_path())?;
        if self.options.invert {
            imageops::invert(&mut pixels);
        }
        let (sx, sy) = (floor.mutator_scale_x(), floor.mutator_scale_y());
        if sx != 1.0 || sy != 1.0 {
            image_ops::flip(&mut pixels, sx < 0.0, sy < 0.0);
            let width = ((f64::from(pixels.width()) * sx).abs().ceil() as u32).max(1);
            let height = ((f64::from(pixels.height()) * sy).abs().ceil() as u32).max(1);
            pixels = image_ops::resize_bilinear(&pixels, width, height);
        }
        let unrotated = (f64::from(pixels.width()), f64::from(pixels.height()));
        let pixels = image_ops::rotate_bound(&pixels, floor.mutator_angle());

        let raster = Rc::new(BaseRaster { pixels, unrotated });
        self.raster_loads += 1;
        tracing::debug!(
            floor_id = floor.id(),
            path = %floor.image_path().display(),
            width = raster.pixels.width(),
            height = raster.pixels.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prepared floor image"
        );
        if let Some((evicted, _)) = self.rasters.insert(key, Rc::clone(&raster)) {
            tracing::debug!(floor_id = evicted.floor_id, "Evicted floor image");
        }
        Ok(raster)
    }

    fn render(
        &mut self,
        floor: &Floor,
        focus: &Point2D,
        dx: f64,
        dy: f64,
        name: String,
        component_id: Option<u32>,
    ) -> Result<(usize, RgbImage)> {
        let raster = self.base_raster(floor)?;
        let (x1, y1, x2, y2) = pixel_window(floor, &raster, focus, dx, dy);
        let (width, height) = (x2 - x1, y2 - y1);
        if width <= 0 || height <= 0 {
            return Err(Error::Shape {
                floor_id: floor.id(),
                component_id,
                detail: format!("empty crop window x {x1}..{x2}, y {y1}..{y2}"),
            });
        }
        let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => {
                return Err(Error::Shape {
                    floor_id: floor.id(),
                    component_id,
                    detail: format!("crop window {width}x{height} exceeds the raster limits"),
                })
            }
        };

        let size = self.config.image_size;
        let max_side = WINDOW_OVERSAMPLING * size;
        let longest = width.max(height);
        let crop = if longest <= max_side {
            image_ops::crop_padded(&raster.pixels, x1, y1, width, height, Rgb([0, 0, 0]))
        } else {
            let step = f64::from(longest) / f64::from(max_side);
            let w = ((f64::from(width) / step).round() as u32).clamp(1, max_side);
            let h = ((f64::from(height) / step).round() as u32).clamp(1, max_side);
            image_ops::sample_area(&raster.pixels, x1 as f64, y1 as f64, step, w, h, Rgb([0, 0, 0]))
        };
        drop(raster);
        let mut resized = image_ops::resize_area(&crop, size, size);
        drop(crop);
        if self.options.empty_color == Some(0) {
            image_ops::contrast_boost(&mut resized);
        }
        let out = image_ops::sharpen(&resized);

        if self.config.save_images {
            if let Some(dir) = &self.config.output_dir {
                save_png(dir, &name, &out)?;
            }
        }
        let index = self.buffer.push(name, out.clone());

        self.processed += 1;
        if self.processed % IMAGES_TO_CLEAR_MEMORY == 0 {
            tracing::debug!(processed = self.processed, "Releasing cached floor images");
            self.rasters.clear();
        }
        Ok((index, out))
    }
}

impl CropRenderer for PhotoRectifier {
    fn image_size(&self) -> u32 {
        self.config.image_size
    }

    fn make_rect(&mut self, floor: &Floor, rect: &Component, crop_length: f64) -> Result<(usize, RgbImage)> {
        check_rect(floor, rect, crop_length)?;
        let focus = rect.mass_center();
        self.render(
            floor,
            &focus,
            crop_length,
            crop_length,
            rect.id().to_string(),
            Some(rect.id()),
        )
    }

    fn make_region(
        &mut self,
        floor: &Floor,
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
    ) -> Result<(usize, RgbImage)> {
        check_region(xmin, xmax, ymin, ymax)?;
        let started = Instant::now();
        let (dx, dy) = ((xmax - xmin) / 2.0, (ymax - ymin) / 2.0);
        let focus = Point2D::new(xmin + dx, ymin + dy);
        let name = region_name(floor.id(), xmin, xmax, ymin, ymax);
        let out = self.render(floor, &focus, dx, dy, name, None)?;
        self.last_render = Some(started.elapsed());
        Ok(out)
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn images(&self) -> &[RgbImage] {
        self.buffer.images()
    }

    fn flush(&mut self, path: &Path, compressed: bool) -> Result<ExportedFiles> {
        self.buffer.flush(path, self.config.image_size, compressed)
    }

    fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.rasters.clear();
        self.processed = 0;
        Ok(())
    }

    fn file_id(&self, name: &str) -> Result<usize> {
        self.buffer.file_id(name)
    }

    fn last_render_time(&self) -> Option<Duration> {
        self.last_render
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor(scale: f64) -> (tempfile::NamedTempFile, Floor) {
        let image = tempfile::NamedTempFile::new().unwrap();
        let floor = Floor::new(4, image.path(), scale).unwrap();
        (image, floor)
    }

    fn raster(floor: &Floor, width: u32, height: u32) -> BaseRaster {
        let (w, h) = image_ops::rotated_bounds(width, height, floor.mutator_angle());
        BaseRaster {
            pixels: RgbImage::new(w, h),
            unrotated: (f64::from(width), f64::from(height)),
        }
    }

    #[test]
    fn identity_maps_by_scale() {
        let (_image, floor) = floor(10.0);
        let base = raster(&floor, 200, 100);
        let p = focus_pixel(&floor, &base, &Point2D::new(15.5, -2.5));
        assert_relative_eq!(p.x, 155.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 25.0, epsilon = 1e-9);
        assert_eq!(pixel_window(&floor, &base, &Point2D::new(15.5, -2.5), 1.0, 1.0), (145, 15, 165, 35));
    }

    #[test]
    fn quarter_turn_follows_rotated_canvas() {
        let (_image, mut floor) = floor(10.0);
        floor.mutate(90.0, 1.0, 1.0, true).unwrap();
        let base = raster(&floor, 200, 100);
        assert_eq!(base.pixels.dimensions(), (100, 200));
        let p = focus_pixel(&floor, &base, &Point2D::new(2.5, 15.5));
        assert_relative_eq!(p.x, 25.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 45.0, epsilon = 1e-6);
    }

    #[test]
    fn horizontal_flip_mirrors_column() {
        let (_image, mut floor) = floor(10.0);
        floor.mutate(0.0, -1.0, 1.0, true).unwrap();
        let base = raster(&floor, 200, 100);
        let p = focus_pixel(&floor, &base, &Point2D::new(-15.5, -2.5));
        assert_relative_eq!(p.x, 45.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn vertical_flip_mirrors_row() {
        let (_image, mut floor) = floor(10.0);
        floor.mutate(0.0, 1.0, -1.0, true).unwrap();
        let base = raster(&floor, 200, 100);
        let p = focus_pixel(&floor, &base, &Point2D::new(15.5, 2.5));
        assert_relative_eq!(p.x, 155.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 75.0, epsilon = 1e-9);
    }

    #[test]
    fn missing_image_is_a_load_error() {
        let (image, floor) = floor(10.0);
        let mut photo = PhotoRectifier::new(RenderConfig::new(16), PhotoConfig::default()).unwrap();
        // The temp file exists but holds no image data
        let err = photo.make_region(&floor, 0.0, 1.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::FileLoad { .. }));
        drop(image);
    }
}
