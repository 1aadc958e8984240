// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary wall masks.
//!
//! Every rect of a floor is filled black on a white canvas once per floor
//! and mutation state; crops are windows of that canvas. Each window is
//! quantized, oversampled by `2 * ceil(size / 32)` pixels, and trimmed back
//! to `size` so the window border does not bleed into the output.

use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use floorset_core::{Component, Floor};
use image::{imageops, DynamicImage, GrayImage, Luma, RgbImage};

use crate::cache::{FifoCache, RasterKey, MAX_STORED_FLOORS};
use crate::config::{MaskConfig, RenderConfig};
use crate::error::{Error, Result};
use crate::export::{save_png, CropBuffer, ExportedFiles};
use crate::image_ops;
use crate::{check_rect, check_region, region_name, CropRenderer};

const WALL: Luma<u8> = Luma([0]);
const BACKGROUND: Luma<u8> = Luma([255]);

/// Largest window side, as a multiple of the oversampled output side.
const WINDOW_OVERSAMPLING: u32 = 4;

/// Rasterized rects of one floor.
#[derive(Debug)]
struct FloorCanvas {
    image: GrayImage,
    /// Model x at the left edge.
    left: f64,
    /// Model y at the top edge.
    top: f64,
    pixels_per_unit: f64,
}

impl FloorCanvas {
    fn render(floor: &Floor, options: &MaskConfig) -> Self {
        let bb = floor.bounding_box();
        if bb.is_empty() {
            return Self {
                image: GrayImage::from_pixel(1, 1, BACKGROUND),
                left: 0.0,
                top: 0.0,
                pixels_per_unit: options.pixels_per_unit,
            };
        }

        let longest = bb.width().max(bb.height());
        let mut ppu = options.pixels_per_unit;
        if longest * ppu > f64::from(options.max_canvas_px) {
            ppu = f64::from(options.max_canvas_px) / longest;
        }
        let width = ((bb.width() * ppu).ceil() as u32).clamp(1, options.max_canvas_px);
        let height = ((bb.height() * ppu).ceil() as u32).clamp(1, options.max_canvas_px);

        let mut canvas = Self {
            image: GrayImage::from_pixel(width, height, BACKGROUND),
            left: bb.xmin(),
            top: bb.ymax(),
            pixels_per_unit: ppu,
        };
        for rect in floor.rects() {
            let vertices: Vec<(f64, f64)> = rect
                .points()
                .iter()
                .map(|p| canvas.to_pixel(p.x, p.y))
                .collect();
            image_ops::fill_polygon(&mut canvas.image, &vertices, WALL);
        }
        canvas
    }

    fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.left) * self.pixels_per_unit,
            (self.top - y) * self.pixels_per_unit,
        )
    }

    /// Pixels under a model-space window; white outside the canvas.
    ///
    /// Windows longer than `max_side` canvas pixels are area-sampled down to
    /// `max_side` pixels on their longest side.
    fn window(&self, xmin: f64, xmax: f64, ymin: f64, ymax: f64, max_side: u32) -> GrayImage {
        let (x0, y0) = self.to_pixel(xmin, ymax);
        let (x1, y1) = self.to_pixel(xmax, ymin);
        let (span_x, span_y) = (x1 - x0, y1 - y0);
        let longest = span_x.max(span_y);
        if longest <= f64::from(max_side) {
            let width = (span_x.round() as u32).max(1);
            let height = (span_y.round() as u32).max(1);
            return image_ops::crop_padded(&self.image, x0.floor() as i64, y0.floor() as i64, width, height, BACKGROUND);
        }
        let step = longest / f64::from(max_side);
        let width = ((span_x / step).round() as u32).clamp(1, max_side);
        let height = ((span_y / step).round() as u32).clamp(1, max_side);
        image_ops::sample_area(&self.image, x0, y0, step, width, height, BACKGROUND)
    }
}

/// Renders wall masks around rects and regions.
///
/// Must be [`init`](MaskRenderer::init)ialized before use; `close` (and
/// therefore `export`) returns it to the uninitialized state.
#[derive(Debug)]
pub struct MaskRenderer {
    config: RenderConfig,
    options: MaskConfig,
    initialized: bool,
    canvases: FifoCache<RasterKey, Rc<FloorCanvas>>,
    buffer: CropBuffer,
    last_render: Option<Duration>,
    canvas_renders: usize,
}

impl MaskRenderer {
    pub fn new(config: RenderConfig, options: MaskConfig) -> Result<Self> {
        config.validate()?;
        options.validate()?;
        Ok(Self {
            config,
            options,
            initialized: false,
            canvases: FifoCache::new(MAX_STORED_FLOORS),
            buffer: CropBuffer::new(),
            last_render: None,
            canvas_renders: 0,
        })
    }

    /// Resets all state and enables rendering.
    pub fn init(&mut self) -> &mut Self {
        self.canvases.clear();
        self.buffer.clear();
        self.initialized = true;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Floor canvases currently cached.
    pub fn cached_floors(&self) -> usize {
        self.canvases.len()
    }

    /// Floor canvases rasterized since construction.
    pub fn canvas_renders(&self) -> usize {
        self.canvas_renders
    }

    fn ensure_initialized(&self, operation: &'static str) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(Error::NotInitialized(operation))
        }
    }

    fn canvas(&mut self, floor: &Floor) -> Rc<FloorCanvas> {
        let key = RasterKey::of(floor);
        if let Some(hit) = self.canvases.get(&key) {
            return Rc::clone(hit);
        }
        let started = Instant::now();
        let canvas = Rc::new(FloorCanvas::render(floor, &self.options));
        self.canvas_renders += 1;
        tracing::debug!(
            floor_id = floor.id(),
            width = canvas.image.width(),
            height = canvas.image.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rasterized floor canvas"
        );
        if let Some((evicted, _)) = self.canvases.insert(key, Rc::clone(&canvas)) {
            tracing::debug!(floor_id = evicted.floor_id, "Evicted floor canvas");
        }
        canvas
    }

    fn render(&mut self, floor: &Floor, xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Result<(usize, RgbImage)> {
        let size = self.config.image_size;
        let border = self.config.crop_px();
        let canvas = self.canvas(floor);
        let mut window = canvas.window(xmin, xmax, ymin, ymax, WINDOW_OVERSAMPLING * (size + 2 * border));
        drop(canvas);
        image_ops::quantize(&mut window, self.options.palette_levels);

        let oversampled = image_ops::resize_area(&window, size + 2 * border, size + 2 * border);
        drop(window);
        let mask = imageops::crop_imm(&oversampled, border, border, size, size).to_image();
        let rgb = DynamicImage::ImageLuma8(mask).into_rgb8();

        let name = region_name(floor.id(), xmin, xmax, ymin, ymax);
        if self.config.save_images {
            if let Some(dir) = &self.config.output_dir {
                save_png(dir, &name, &rgb)?;
            }
        }
        let index = self.buffer.push(name, rgb.clone());
        Ok((index, rgb))
    }
}

impl CropRenderer for MaskRenderer {
    fn image_size(&self) -> u32 {
        self.config.image_size
    }

    fn make_rect(&mut self, floor: &Floor, rect: &Component, crop_length: f64) -> Result<(usize, RgbImage)> {
        self.ensure_initialized("make_rect")?;
        check_rect(floor, rect, crop_length)?;
        let c = rect.mass_center();
        self.make_region(
            floor,
            c.x - crop_length,
            c.x + crop_length,
            c.y - crop_length,
            c.y + crop_length,
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
        self.ensure_initialized("make_region")?;
        check_region(xmin, xmax, ymin, ymax)?;
        let started = Instant::now();
        let out = self.render(floor, xmin, xmax, ymin, ymax)?;
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
        self.ensure_initialized("export")?;
        self.buffer.flush(path, self.config.image_size, compressed)
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_initialized("close")?;
        self.canvases.clear();
        self.buffer.clear();
        self.initialized = false;
        Ok(())
    }

    fn file_id(&self, name: &str) -> Result<usize> {
        self.buffer.file_id(name)
    }

    fn last_render_time(&self) -> Option<Duration> {
        self.last_render
    }
}
