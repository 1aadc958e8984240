// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster operations for crop rendering

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, Pixel, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_line_segment_mut, draw_polygon_mut};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point;

/// 3x3 sharpening kernel applied to photo crops.
pub const SHARPEN_KERNEL: [[i32; 3]; 3] = [[-1, -1, -1], [-1, 9, -1], [-1, -1, -1]];

/// Drops the alpha channel, painting fully transparent pixels with `fill`
/// when given.
pub fn flatten_alpha(image: &RgbaImage, fill: Option<u8>) -> RgbImage {
    let mut rgb = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(rgb.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = match fill {
            Some(c) if a == 0 => Rgb([c, c, c]),
            _ => Rgb([r, g, b]),
        };
    }
    rgb
}

/// True if every channel of every pixel is zero.
pub fn is_all_black(image: &RgbImage) -> bool {
    image.as_raw().iter().all(|&v| v == 0)
}

/// Mirrors the image along the requested axes.
pub fn flip(image: &mut RgbImage, horizontal: bool, vertical: bool) {
    if horizontal {
        imageops::flip_horizontal_in_place(image);
    }
    if vertical {
        imageops::flip_vertical_in_place(image);
    }
}

/// Bilinear resize.
pub fn resize_bilinear(image: &RgbImage, width: u32, height: u32) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    imageops::resize(image, width, height, FilterType::Triangle)
}

/// Per-output-index source coverage, normalized to sum 1.
fn area_weights(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = f64::from(src) / f64::from(dst);
    (0..dst)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = start + scale;
            let mut weights = Vec::new();
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src as usize {
                let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                if overlap > 1e-9 {
                    weights.push((s, overlap as f32));
                }
                s += 1;
            }
            let total: f32 = weights.iter().map(|(_, w)| w).sum();
            if total > 0.0 {
                for (_, w) in &mut weights {
                    *w /= total;
                }
            }
            weights
        })
        .collect()
}

/// Area-averaging resize.
///
/// Each output pixel is the coverage-weighted mean of the source pixels under
/// it, which keeps one-pixel lines visible under heavy downsampling.
pub fn resize_area<P>(image: &ImageBuffer<P, Vec<u8>>, width: u32, height: u32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    if width == 0 || height == 0 || image.width() == 0 || image.height() == 0 {
        return out;
    }
    if image.dimensions() == (width, height) {
        return image.clone();
    }

    let channels = usize::from(P::CHANNEL_COUNT);
    let src_stride = image.width() as usize * channels;
    let x_weights = area_weights(image.width(), width);
    let y_weights = area_weights(image.height(), height);
    let src = image.as_raw();
    let dst: &mut [u8] = &mut out;
    let mut acc = vec![0f32; channels];

    for (oy, ys) in y_weights.iter().enumerate() {
        for (ox, xs) in x_weights.iter().enumerate() {
            acc.fill(0.0);
            for &(sy, wy) in ys {
                let row = sy * src_stride;
                for &(sx, wx) in xs {
                    let base = row + sx * channels;
                    let w = wy * wx;
                    for (a, &v) in acc.iter_mut().zip(&src[base..base + channels]) {
                        *a += w * f32::from(v);
                    }
                }
            }
            let o = (oy * width as usize + ox) * channels;
            for (d, a) in dst[o..o + channels].iter_mut().zip(&acc) {
                *d = a.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Source pixels under each of `cells` spans of `step` pixels starting at
/// `start`, weighted by the covered fraction of the span.
fn span_weights(start: f64, step: f64, cells: u32, len: u32) -> Vec<Vec<(usize, f32)>> {
    let len = f64::from(len);
    (0..cells)
        .map(|c| {
            let lo = start + f64::from(c) * step;
            let hi = lo + step;
            let first = lo.floor().clamp(0.0, len) as usize;
            let last = hi.ceil().clamp(0.0, len) as usize;
            (first..last)
                .filter_map(|s| {
                    let overlap = hi.min(s as f64 + 1.0) - lo.max(s as f64);
                    (overlap > 1e-9).then(|| (s, (overlap / step) as f32))
                })
                .collect()
        })
        .collect()
}

/// Area-averaged `width` x `height` grid over `image`, each cell `step`
/// source pixels wide, with the top-left cell at `(x, y)`.
///
/// Only source pixels inside the image are read; the uncovered share of a
/// cell takes the `fill` value.
pub fn sample_area<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    x: f64,
    y: f64,
    step: f64,
    width: u32,
    height: u32,
    fill: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let x_weights = span_weights(x, step, width, image.width());
    let y_weights = span_weights(y, step, height, image.height());
    let channels = usize::from(P::CHANNEL_COUNT);
    let src_stride = image.width() as usize * channels;
    let src = image.as_raw();
    let fill = fill.channels();

    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    let dst: &mut [u8] = &mut out;
    let mut acc = vec![0f32; channels];
    for (oy, ys) in y_weights.iter().enumerate() {
        let y_cover: f32 = ys.iter().map(|(_, w)| w).sum();
        for (ox, xs) in x_weights.iter().enumerate() {
            let x_cover: f32 = xs.iter().map(|(_, w)| w).sum();
            let outside = (1.0 - y_cover * x_cover).max(0.0);
            for (a, &f) in acc.iter_mut().zip(fill) {
                *a = outside * f32::from(f);
            }
            for &(sy, wy) in ys {
                let row = sy * src_stride;
                for &(sx, wx) in xs {
                    let base = row + sx * channels;
                    for (a, &v) in acc.iter_mut().zip(&src[base..base + channels]) {
                        *a += wy * wx * f32::from(v);
                    }
                }
            }
            let o = (oy * width as usize + ox) * channels;
            for (d, a) in dst[o..o + channels].iter_mut().zip(&acc) {
                *d = a.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

/// Output size of [`rotate_bound`].
pub fn rotated_bounds(width: u32, height: u32, angle_deg: f64) -> (u32, u32) {
    let theta = angle_deg.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (f64::from(width), f64::from(height));
    ((h * sin + w * cos) as u32, (h * cos + w * sin) as u32)
}

/// Rotates counter-clockwise (as displayed) about the image center, growing
/// the canvas so no corner is clipped. Uncovered pixels are black.
pub fn rotate_bound(image: &RgbImage, angle_deg: f64) -> RgbImage {
    if angle_deg == 0.0 {
        return image.clone();
    }
    let (bound_w, bound_h) = rotated_bounds(image.width(), image.height(), angle_deg);
    // Image y points down, so a counter-clockwise turn is a negative angle
    let projection = Projection::translate(bound_w as f32 / 2.0, bound_h as f32 / 2.0)
        * Projection::rotate(-angle_deg.to_radians() as f32)
        * Projection::translate(-(image.width() as f32) / 2.0, -(image.height() as f32) / 2.0);

    let mut out = RgbImage::new(bound_w, bound_h);
    warp_into(image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]), &mut out);
    out
}

/// Scales every channel by 5, saturating at 255.
pub fn contrast_boost(image: &mut RgbImage) {
    for v in image.iter_mut() {
        *v = v.saturating_mul(5);
    }
}

fn reflect101(i: i64, n: u32) -> u32 {
    let n = i64::from(n);
    if n == 1 {
        return 0;
    }
    let r = if i < 0 {
        -i
    } else if i >= n {
        2 * n - 2 - i
    } else {
        i
    };
    r as u32
}

/// Convolves with [`SHARPEN_KERNEL`], mirroring edges without repeating the
/// border pixel.
pub fn sharpen(image: &RgbImage) -> RgbImage {
    let (w, h) = image.dimensions();
    let mut out = RgbImage::new(w, h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let mut acc = [0i32; 3];
        for (ky, row) in SHARPEN_KERNEL.iter().enumerate() {
            let sy = reflect101(i64::from(y) + ky as i64 - 1, h);
            for (kx, &k) in row.iter().enumerate() {
                let sx = reflect101(i64::from(x) + kx as i64 - 1, w);
                let p = image.get_pixel(sx, sy);
                for (a, &v) in acc.iter_mut().zip(&p.0) {
                    *a += k * i32::from(v);
                }
            }
        }
        *px = Rgb(acc.map(|v| v.clamp(0, 255) as u8));
    }
    out
}

/// Snaps gray values to `levels` evenly spaced values.
pub fn quantize(image: &mut GrayImage, levels: u8) {
    if levels < 2 {
        return;
    }
    let step = 255.0 / f32::from(levels - 1);
    for v in image.iter_mut() {
        *v = ((f32::from(*v) / step).round() * step).round().clamp(0.0, 255.0) as u8;
    }
}

/// Fills a polygon given in pixel coordinates.
///
/// Repeated vertices are dropped; polygons that collapse below three
/// vertices are drawn as segments so thin walls stay visible.
pub fn fill_polygon(canvas: &mut GrayImage, vertices: &[(f64, f64)], color: Luma<u8>) {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(vertices.len());
    for &(x, y) in vertices {
        let p = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    match points.len() {
        0 => {}
        1 | 2 => {
            let first = points[0];
            let last = points[points.len() - 1];
            draw_line_segment_mut(
                canvas,
                (first.x as f32, first.y as f32),
                (last.x as f32, last.y as f32),
                color,
            );
        }
        _ => draw_polygon_mut(canvas, &points, color),
    }
}

/// Copies the window `[x, x + width) x [y, y + height)` of `image`,
/// painting the part outside the image with `fill`.
pub fn crop_padded<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    x: i64,
    y: i64,
    width: u32,
    height: u32,
    fill: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let mut out = ImageBuffer::from_pixel(width, height, fill);
    imageops::replace(&mut out, image, -x, -y);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_image() -> RgbImage {
        let mut img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        for y in 20..30 {
            for x in 150..160 {
                img.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        img
    }

    #[test]
    fn test_flatten_alpha() {
        let mut rgba = RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([10, 20, 30, 0]));
        rgba.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        let kept = flatten_alpha(&rgba, None);
        assert_eq!(kept.get_pixel(0, 0).0, [10, 20, 30]);
        let filled = flatten_alpha(&rgba, Some(200));
        assert_eq!(filled.get_pixel(0, 0).0, [200, 200, 200]);
        assert_eq!(filled.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(200, 100, 90.0), (100, 200));
        assert_eq!(rotated_bounds(200, 100, 180.0), (200, 100));
        assert_eq!(rotated_bounds(100, 100, 45.0), (141, 141));
    }

    #[test]
    fn test_rotate_bound_quarter_turn() {
        let rotated = rotate_bound(&square_image(), 90.0);
        assert_eq!(rotated.dimensions(), (100, 200));
        // The square centered at (155, 25) lands at (25, 45)
        assert_eq!(rotated.get_pixel(25, 45).0, [0, 0, 0]);
        assert_eq!(rotated.get_pixel(75, 150).0, [255, 255, 255]);
    }

    #[test]
    fn test_rotate_bound_oblique_angles() {
        // (dimensions, where the square center lands)
        let cases = [
            (37.0, (219, 200), (138, 47)),
            (-120.0, (186, 223), (87, 172)),
            (200.0, (222, 162), (68, 123)),
        ];
        for (angle, dims, (x, y)) in cases {
            let rotated = rotate_bound(&square_image(), angle);
            assert_eq!(rotated.dimensions(), dims, "angle {angle}");
            assert_eq!(rotated.get_pixel(x, y).0, [0, 0, 0], "angle {angle}");
            assert_eq!(rotated.get_pixel(dims.0 / 2, dims.1 / 2).0, [255, 255, 255], "angle {angle}");
        }
        // Corners uncovered by the source stay black
        assert_eq!(rotate_bound(&square_image(), 37.0).get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_rotate_zero_is_copy() {
        let img = square_image();
        assert_eq!(rotate_bound(&img, 0.0), img);
    }

    #[test]
    fn test_flip() {
        let mut img = square_image();
        flip(&mut img, true, false);
        assert_eq!(img.get_pixel(45, 25).0, [0, 0, 0]);
        flip(&mut img, false, true);
        assert_eq!(img.get_pixel(45, 74).0, [0, 0, 0]);
    }

    #[test]
    fn test_resize_area_averages() {
        let mut img = GrayImage::new(4, 2);
        for x in 0..2 {
            img.put_pixel(x, 0, Luma([255]));
            img.put_pixel(x, 1, Luma([255]));
        }
        let small = resize_area(&img, 2, 1);
        assert_eq!(small.get_pixel(0, 0).0, [255]);
        assert_eq!(small.get_pixel(1, 0).0, [0]);
        let one = resize_area(&img, 1, 1);
        assert_eq!(one.get_pixel(0, 0).0, [128]);
    }

    #[test]
    fn test_resize_area_keeps_thin_lines() {
        let mut img = GrayImage::from_pixel(64, 64, Luma([255]));
        for y in 0..64 {
            img.put_pixel(31, y, Luma([0]));
        }
        let small = resize_area(&img, 16, 16);
        assert!(small.get_pixel(7, 8).0[0] < 255);
    }

    #[test]
    fn test_sample_area() {
        let mut img = GrayImage::from_pixel(4, 4, Luma([255]));
        for y in 0..4 {
            img.put_pixel(0, y, Luma([0]));
            img.put_pixel(1, y, Luma([0]));
        }
        // 2x2 cells over the image
        let cells = sample_area(&img, 0.0, 0.0, 2.0, 2, 2, Luma([255]));
        assert_eq!(cells.as_raw(), &vec![0, 255, 0, 255]);

        // One cell per 8 pixels: a quarter of it covers the black half
        let wide = sample_area(&img, -2.0, -2.0, 8.0, 1, 1, Luma([255]));
        assert_eq!(wide.get_pixel(0, 0).0, [223]);

        // Far outside the image everything is fill
        let outside = sample_area(&img, 1e9, -1e9, 1e6, 3, 3, Luma([200]));
        assert!(outside.pixels().all(|p| p.0 == [200]));
    }

    #[test]
    fn test_sharpen() {
        let flat = RgbImage::from_pixel(4, 4, Rgb([100, 100, 100]));
        assert_eq!(sharpen(&flat), flat);

        let mut dot = RgbImage::from_pixel(3, 3, Rgb([0, 0, 0]));
        dot.put_pixel(1, 1, Rgb([20, 20, 20]));
        let out = sharpen(&dot);
        assert_eq!(out.get_pixel(1, 1).0, [180, 180, 180]);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_contrast_boost() {
        let mut img = RgbImage::from_pixel(1, 1, Rgb([10, 51, 0]));
        contrast_boost(&mut img);
        assert_eq!(img.get_pixel(0, 0).0, [50, 255, 0]);
    }

    #[test]
    fn test_quantize() {
        let mut img = GrayImage::from_raw(3, 1, vec![0, 100, 250]).unwrap();
        quantize(&mut img, 2);
        assert_eq!(img.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn test_fill_polygon() {
        let mut canvas = GrayImage::from_pixel(10, 10, Luma([255]));
        fill_polygon(
            &mut canvas,
            &[(2.0, 2.0), (7.0, 2.0), (7.0, 7.0), (2.0, 7.0), (2.0, 2.0)],
            Luma([0]),
        );
        assert_eq!(canvas.get_pixel(4, 4).0, [0]);
        assert_eq!(canvas.get_pixel(9, 9).0, [255]);

        fill_polygon(&mut canvas, &[(0.0, 9.0), (0.2, 9.1), (5.0, 9.0)], Luma([0]));
        assert_eq!(canvas.get_pixel(3, 9).0, [0]);
    }

    #[test]
    fn test_crop_padded() {
        let img = square_image();
        let crop = crop_padded(&img, 190, -5, 20, 10, Rgb([7, 7, 7]));
        assert_eq!(crop.dimensions(), (20, 10));
        assert_eq!(crop.get_pixel(0, 0).0, [7, 7, 7]);
        assert_eq!(crop.get_pixel(0, 5).0, [255, 255, 255]);
        assert_eq!(crop.get_pixel(15, 5).0, [7, 7, 7]);
    }
}
