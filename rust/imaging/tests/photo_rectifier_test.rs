// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Photo crops against a synthetic 200x100 plan with one dark square.
//!
//! The square covers pixels 150..160 x 20..30; at 10 px per unit its
//! center is the model point (15.5, -2.5).

use std::path::Path;

use floorset_core::{Component, ComponentData, Floor, RectData};
use floorset_geometry::Line2D;
use floorset_imaging::{CropRenderer, Error, PhotoConfig, PhotoRectifier, RenderConfig};
use image::{Rgb, RgbImage, Rgba, RgbaImage};

const SIZE: u32 = 16;
const CENTER: u32 = SIZE / 2;

fn write_plan(dir: &Path, name: &str) -> std::path::PathBuf {
    let mut img = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
    for y in 20..30 {
        for x in 150..160 {
            img.put_pixel(x, y, Rgb([0, 0, 0]));
        }
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

fn plan_floor(dir: &Path, id: u32) -> Floor {
    let path = write_plan(dir, &format!("plan{id}.png"));
    let mut floor = Floor::new(id, path, 10.0).unwrap();
    let data = RectData {
        wall_id: 1,
        angle: 0.0,
        length: 1.0,
        thickness: 1.0,
        line: Line2D::from_coefficients(0.0, -2.5, 0.0),
        partition: false,
    };
    floor
        .add(
            Component::new(
                900 + id,
                id,
                &[15.0, 16.0, 16.0, 15.0],
                &[-3.0, -3.0, -2.0, -2.0],
                ComponentData::Rect(data),
            )
            .unwrap(),
        )
        .unwrap();
    floor
}

fn rectifier() -> PhotoRectifier {
    PhotoRectifier::new(RenderConfig::new(SIZE), PhotoConfig::default()).unwrap()
}

fn is_dark(img: &RgbImage, x: u32, y: u32) -> bool {
    img.get_pixel(x, y).0.iter().all(|&v| v < 64)
}

fn is_light(img: &RgbImage, x: u32, y: u32) -> bool {
    img.get_pixel(x, y).0.iter().all(|&v| v > 192)
}

#[test]
fn identity_crop_is_centered_on_square() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();

    let (index, img) = photo.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    assert_eq!(index, 0);
    assert_eq!(img.dimensions(), (SIZE, SIZE));
    assert!(is_dark(&img, CENTER, CENTER));
    assert!(is_light(&img, 0, 0));
    assert!(is_light(&img, SIZE - 1, SIZE - 1));
    assert!(photo.last_render_time().is_some());
    assert_eq!(photo.file_id("1-x-14.50-16.50-y--3.50--1.50").unwrap(), 0);
}

#[test]
fn rect_crop_is_named_by_rect_id() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();
    let rect = floor.rect(901).unwrap();
    let (_, img) = photo.make_rect(&floor, rect, 1.0).unwrap();
    assert!(is_dark(&img, CENTER, CENTER));
    assert_eq!(photo.file_id("901").unwrap(), 0);
    assert!(matches!(photo.file_id("902"), Err(Error::NotProcessed(_))));
}

#[test]
fn rotated_floor_still_finds_square() {
    let dir = tempfile::tempdir().unwrap();
    let mut floor = plan_floor(dir.path(), 1);
    floor.mutate(90.0, 1.0, 1.0, true).unwrap();
    let c = floor.rect(901).unwrap().mass_center();
    assert!((c.x - 2.5).abs() < 1e-9 && (c.y - 15.5).abs() < 1e-9);

    let mut photo = rectifier();
    let (_, img) = photo.make_region(&floor, c.x - 1.0, c.x + 1.0, c.y - 1.0, c.y + 1.0).unwrap();
    assert!(is_dark(&img, CENTER, CENTER));
    assert!(is_light(&img, 0, 0));

    let raster = photo.base_raster(&floor).unwrap();
    assert_eq!(raster.pixels.dimensions(), (100, 200));
}

#[test]
fn flipped_floor_still_finds_square() {
    let dir = tempfile::tempdir().unwrap();
    let mut floor = plan_floor(dir.path(), 1);
    floor.mutate(0.0, -1.0, 1.0, true).unwrap();
    let mut photo = rectifier();
    let rect = floor.rect(901).unwrap();
    let (_, img) = photo.make_rect(&floor, rect, 1.0).unwrap();
    assert!(is_dark(&img, CENTER, CENTER));
    assert!(is_light(&img, 0, 0));
}

#[test]
fn window_outside_image_is_zero_filled() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();
    let (_, img) = photo.make_region(&floor, -100.0, -90.0, 50.0, 60.0).unwrap();
    assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn region_far_larger_than_image_renders() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();
    // 40000 px a side before downsampling
    let (_, img) = photo.make_region(&floor, -2000.0, 2000.0, -2000.0, 2000.0).unwrap();
    assert_eq!(img.dimensions(), (SIZE, SIZE));
    assert!(is_dark(&img, 0, 0));
    assert!(is_dark(&img, SIZE - 1, SIZE - 1));
}

#[test]
fn degenerate_regions_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();
    assert!(matches!(
        photo.make_region(&floor, 1.0, 1.0, 0.0, 1.0),
        Err(Error::Validation(_))
    ));
    // Narrower than one pixel at 10 px per unit
    assert!(matches!(
        photo.make_region(&floor, 15.0, 15.01, -3.0, -2.0),
        Err(Error::Shape { floor_id: 1, component_id: None, .. })
    ));
}

#[test]
fn renders_are_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let mut floor = plan_floor(dir.path(), 1);
    floor.mutate(33.0, 1.5, -0.75, false).unwrap();
    let rect = floor.rect(901).unwrap();
    let mut photo = rectifier();
    let (_, a) = photo.make_rect(&floor, rect, 2.0).unwrap();
    let (_, b) = photo.make_rect(&floor, rect, 2.0).unwrap();
    assert_eq!(a, b);
    assert_eq!(photo.raster_loads(), 1);
    assert_eq!(photo.images().len(), 2);
    assert_eq!(photo.images()[1], b);
}

#[test]
fn cache_holds_at_most_two_floors() {
    let dir = tempfile::tempdir().unwrap();
    let floors: Vec<Floor> = (1..=3).map(|id| plan_floor(dir.path(), id)).collect();
    let mut photo = rectifier();
    for floor in &floors {
        photo.make_region(floor, 14.5, 16.5, -3.5, -1.5).unwrap();
        assert!(photo.cached_floors() <= 2);
    }
    assert_eq!(photo.raster_loads(), 3);

    // Floor 1 was evicted first
    photo.make_region(&floors[0], 14.5, 16.5, -3.5, -1.5).unwrap();
    assert_eq!(photo.raster_loads(), 4);
    photo.make_region(&floors[2], 14.5, 16.5, -3.5, -1.5).unwrap();
    assert_eq!(photo.raster_loads(), 4);
}

#[test]
fn mutation_invalidates_cached_raster() {
    let dir = tempfile::tempdir().unwrap();
    let mut floor = plan_floor(dir.path(), 1);
    let mut photo = rectifier();
    photo.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    floor.mutate(45.0, 1.0, 1.0, true).unwrap();
    photo.make_region(&floor, 0.0, 1.0, 0.0, 1.0).unwrap();
    assert_eq!(photo.raster_loads(), 2);
    floor.reset();
    photo.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    assert_eq!(photo.raster_loads(), 2);
}

#[test]
fn transparent_background_becomes_white() {
    let dir = tempfile::tempdir().unwrap();
    let mut img = RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 0]));
    for y in 20..30 {
        for x in 150..160 {
            img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
        }
    }
    let path = dir.path().join("lines.png");
    img.save(&path).unwrap();
    let floor = Floor::new(7, &path, 10.0).unwrap();

    let mut photo = rectifier();
    let (_, out) = photo.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    assert!(is_light(&out, 0, 0));

    let mut gray = PhotoRectifier::new(
        RenderConfig::new(SIZE),
        PhotoConfig {
            empty_color: Some(128),
            invert: false,
        },
    )
    .unwrap();
    let (_, out) = gray.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    // Sharpening leaves flat regions untouched
    assert_eq!(out.get_pixel(0, 0).0, [128, 128, 128]);
}

#[test]
fn inverted_source() {
    let dir = tempfile::tempdir().unwrap();
    let floor = plan_floor(dir.path(), 1);
    let mut photo = PhotoRectifier::new(
        RenderConfig::new(SIZE),
        PhotoConfig {
            empty_color: None,
            invert: true,
        },
    )
    .unwrap();
    let (_, img) = photo.make_region(&floor, 14.5, 16.5, -3.5, -1.5).unwrap();
    assert!(is_light(&img, CENTER, CENTER));
    assert!(is_dark(&img, 0, 0));
}
