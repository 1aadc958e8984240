// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free functions over vertex lists.

use crate::bounds::BoundingBox;
use crate::point::Point2D;

/// Arithmetic mean of the vertices (not the area centroid).
///
/// Returns the origin for an empty slice.
pub fn mass_center(points: &[Point2D]) -> Point2D {
    if points.is_empty() {
        return Point2D::origin();
    }
    let sx: f64 = points.iter().map(|p| p.x).sum();
    let sy: f64 = points.iter().map(|p| p.y).sum();
    let mut center = Point2D::new(sx, sy);
    center.scale(1.0 / points.len() as f64);
    center
}

/// Bounding box of any number of vertex lists.
pub fn bounds_of<'a, I>(points: I) -> BoundingBox
where
    I: IntoIterator<Item = &'a Point2D>,
{
    points
        .into_iter()
        .fold(BoundingBox::empty(), |bb, p| bb.including(p.x, p.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point2D> {
        vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 2.0),
            Point2D::new(0.0, 2.0),
        ]
    }

    #[test]
    fn mass_center_is_vertex_mean() {
        let mut pts = square();
        // A duplicated vertex pulls the mean, unlike an area centroid
        pts.push(Point2D::new(2.0, 2.0));
        let c = mass_center(&pts);
        assert_relative_eq!(c.x, 1.2);
        assert_relative_eq!(c.y, 1.2);
    }

    #[test]
    fn bounds_of_square() {
        let bb = bounds_of(square().iter());
        assert_eq!(bb, BoundingBox::new(0.0, 2.0, 0.0, 2.0));
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(mass_center(&[]), Point2D::origin());
        assert!(bounds_of(std::iter::empty()).is_empty());
    }
}
