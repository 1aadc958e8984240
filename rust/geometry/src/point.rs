// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutable 2D point with tolerance-based equality.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{AddAssign, MulAssign, SubAssign};

use nalgebra::{Point2, Rotation2, Vector2};

use crate::properties::{PropValue, Properties};

/// Absolute tolerance used by point equality and on-line tests.
pub const MIN_TOL: f64 = 1e-12;

/// A point in model space (y grows upwards).
///
/// Transform methods mutate in place and return `&mut Self` so calls can be
/// chained: `p.rotate(&c, 45.0).scale(2.0)`.
#[derive(Debug, Clone, Default)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
    props: Properties,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            props: Properties::default(),
        }
    }

    /// The origin `(0, 0)`.
    pub fn origin() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: &Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Rotates the point around `center` by `angle` degrees.
    ///
    /// A zero angle leaves the coordinates untouched bit for bit.
    pub fn rotate(&mut self, center: &Point2D, angle: f64) -> &mut Self {
        if angle == 0.0 {
            return self;
        }
        let rotation = Rotation2::new(angle * PI / 180.0);
        let local = Vector2::new(self.x - center.x, self.y - center.y);
        let rotated = rotation * local;
        self.x = rotated.x + center.x;
        self.y = rotated.y + center.y;
        self
    }

    /// Multiplies both coordinates by `factor`.
    pub fn scale(&mut self, factor: f64) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self
    }

    /// Multiplies each axis by its own factor.
    pub fn scale_xy(&mut self, sx: f64, sy: f64) -> &mut Self {
        self.x *= sx;
        self.y *= sy;
        self
    }

    pub fn translate(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.x += dx;
        self.y += dy;
        self
    }

    pub fn set_zero(&mut self) {
        self.x = 0.0;
        self.y = 0.0;
    }

    /// Euclidean distance to `other`.
    pub fn dist(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Angle (radians) of the direction from `self` to `other`.
    ///
    /// Returns exactly `0.0` for coincident points instead of `atan2(0, 0)`.
    pub fn angle_to(&self, other: &Point2D) -> f64 {
        if self.x == other.x && self.y == other.y {
            return 0.0;
        }
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Stores a property. `None` values are ignored.
    pub fn set_property(&mut self, key: &str, value: Option<PropValue>) {
        if let Some(value) = value {
            self.props.insert(key.to_string(), value);
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.props.contains_key(key)
    }

    pub fn properties(&self) -> &Properties {
        &self.props
    }
}

impl PartialEq for Point2D {
    fn eq(&self, other: &Self) -> bool {
        (self.x - other.x).abs() <= MIN_TOL && (self.y - other.y).abs() <= MIN_TOL
    }
}

impl AddAssign<&Point2D> for Point2D {
    fn add_assign(&mut self, rhs: &Point2D) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign<&Point2D> for Point2D {
    fn sub_assign(&mut self, rhs: &Point2D) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl MulAssign<&Point2D> for Point2D {
    fn mul_assign(&mut self, rhs: &Point2D) {
        self.x *= rhs.x;
        self.y *= rhs.y;
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_rotation_is_exact_noop() {
        let mut p = Point2D::new(0.1 + 0.2, -7.3);
        let before = (p.x, p.y);
        p.rotate(&Point2D::new(3.0, 4.0), 0.0);
        assert_eq!(p.x.to_bits(), before.0.to_bits());
        assert_eq!(p.y.to_bits(), before.1.to_bits());
    }

    #[test]
    fn rotate_quarter_turn_about_center() {
        let mut p = Point2D::new(2.0, 1.0);
        p.rotate(&Point2D::new(1.0, 1.0), 90.0);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn rotate_then_scale_chains() {
        let mut p = Point2D::new(1.0, 0.0);
        p.rotate(&Point2D::origin(), 180.0).scale(3.0);
        assert_relative_eq!(p.x, -3.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn equality_tolerance() {
        let a = Point2D::new(1.0, 1.0);
        assert_eq!(a, Point2D::new(1.0 + 5e-13, 1.0 - 5e-13));
        assert_ne!(a, Point2D::new(1.0 + 1e-11, 1.0));
        assert_ne!(a, Point2D::new(1.0, 1.0 + 1e-11));

        // The tolerance itself still counts as equal
        let origin = Point2D::origin();
        assert_eq!(origin, Point2D::new(MIN_TOL, -MIN_TOL));
        assert_ne!(origin, Point2D::new(2.0 * MIN_TOL, 0.0));
    }

    #[test]
    fn angle_of_coincident_points_is_zero() {
        let a = Point2D::new(-0.0, 0.0);
        let b = Point2D::new(0.0, 0.0);
        assert_eq!(a.angle_to(&b), 0.0);
        assert_relative_eq!(
            Point2D::origin().angle_to(&Point2D::new(0.0, 1.0)),
            PI / 2.0
        );
    }

    #[test]
    fn distance() {
        assert_relative_eq!(Point2D::new(0.0, 0.0).dist(&Point2D::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn properties_survive_clone() {
        let mut p = Point2D::new(1.0, 2.0);
        p.set_property("topo", Some(PropValue::Int(3)));
        p.set_property("ignored", None);
        let q = p.clone();
        assert_eq!(q.property("topo"), Some(&PropValue::Int(3)));
        assert!(!q.has_property("ignored"));
    }

    #[test]
    fn operator_assign() {
        let mut p = Point2D::new(1.0, 2.0);
        p += &Point2D::new(1.0, 1.0);
        p *= &Point2D::new(2.0, 3.0);
        p -= &Point2D::new(4.0, 9.0);
        assert_eq!(p, Point2D::origin());
    }
}
