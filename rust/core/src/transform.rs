// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor mutation state: one composed rotation + anisotropic scale.

use floorset_geometry::Point2D;

/// The single transform currently applied to a floor's geometry.
///
/// Renderers read this before mapping model coordinates to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Transform {
    #[default]
    Identity,
    Mutated {
        /// Rotation in degrees about the model origin.
        angle: f64,
        sx: f64,
        sy: f64,
        /// Scale was applied before the rotation.
        scale_first: bool,
    },
}

impl Transform {
    /// Builds the state for the given parameters; `(0, 1, 1)` is the identity.
    pub fn new(angle: f64, sx: f64, sy: f64, scale_first: bool) -> Self {
        if angle == 0.0 && sx == 1.0 && sy == 1.0 {
            Transform::Identity
        } else {
            Transform::Mutated {
                angle,
                sx,
                sy,
                scale_first,
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }

    pub fn angle(&self) -> f64 {
        match self {
            Transform::Identity => 0.0,
            Transform::Mutated { angle, .. } => *angle,
        }
    }

    pub fn scale_x(&self) -> f64 {
        match self {
            Transform::Identity => 1.0,
            Transform::Mutated { sx, .. } => *sx,
        }
    }

    pub fn scale_y(&self) -> f64 {
        match self {
            Transform::Identity => 1.0,
            Transform::Mutated { sy, .. } => *sy,
        }
    }

    /// Transform that undoes this one: negated angle, reciprocal scales and
    /// the opposite application order.
    pub fn inverse(&self) -> Transform {
        match *self {
            Transform::Identity => Transform::Identity,
            Transform::Mutated {
                angle,
                sx,
                sy,
                scale_first,
            } => Transform::Mutated {
                angle: -angle,
                sx: 1.0 / sx,
                sy: 1.0 / sy,
                scale_first: !scale_first,
            },
        }
    }

    /// Applies the transform to one point, rotating about the origin.
    pub fn apply(&self, p: &mut Point2D) {
        let Transform::Mutated {
            angle,
            sx,
            sy,
            scale_first,
        } = *self
        else {
            return;
        };
        let origin = Point2D::origin();
        if !scale_first {
            p.rotate(&origin, angle);
        }
        p.scale_xy(sx, sy);
        if scale_first {
            p.rotate(&origin, angle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_parameters_are_identity() {
        assert!(Transform::new(0.0, 1.0, 1.0, true).is_identity());
        assert!(Transform::new(0.0, 1.0, 1.0, false).is_identity());
        assert!(!Transform::new(0.0, -1.0, 1.0, true).is_identity());
    }

    #[test]
    fn inverse_restores_point() {
        for scale_first in [true, false] {
            let t = Transform::new(33.0, -1.5, 0.4, scale_first);
            let mut p = Point2D::new(12.25, -3.5);
            t.apply(&mut p);
            t.inverse().apply(&mut p);
            assert_relative_eq!(p.x, 12.25, epsilon = 1e-9);
            assert_relative_eq!(p.y, -3.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn order_matters_for_anisotropic_scale() {
        let mut a = Point2D::new(1.0, 2.0);
        let mut b = a.clone();
        Transform::new(30.0, 2.0, 0.5, true).apply(&mut a);
        Transform::new(30.0, 2.0, 0.5, false).apply(&mut b);
        assert_ne!(a, b);
    }
}
