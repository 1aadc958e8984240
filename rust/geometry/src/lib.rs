// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floorset Geometry
//!
//! Small set of 2D primitives used by the floor plan dataset: mutable points
//! with a metadata bag, slope/intercept lines and axis-aligned bounding boxes.
//! Angles passed to rotations are in degrees, counter-clockwise positive
//! (y-up math convention).

pub mod bounds;
pub mod line;
pub mod point;
pub mod polygon;
pub mod properties;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Vector2};

pub use bounds::BoundingBox;
pub use line::Line2D;
pub use point::{Point2D, MIN_TOL};
pub use polygon::{bounds_of, mass_center};
pub use properties::{PropValue, Properties};
