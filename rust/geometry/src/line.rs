// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Slope/intercept line with optional defining segment.

use std::fmt;

use crate::point::{Point2D, MIN_TOL};

/// Line `y = m·x + n` with its direction angle `theta` (radians).
///
/// Lines built from two points remember them for side/on queries. Lines
/// built from raw coefficients derive `f(0)` and `f(1)` on first use.
#[derive(Debug, Clone, Default)]
pub struct Line2D {
    pub m: f64,
    pub n: f64,
    pub theta: f64,
    def_points: Option<(Point2D, Point2D)>,
}

impl Line2D {
    pub fn from_coefficients(m: f64, n: f64, theta: f64) -> Self {
        Self {
            m,
            n,
            theta,
            def_points: None,
        }
    }

    /// Line through `p1` and `p2`.
    ///
    /// Vertical segments get `MIN_TOL` added to the run so the slope stays finite.
    pub fn from_points(p1: &Point2D, p2: &Point2D) -> Self {
        let rise = p2.y - p1.y;
        let run = p2.x - p1.x;
        let m = rise / (run + MIN_TOL);
        Self {
            m,
            n: p1.y - m * p1.x,
            theta: rise.atan2(run),
            def_points: Some((p1.clone(), p2.clone())),
        }
    }

    /// Evaluates `m·x + n`.
    pub fn eval(&self, x: f64) -> f64 {
        self.m * x + self.n
    }

    /// The point `(x, f(x))`.
    pub fn f(&self, x: f64) -> Point2D {
        Point2D::new(x, self.eval(x))
    }

    /// Defining points, derived from the coefficients when absent.
    pub fn defining_points(&mut self) -> &(Point2D, Point2D) {
        let (p1, p2) = (self.f(0.0), self.f(1.0));
        self.def_points.get_or_insert((p1, p2))
    }

    fn cross(&mut self, p: &Point2D) -> f64 {
        let (p1, p2) = self.defining_points();
        (p2.x - p1.x) * (p.y - p1.y) - (p2.y - p1.y) * (p.x - p1.x)
    }

    /// True if `p` lies strictly to the left of the defining segment.
    pub fn point_left(&mut self, p: &Point2D) -> bool {
        self.cross(p) > 0.0
    }

    /// True if `p` is collinear with the defining segment.
    pub fn point_on(&mut self, p: &Point2D) -> bool {
        self.cross(p).abs() < MIN_TOL
    }

    /// Orthogonal distance from `p` to the infinite line.
    pub fn ortho_distance_point(&self, p: &Point2D) -> f64 {
        let (a, b, c) = (-self.m, 1.0, -self.n);
        (a * p.x + b * p.y + c).abs() / (a * a + b * b).sqrt()
    }

    pub fn ortho_distance_points(&self, points: &[Point2D]) -> Vec<f64> {
        points.iter().map(|p| self.ortho_distance_point(p)).collect()
    }

    /// Distance to a parallel line.
    ///
    /// Non-parallel lines are at infinite distance unless `force` is set, in
    /// which case the gap between both intercepts is returned.
    pub fn ortho_distance_line(&self, other: &Line2D, force: bool) -> f64 {
        if (self.m.abs() - other.m.abs()).abs() > 1e-4 {
            if !force {
                return f64::INFINITY;
            }
            return (self.eval(0.0) - other.eval(0.0)).abs();
        }
        (self.n - other.n).abs() / (1.0 + self.m * self.m).sqrt()
    }
}

impl fmt::Display for Line2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "y = {}*x + {}. Theta: {}", self.m, self.n, self.theta)
    }
}
