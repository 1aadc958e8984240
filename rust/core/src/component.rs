// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor plan components.
//!
//! Every component is a polygon (one or more vertices) tagged with the
//! kind-specific payload. Components refer to their floor by id only; the
//! floor owns them through its [`ComponentStore`](crate::store::ComponentStore)s.

use std::fmt;

use floorset_geometry::{mass_center, Line2D, Point2D, PropValue};

use crate::error::{Error, Result};

/// Discriminant of [`ComponentData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Rect,
    Point,
    Slab,
    Room,
    Item,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 5] = [
        ComponentKind::Rect,
        ComponentKind::Point,
        ComponentKind::Slab,
        ComponentKind::Room,
        ComponentKind::Item,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Rect => "rect",
            ComponentKind::Point => "point",
            ComponentKind::Slab => "slab",
            ComponentKind::Room => "room",
            ComponentKind::Item => "item",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wall segment payload.
#[derive(Debug, Clone)]
pub struct RectData {
    pub wall_id: u32,
    /// Segment angle in degrees, as stored in the dataset.
    pub angle: f64,
    pub length: f64,
    pub thickness: f64,
    /// Centerline of the segment.
    pub line: Line2D,
    pub partition: bool,
}

/// Wall joint marker payload.
#[derive(Debug, Clone)]
pub struct PointData {
    pub wall_id: u32,
    /// Topological order of the joint.
    pub topo: i64,
}

/// Categorized polygon payload (rooms and items).
#[derive(Debug, Clone, Default)]
pub struct PolyData {
    pub category: i64,
    pub category_name: String,
    /// Display color, `#rrggbb`.
    pub color: String,
}

#[derive(Debug, Clone)]
pub enum ComponentData {
    Rect(RectData),
    Point(PointData),
    Slab,
    Room(PolyData),
    Item(PolyData),
}

impl ComponentData {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Rect(_) => ComponentKind::Rect,
            ComponentData::Point(_) => ComponentKind::Point,
            ComponentData::Slab => ComponentKind::Slab,
            ComponentData::Room(_) => ComponentKind::Room,
            ComponentData::Item(_) => ComponentKind::Item,
        }
    }
}

/// A polygonal component owned by a floor.
#[derive(Debug, Clone)]
pub struct Component {
    id: u32,
    floor_id: u32,
    points: Vec<Point2D>,
    data: ComponentData,
}

impl Component {
    /// Builds a component from parallel coordinate lists.
    ///
    /// Ids must be positive and `x`, `y` must be non-empty and equally long.
    pub fn new(id: u32, floor_id: u32, x: &[f64], y: &[f64], data: ComponentData) -> Result<Self> {
        let kind = data.kind();
        if id == 0 {
            return Err(Error::validation(format!("{kind} id must be positive")));
        }
        if floor_id == 0 {
            return Err(Error::validation(format!(
                "{kind} {id} must reference a positive floor id"
            )));
        }
        if x.is_empty() {
            return Err(Error::validation(format!("{kind} {id} has no vertices")));
        }
        if x.len() != y.len() {
            return Err(Error::validation(format!(
                "{kind} {id} has {} x coordinates but {} y coordinates",
                x.len(),
                y.len()
            )));
        }
        match &data {
            ComponentData::Rect(rect) => {
                if rect.wall_id == 0 {
                    return Err(Error::validation(format!("rect {id} has wall id 0")));
                }
                if !(rect.length > 0.0) {
                    return Err(Error::validation(format!(
                        "rect {id} has non-positive length {}",
                        rect.length
                    )));
                }
            }
            ComponentData::Point(marker) if marker.wall_id == 0 => {
                return Err(Error::validation(format!("point {id} has wall id 0")));
            }
            _ => {}
        }

        let mut points: Vec<Point2D> = x
            .iter()
            .zip(y)
            .map(|(&px, &py)| Point2D::new(px, py))
            .collect();
        if let ComponentData::Point(marker) = &data {
            for p in &mut points {
                p.set_property("topo", Some(PropValue::Int(marker.topo)));
            }
        }

        Ok(Self {
            id,
            floor_id,
            points,
            data,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn floor_id(&self) -> u32 {
        self.floor_id
    }

    pub fn kind(&self) -> ComponentKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ComponentData {
        &self.data
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub(crate) fn points_mut(&mut self) -> &mut [Point2D] {
        &mut self.points
    }

    /// Wall segment payload, if this is a rect.
    pub fn as_rect(&self) -> Option<&RectData> {
        match &self.data {
            ComponentData::Rect(rect) => Some(rect),
            _ => None,
        }
    }

    /// Category payload of rooms and items.
    pub fn as_poly(&self) -> Option<&PolyData> {
        match &self.data {
            ComponentData::Room(poly) | ComponentData::Item(poly) => Some(poly),
            _ => None,
        }
    }

    /// Vertex mean of the polygon.
    pub fn mass_center(&self) -> Point2D {
        mass_center(&self.points)
    }
}
