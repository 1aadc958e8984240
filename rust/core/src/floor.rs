// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor: container of one level's components and its raster image.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use floorset_geometry::{bounds_of, BoundingBox};

use crate::component::{Component, ComponentKind};
use crate::error::{Error, Result};
use crate::store::ComponentStore;
use crate::transform::Transform;

/// One architectural level.
///
/// Owns five component stores and tracks the mutation currently applied to
/// their vertices. The bounding box is computed lazily from rects and slabs
/// and invalidated by every [`Floor::mutate`] call.
#[derive(Debug, Clone)]
pub struct Floor {
    id: u32,
    image_path: PathBuf,
    image_scale: f64,
    pub project_id: i64,
    pub project_label: String,
    pub category: i64,
    pub category_name: String,
    pub elevation: bool,
    rect: ComponentStore,
    point: ComponentStore,
    slab: ComponentStore,
    room: ComponentStore,
    item: ComponentStore,
    transform: Transform,
    bbox: Cell<Option<BoundingBox>>,
}

impl Floor {
    /// Creates an empty floor.
    ///
    /// `image_path` must name an existing file and `image_scale`
    /// (pixels per model unit) must be positive.
    pub fn new(id: u32, image_path: impl AsRef<Path>, image_scale: f64) -> Result<Self> {
        if id == 0 {
            return Err(Error::validation("floor id must be positive"));
        }
        if !(image_scale > 0.0) || !image_scale.is_finite() {
            return Err(Error::validation(format!(
                "floor {id} image scale must be positive, got {image_scale}"
            )));
        }
        let image_path = PathBuf::from(image_path.as_ref().to_string_lossy().replace('\\', "/"));
        if !image_path.is_file() {
            return Err(Error::FileLoad { path: image_path });
        }
        Ok(Self {
            id,
            image_path,
            image_scale,
            project_id: -1,
            project_label: String::new(),
            category: 0,
            category_name: String::new(),
            elevation: false,
            rect: ComponentStore::new(ComponentKind::Rect),
            point: ComponentStore::new(ComponentKind::Point),
            slab: ComponentStore::new(ComponentKind::Slab),
            room: ComponentStore::new(ComponentKind::Room),
            item: ComponentStore::new(ComponentKind::Item),
            transform: Transform::Identity,
            bbox: Cell::new(None),
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Pixels per model unit of the source image.
    pub fn image_scale(&self) -> f64 {
        self.image_scale
    }

    /// Adds a component to the store matching its kind.
    pub fn add(&mut self, component: Component) -> Result<()> {
        if component.floor_id() != self.id {
            return Err(Error::ForeignComponent {
                kind: component.kind(),
                id: component.id(),
                expected: component.floor_id(),
                actual: self.id,
            });
        }
        self.bbox.set(None);
        self.store_mut(component.kind()).insert(component)
    }

    pub fn store(&self, kind: ComponentKind) -> &ComponentStore {
        match kind {
            ComponentKind::Rect => &self.rect,
            ComponentKind::Point => &self.point,
            ComponentKind::Slab => &self.slab,
            ComponentKind::Room => &self.room,
            ComponentKind::Item => &self.item,
        }
    }

    fn store_mut(&mut self, kind: ComponentKind) -> &mut ComponentStore {
        match kind {
            ComponentKind::Rect => &mut self.rect,
            ComponentKind::Point => &mut self.point,
            ComponentKind::Slab => &mut self.slab,
            ComponentKind::Room => &mut self.room,
            ComponentKind::Item => &mut self.item,
        }
    }

    /// Wall segments.
    pub fn rects(&self) -> &ComponentStore {
        &self.rect
    }

    /// Wall joints.
    pub fn points(&self) -> &ComponentStore {
        &self.point
    }

    pub fn slabs(&self) -> &ComponentStore {
        &self.slab
    }

    pub fn rooms(&self) -> &ComponentStore {
        &self.room
    }

    pub fn items(&self) -> &ComponentStore {
        &self.item
    }

    pub fn rect(&self, id: u32) -> Option<&Component> {
        self.rect.get(id)
    }

    /// The mutation currently applied to every vertex of this floor.
    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn mutator_angle(&self) -> f64 {
        self.transform.angle()
    }

    pub fn mutator_scale_x(&self) -> f64 {
        self.transform.scale_x()
    }

    pub fn mutator_scale_y(&self) -> f64 {
        self.transform.scale_y()
    }

    /// Replaces the active mutation with `(angle, sx, sy)`.
    ///
    /// Any previous mutation is undone first, so calls do not compose:
    /// `mutate(45, ..)` followed by `mutate(45, ..)` leaves the floor rotated
    /// by 45 degrees, not 90. With `scale_first` the scale is applied before
    /// the rotation. [`Floor::reset`] is `mutate(0, 1, 1, true)`.
    pub fn mutate(&mut self, angle: f64, sx: f64, sy: f64, scale_first: bool) -> Result<&mut Self> {
        if !angle.is_finite() {
            return Err(Error::validation(format!("mutator angle must be finite, got {angle}")));
        }
        if sx == 0.0 || sy == 0.0 || !sx.is_finite() || !sy.is_finite() {
            return Err(Error::validation(format!(
                "mutator scales must be finite and non-zero, got ({sx}, {sy})"
            )));
        }

        if !self.transform.is_identity() {
            let undo = self.transform.inverse();
            self.transform = Transform::Identity;
            self.apply(&undo);
        }

        let next = Transform::new(angle, sx, sy, scale_first);
        self.apply(&next);
        self.transform = next;
        self.bbox.set(None);

        tracing::debug!(
            floor_id = self.id,
            angle,
            sx,
            sy,
            scale_first,
            "Floor mutated"
        );
        Ok(self)
    }

    /// Undoes any active mutation.
    pub fn reset(&mut self) -> &mut Self {
        if !self.transform.is_identity() {
            let undo = self.transform.inverse();
            self.apply(&undo);
            self.transform = Transform::Identity;
            self.bbox.set(None);
        }
        self
    }

    fn apply(&mut self, transform: &Transform) {
        if transform.is_identity() {
            return;
        }
        for kind in ComponentKind::ALL {
            for component in self.store_mut(kind).iter_mut() {
                for p in component.points_mut() {
                    transform.apply(p);
                }
            }
        }
    }

    /// Bounds of all rect and slab vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        if let Some(bb) = self.bbox.get() {
            return bb;
        }
        let bb = bounds_of(
            self.rect
                .iter()
                .chain(self.slab.iter())
                .flat_map(|c| c.points().iter()),
        );
        self.bbox.set(Some(bb));
        bb
    }
}
