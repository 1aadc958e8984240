// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor registry keyed by floor id.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::floor::Floor;

type FloorFilter = Box<dyn Fn(&Floor) -> bool>;

/// Owns every floor of a dataset.
///
/// Components never point back at their floor; they carry the floor id and
/// callers resolve it here.
pub struct Dataset {
    path: PathBuf,
    floors: Vec<Floor>,
    index: FxHashMap<u32, usize>,
    pub(crate) floor_categories: FxHashMap<i64, String>,
    filter: Option<FloorFilter>,
    filtered: RefCell<Option<Vec<usize>>>,
}

impl Dataset {
    /// Empty dataset rooted at `path` (the directory image paths are relative to).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            floors: Vec::new(),
            index: FxHashMap::default(),
            floor_categories: FxHashMap::default(),
            filter: None,
            filtered: RefCell::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registers a floor. Ids must be unique.
    pub fn insert_floor(&mut self, floor: Floor) -> Result<&mut Floor> {
        let id = floor.id();
        if self.index.contains_key(&id) {
            return Err(Error::validation(format!("duplicate floor id {id}")));
        }
        let slot = self.floors.len();
        self.index.insert(id, slot);
        self.floors.push(floor);
        self.filtered.replace(None);
        Ok(&mut self.floors[slot])
    }

    /// Adds a floor outside any project, numbered after the existing ones.
    pub fn add_floor(
        &mut self,
        image: impl AsRef<Path>,
        scale: f64,
        category: i64,
        elevation: bool,
    ) -> Result<&mut Floor> {
        let id = u32::try_from(self.floors.len() + 1)
            .map_err(|_| Error::validation("too many floors"))?;
        let mut floor = Floor::new(id, image, scale)?;
        floor.category = category;
        floor.category_name = self.floor_categories.get(&category).cloned().unwrap_or_default();
        floor.elevation = elevation;
        self.insert_floor(floor)
    }

    pub fn floor(&self, id: u32) -> Option<&Floor> {
        self.index.get(&id).map(|&i| &self.floors[i])
    }

    pub fn floor_mut(&mut self, id: u32) -> Option<&mut Floor> {
        self.index.get(&id).map(|&i| &mut self.floors[i])
    }

    /// Like [`Dataset::floor`], but a missing id is an error.
    pub fn get(&self, id: u32) -> Result<&Floor> {
        self.floor(id).ok_or(Error::UnknownFloor(id))
    }

    /// Floors passing the active filter, in load order.
    pub fn floors(&self) -> Vec<&Floor> {
        let mut cached = self.filtered.borrow_mut();
        let indices = cached.get_or_insert_with(|| {
            self.floors
                .iter()
                .enumerate()
                .filter(|(_, f)| self.filter.as_ref().map_or(true, |keep| keep(*f)))
                .map(|(i, _)| i)
                .collect()
        });
        indices.iter().map(|&i| &self.floors[i]).collect()
    }

    /// Every floor regardless of the filter.
    pub fn all_floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn all_floors_mut(&mut self) -> &mut [Floor] {
        &mut self.floors
    }

    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&Floor) -> bool + 'static,
    {
        self.filter = Some(Box::new(filter));
        self.filtered.replace(None);
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.filtered.replace(None);
    }

    /// Smallest and largest image scale among the filtered floors.
    pub fn scale_limits(&self) -> Option<(f64, f64)> {
        self.floors().iter().fold(None, |acc, f| {
            let s = f.image_scale();
            Some(match acc {
                None => (s, s),
                Some((lo, hi)) => (lo.min(s), hi.max(s)),
            })
        })
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("path", &self.path)
            .field("floors", &self.floors.len())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
