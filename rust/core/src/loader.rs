// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dataset JSON loader.
//!
//! The document has top-level sections `meta`, `floor`, `rect`, `point`,
//! `slab`, `room` and `item`; every section except `meta` maps a string id
//! to an entry. Entries are read in document order so component iteration
//! follows the file. Floor image paths are relative to the JSON file.

use std::path::Path;

use floorset_geometry::Line2D;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::component::{Component, ComponentData, PointData, PolyData, RectData};
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::floor::Floor;

const DEFAULT_COLOR: &str = "#000000";

/// Options for [`Dataset::load_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Skip every component section.
    pub floor_only: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMeta {
    floor_categories: FxHashMap<String, i64>,
    item_types: FxHashMap<String, (i64, String)>,
    project_label: FxHashMap<String, String>,
    room_categories: FxHashMap<String, (i64, String)>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDataset {
    meta: RawMeta,
    floor: Map<String, Value>,
    rect: Map<String, Value>,
    point: Map<String, Value>,
    slab: Map<String, Value>,
    room: Map<String, Value>,
    item: Map<String, Value>,
}

/// A number, or a list whose first element is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Scalar {
    One(f64),
    Many(Vec<f64>),
}

impl Scalar {
    fn into_vec(self) -> Vec<f64> {
        match self {
            Scalar::One(v) => vec![v],
            Scalar::Many(v) => v,
        }
    }

    fn first(&self) -> Option<f64> {
        match self {
            Scalar::One(v) => Some(*v),
            Scalar::Many(v) => v.first().copied(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFloor {
    image: String,
    scale: f64,
    #[serde(default = "no_project")]
    project: i64,
    #[serde(default)]
    category: i64,
    #[serde(default)]
    elevation: bool,
}

fn no_project() -> i64 {
    -1
}

#[derive(Debug, Deserialize)]
struct RawRect {
    #[serde(rename = "wallID")]
    wall_id: u32,
    #[serde(rename = "floorID")]
    floor_id: u32,
    angle: Scalar,
    length: f64,
    thickness: f64,
    x: Vec<f64>,
    y: Vec<f64>,
    /// `[slope, intercept, theta]`
    line: Vec<f64>,
    #[serde(default)]
    partition: bool,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(rename = "wallID")]
    wall_id: u32,
    #[serde(rename = "floorID")]
    floor_id: u32,
    x: Scalar,
    y: Scalar,
    topo: i64,
}

#[derive(Debug, Deserialize)]
struct RawSlab {
    #[serde(rename = "floorID")]
    floor_id: u32,
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPoly {
    #[serde(rename = "floorID")]
    floor_id: u32,
    x: Vec<f64>,
    y: Vec<f64>,
    category: i64,
}

fn parse_id(section: &str, key: &str) -> Result<u32> {
    key.parse::<u32>()
        .map_err(|_| Error::validation(format!("{section} key {key:?} is not a positive integer id")))
}

fn entries<T: DeserializeOwned>(
    section: &'static str,
    map: Map<String, Value>,
) -> impl Iterator<Item = Result<(u32, T)>> {
    map.into_iter().map(move |(key, value)| {
        let id = parse_id(section, &key)?;
        let entry = serde_json::from_value::<T>(value)?;
        Ok((id, entry))
    })
}

impl Dataset {
    /// Loads a dataset file, including every component.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, LoadOptions::default())
    }

    pub fn load_with(path: impl AsRef<Path>, options: LoadOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::FileLoad {
                path: path.to_path_buf(),
            });
        }
        let root = path
            .canonicalize()?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let content = std::fs::read_to_string(path)?;
        let raw: RawDataset = serde_json::from_str(&content)?;
        drop(content);

        let mut db = Dataset::new(&root);
        let meta = raw.meta;
        db.floor_categories = meta
            .floor_categories
            .into_iter()
            .map(|(name, id)| (id, name))
            .collect();
        let project_labels: FxHashMap<i64, String> = meta
            .project_label
            .into_iter()
            .filter_map(|(pid, label)| pid.parse::<i64>().ok().map(|pid| (pid, label)))
            .collect();
        let item_types = invert_categories(meta.item_types);
        let room_categories = invert_categories(meta.room_categories);

        for entry in entries::<RawFloor>("floor", raw.floor) {
            let (id, f) = entry?;
            let mut floor = Floor::new(id, root.join(&f.image), f.scale)?;
            floor.project_id = f.project;
            floor.project_label = project_labels.get(&f.project).cloned().unwrap_or_default();
            floor.category = f.category;
            floor.category_name = db.floor_categories.get(&f.category).cloned().unwrap_or_default();
            floor.elevation = f.elevation;
            db.insert_floor(floor)?;
        }

        if options.floor_only {
            tracing::info!(floors = db.len(), path = %path.display(), "Loaded dataset floors");
            return Ok(db);
        }

        let mut counts = [0usize; 5];
        for entry in entries::<RawRect>("rect", raw.rect) {
            let (id, r) = entry?;
            let angle = r
                .angle
                .first()
                .ok_or_else(|| Error::validation(format!("rect {id} has an empty angle list")))?;
            if r.line.len() < 3 {
                return Err(Error::validation(format!(
                    "rect {id} line must be [m, n, theta], got {} values",
                    r.line.len()
                )));
            }
            let data = RectData {
                wall_id: r.wall_id,
                angle,
                length: r.length,
                thickness: r.thickness,
                line: Line2D::from_coefficients(r.line[0], r.line[1], r.line[2]),
                partition: r.partition,
            };
            let component = Component::new(id, r.floor_id, &r.x, &r.y, ComponentData::Rect(data))?;
            add_to_floor(&mut db, component)?;
            counts[0] += 1;
        }
        for entry in entries::<RawPoint>("point", raw.point) {
            let (id, p) = entry?;
            let data = PointData {
                wall_id: p.wall_id,
                topo: p.topo,
            };
            let (x, y) = (p.x.into_vec(), p.y.into_vec());
            let component = Component::new(id, p.floor_id, &x, &y, ComponentData::Point(data))?;
            add_to_floor(&mut db, component)?;
            counts[1] += 1;
        }
        for entry in entries::<RawSlab>("slab", raw.slab) {
            let (id, s) = entry?;
            let component = Component::new(id, s.floor_id, &s.x, &s.y, ComponentData::Slab)?;
            add_to_floor(&mut db, component)?;
            counts[2] += 1;
        }
        for entry in entries::<RawPoly>("room", raw.room) {
            let (id, r) = entry?;
            let data = categorized(&room_categories, r.category);
            let component = Component::new(id, r.floor_id, &r.x, &r.y, ComponentData::Room(data))?;
            add_to_floor(&mut db, component)?;
            counts[3] += 1;
        }
        for entry in entries::<RawPoly>("item", raw.item) {
            let (id, i) = entry?;
            let data = categorized(&item_types, i.category);
            let component = Component::new(id, i.floor_id, &i.x, &i.y, ComponentData::Item(data))?;
            add_to_floor(&mut db, component)?;
            counts[4] += 1;
        }

        tracing::info!(
            floors = db.len(),
            rects = counts[0],
            points = counts[1],
            slabs = counts[2],
            rooms = counts[3],
            items = counts[4],
            path = %path.display(),
            "Loaded dataset"
        );
        Ok(db)
    }
}

fn invert_categories(raw: FxHashMap<String, (i64, String)>) -> FxHashMap<i64, (String, String)> {
    raw.into_iter()
        .map(|(name, (id, color))| (id, (name, color)))
        .collect()
}

fn categorized(categories: &FxHashMap<i64, (String, String)>, category: i64) -> PolyData {
    match categories.get(&category) {
        Some((name, color)) => PolyData {
            category,
            category_name: name.clone(),
            color: color.clone(),
        },
        None => PolyData {
            category,
            category_name: String::new(),
            color: DEFAULT_COLOR.to_string(),
        },
    }
}

fn add_to_floor(db: &mut Dataset, component: Component) -> Result<()> {
    let floor_id = component.floor_id();
    db.floor_mut(floor_id)
        .ok_or(Error::UnknownFloor(floor_id))?
        .add(component)
}
