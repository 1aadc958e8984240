// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Floorset Core
//!
//! Entity graph for annotated floor plans: floors own their walls (rects),
//! wall-end markers (points), slabs, rooms and items, and every floor can be
//! rotated and scaled about the model origin with a single undoable mutator.
//!
//! ## Overview
//!
//! - **Components**: polygon-shaped annotations with kind-specific data
//! - **Floors**: per-kind component stores, lazy bounding box, mutator state
//! - **Dataset**: floor registry with an optional view filter
//! - **Loader**: reads the dataset JSON document
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use floorset_core::Dataset;
//!
//! let mut db = Dataset::load("dataset/fp.json")?;
//! let floor = db.floor_mut(302).unwrap();
//! floor.mutate(45.0, 1.0, 1.0, true)?;
//! println!("{}", floor.bounding_box());
//! floor.reset();
//! ```

pub mod component;
pub mod dataset;
pub mod error;
pub mod floor;
pub mod loader;
pub mod store;
pub mod transform;

pub use component::{Component, ComponentData, ComponentKind, PointData, PolyData, RectData};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use floor::Floor;
pub use loader::LoadOptions;
pub use store::ComponentStore;
pub use transform::Transform;
