// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for crop rendering and export.

use std::path::PathBuf;

/// Result type alias for imaging operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed configuration or render arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// A floor image is missing or cannot be decoded.
    #[error("cannot load image {}: {reason}", path.display())]
    FileLoad { path: PathBuf, reason: String },

    /// The crop window produced an inconsistent copy region.
    #[error(
        "shape inconsistency on floor {floor_id}{}: {detail}",
        .component_id.map(|id| format!(" at rect {id}")).unwrap_or_default()
    )]
    Shape {
        floor_id: u32,
        component_id: Option<u32>,
        detail: String,
    },

    /// The renderer was used before `init()` or after `close()`.
    #[error("renderer not initialized: {0}")]
    NotInitialized(&'static str),

    /// A crop name was looked up before being rendered.
    #[error("file <{0}> has not been processed yet")]
    NotProcessed(String),

    #[error("nothing to export")]
    EmptyExport,

    #[error(transparent)]
    Core(#[from] floorset_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("index error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
