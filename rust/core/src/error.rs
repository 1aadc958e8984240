// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the floor entity graph.

use std::path::PathBuf;

use crate::component::ComponentKind;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or mutating the floor graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed constructor or mutator arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// A floor image path does not point to an existing file.
    #[error("image file {} does not exist", path.display())]
    FileLoad { path: PathBuf },

    /// A component or lookup referenced a floor that is not registered.
    #[error("floor {0} not found")]
    UnknownFloor(u32),

    /// Two components of the same kind share an id within one floor.
    #[error("duplicate {kind} id {id}")]
    DuplicateComponent { kind: ComponentKind, id: u32 },

    /// A component was added to a floor other than the one it references.
    #[error("{kind} {id} references floor {expected}, not floor {actual}")]
    ForeignComponent {
        kind: ComponentKind,
        id: u32,
        expected: u32,
        actual: u32,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid dataset JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
