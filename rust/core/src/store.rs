// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Insertion-ordered component storage with id lookup.

use rustc_hash::FxHashMap;

use crate::component::{Component, ComponentKind};
use crate::error::{Error, Result};

/// Components of one kind, iterated in insertion order.
#[derive(Debug, Clone)]
pub struct ComponentStore {
    kind: ComponentKind,
    items: Vec<Component>,
    index: FxHashMap<u32, usize>,
}

impl ComponentStore {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub(crate) fn insert(&mut self, component: Component) -> Result<()> {
        debug_assert_eq!(component.kind(), self.kind);
        if self.index.contains_key(&component.id()) {
            return Err(Error::DuplicateComponent {
                kind: self.kind,
                id: component.id(),
            });
        }
        self.index.insert(component.id(), self.items.len());
        self.items.push(component);
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Component> {
        self.index.get(&id).map(|&i| &self.items[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Component> {
        self.items.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a ComponentStore {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
