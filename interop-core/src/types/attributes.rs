//! Ordered attribute metadata attached to a value.
//!
//! An [`AttributeStore`] is owned by exactly one [`TypedValue`] and lives as
//! long as it does. Reads go through the store directly; writes go through
//! [`AttributesMut`], which knows the owner's length and validates `dim` at
//! `set` time. A rejected `set` leaves the store untouched.
//!
//! Mutation needs `&mut` on the owning value, so the borrow checker rules out
//! writing to a store while a `keys()`/`iter()` borrow of it is alive.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::helpers::shape::{check_extents, read_extents};
use crate::types::error::Result;
use crate::types::value::TypedValue;

/// Element or field labels.
pub const NAMES: &str = "names";
/// Shape as an integer sequence; product must equal the owner's length.
pub const DIM: &str = "dim";
/// Ordered class tags, first is primary.
pub const CLASS: &str = "class";

/// Ordered mapping from attribute key to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeStore {
    entries: IndexMap<String, TypedValue>,
}

impl AttributeStore {
    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Snapshot of the keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the `dim` invariant against an owner of length `owner_len`.
    pub fn validate(&self, owner_len: usize) -> Result<()> {
        if let Some(dim) = self.entries.get(DIM) {
            let extents = read_extents(DIM, dim)?;
            check_extents(DIM, &extents, owner_len)?;
        }
        for value in self.entries.values() {
            value.validate()?;
        }
        Ok(())
    }

    pub(crate) fn share(&self) -> AttributeStore {
        AttributeStore {
            entries: self
                .entries
                .iter()
                .map(|(key, value)| (key.clone(), value.share()))
                .collect(),
        }
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut TypedValue> {
        self.entries.values_mut()
    }
}

/// Write handle for an [`AttributeStore`], bound to its owner's length.
#[derive(Debug)]
pub struct AttributesMut<'a> {
    owner_len: usize,
    store: &'a mut AttributeStore,
}

impl<'a> AttributesMut<'a> {
    pub(crate) fn new(owner_len: usize, store: &'a mut AttributeStore) -> Self {
        Self { owner_len, store }
    }

    /// Insert or overwrite `key`, returning the previous value.
    ///
    /// New keys are appended; overwritten keys keep their position. Setting
    /// `dim` fails with `ShapeMismatch` unless its product equals the owner's
    /// length.
    pub fn set(&mut self, key: impl Into<String>, value: TypedValue) -> Result<Option<TypedValue>> {
        let key = key.into();
        if key == DIM {
            let extents = read_extents(DIM, &value)?;
            check_extents(DIM, &extents, self.owner_len)?;
        }
        Ok(self.store.entries.insert(key, value))
    }

    /// Remove `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.store.entries.shift_remove(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&TypedValue> {
        self.store.get(key)
    }
}
