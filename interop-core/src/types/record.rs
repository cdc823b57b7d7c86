//! Ordered records with unique field names.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::error::{MarshalError, Result};
use crate::types::value::TypedValue;

/// Ordered mapping from field name to value.
///
/// Field names are unique; insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, TypedValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs, rejecting repeated names.
    pub fn from_fields<I, K>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, TypedValue)>,
        K: Into<String>,
    {
        let mut record = Record::new();
        for (name, value) in fields {
            record.push(name, value)?;
        }
        Ok(record)
    }

    /// Append a new field. Fails with `DuplicateField` if the name exists.
    pub fn push(&mut self, name: impl Into<String>, value: TypedValue) -> Result<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(MarshalError::duplicate_field(name));
        }
        self.fields.insert(name, value);
        Ok(())
    }

    /// Insert or overwrite a field, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: TypedValue) -> Option<TypedValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypedValue> {
        self.fields.get_mut(name)
    }

    pub fn get_index(&self, index: usize) -> Option<(&str, &TypedValue)> {
        self.fields
            .get_index(index)
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut TypedValue> {
        self.fields.get_index_mut(index).map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypedValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut TypedValue> {
        self.fields.values_mut()
    }

    /// Take a required field out of the record.
    pub fn take(&mut self, name: &str) -> Result<TypedValue> {
        let len = self.fields.len();
        self.fields
            .shift_remove(name)
            .ok_or_else(|| MarshalError::missing_name(name, len))
    }
}

impl IntoIterator for Record {
    type Item = (String, TypedValue);
    type IntoIter = indexmap::map::IntoIter<String, TypedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
