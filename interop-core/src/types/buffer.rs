//! Typed, reference-counted element buffers backing `Opaque` values.
//!
//! A [`Buffer`] is the payload of a vector or matrix crossing the boundary.
//! The element type is carried by the [`BufferData`] variant, so the declared
//! type and length always agree with the storage.
//!
//! # Sharing
//!
//! Buffers are reference counted so ingress can hand the same storage to
//! several readers without copying:
//!
//! | Method | Storage | Use Case |
//! |--------|---------|----------|
//! | [`Clone::clone`] | Deep copy | Value you intend to modify |
//! | [`Buffer::share`] | Aliased, read-only | Passing data on to another reader |
//! | [`Buffer::make_unique`] | Copies only if aliased | Explicit copy-before-modify |
//!
//! In-place writes through [`Buffer::data_mut`] fail with
//! [`ErrorKind::Aliased`](crate::types::ErrorKind::Aliased) while another
//! owner still observes the storage. Storage is released when the last owner
//! is dropped.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::error::{MarshalError, Result};
use crate::types::na::{is_na_integer, NA_REAL};
use crate::types::value::{Payload, TypedValue};

/// Element type of an `Opaque` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Logical,
    Integer,
    Double,
    Character,
    Raw,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Logical => "logical",
            ElementType::Integer => "integer",
            ElementType::Double => "double",
            ElementType::Character => "character",
            ElementType::Raw => "raw",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned element storage, one variant per element type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum BufferData {
    /// `None` is NA.
    Logical(Vec<Option<bool>>),
    /// `NA_INTEGER` is NA.
    Integer(Vec<i32>),
    /// `NA_REAL` is NA.
    Double(#[serde(with = "crate::types::na::serde_reals")] Vec<f64>),
    /// `None` is NA.
    Character(Vec<Option<String>>),
    Raw(Vec<u8>),
}

impl BufferData {
    pub fn element_type(&self) -> ElementType {
        match self {
            BufferData::Logical(_) => ElementType::Logical,
            BufferData::Integer(_) => ElementType::Integer,
            BufferData::Double(_) => ElementType::Double,
            BufferData::Character(_) => ElementType::Character,
            BufferData::Raw(_) => ElementType::Raw,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BufferData::Logical(v) => v.len(),
            BufferData::Integer(v) => v.len(),
            BufferData::Double(v) => v.len(),
            BufferData::Character(v) => v.len(),
            BufferData::Raw(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length-1 buffer holding the element at `index`, NA preserved.
    pub fn slice_one(&self, index: usize) -> Option<BufferData> {
        if index >= self.len() {
            return None;
        }
        Some(match self {
            BufferData::Logical(v) => BufferData::Logical(vec![v[index]]),
            BufferData::Integer(v) => BufferData::Integer(vec![v[index]]),
            BufferData::Double(v) => BufferData::Double(vec![v[index]]),
            BufferData::Character(v) => BufferData::Character(vec![v[index].clone()]),
            BufferData::Raw(v) => BufferData::Raw(vec![v[index]]),
        })
    }

    /// Overwrite the element at `index` with a scalar value.
    ///
    /// Accepts the matching scalar variant, `Null` as NA for logical and
    /// character data, integer data widened into a double buffer, or a
    /// length-1 `Opaque` of the same element type.
    pub fn set(&mut self, index: usize, value: &TypedValue) -> Result<()> {
        let len = self.len();
        if index >= len {
            return Err(MarshalError::index_out_of_range(index, len));
        }
        let expected = self.element_type();
        let mismatch = || MarshalError::type_mismatch(format!("{} scalar", expected), value.shape_name());

        if let Payload::Opaque(other) = value.payload() {
            if other.len() != 1 || other.element_type() != expected {
                return Err(mismatch());
            }
            match (self, other.data()) {
                (BufferData::Logical(v), BufferData::Logical(o)) => v[index] = o[0],
                (BufferData::Integer(v), BufferData::Integer(o)) => v[index] = o[0],
                (BufferData::Double(v), BufferData::Double(o)) => v[index] = o[0],
                (BufferData::Character(v), BufferData::Character(o)) => v[index] = o[0].clone(),
                (BufferData::Raw(v), BufferData::Raw(o)) => v[index] = o[0],
                _ => return Err(mismatch()),
            }
            return Ok(());
        }

        match (self, value.payload()) {
            (BufferData::Logical(v), Payload::Boolean(b)) => v[index] = Some(*b),
            (BufferData::Logical(v), Payload::Null) => v[index] = None,
            (BufferData::Integer(v), Payload::Integer(x)) => v[index] = *x,
            (BufferData::Double(v), Payload::Double(x)) => v[index] = *x,
            (BufferData::Double(v), Payload::Integer(x)) => {
                v[index] = if is_na_integer(*x) { NA_REAL } else { f64::from(*x) }
            }
            (BufferData::Character(v), Payload::String(s)) => v[index] = Some(s.clone()),
            (BufferData::Character(v), Payload::Null) => v[index] = None,
            (BufferData::Raw(v), Payload::Integer(x)) => {
                v[index] = u8::try_from(*x).map_err(|_| {
                    MarshalError::invalid_value(format!("{} does not fit in a raw byte", x))
                })?
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

/// Reference-counted element buffer.
///
/// `Clone` is a deep copy; use [`Buffer::share`] for an alias.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "BufferData", into = "BufferData")]
pub struct Buffer {
    data: Arc<BufferData>,
}

impl Buffer {
    pub fn new(data: BufferData) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Alias the same storage without copying.
    pub fn share(&self) -> Buffer {
        Buffer {
            data: Arc::clone(&self.data),
        }
    }

    /// True while another `Buffer` aliases this storage.
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Mutable access, refused while the storage is aliased.
    pub fn data_mut(&mut self) -> Result<&mut BufferData> {
        Arc::get_mut(&mut self.data).ok_or_else(MarshalError::aliased)
    }

    /// Mutable access, copying the storage first if it is aliased.
    pub fn make_unique(&mut self) -> &mut BufferData {
        Arc::make_mut(&mut self.data)
    }

    /// Take the storage out, copying only if it is still aliased.
    pub fn into_data(self) -> BufferData {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| (*shared).clone())
    }

    pub fn as_logicals(&self) -> Option<&[Option<bool>]> {
        match &*self.data {
            BufferData::Logical(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integers(&self) -> Option<&[i32]> {
        match &*self.data {
            BufferData::Integer(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match &*self.data {
            BufferData::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[Option<String>]> {
        match &*self.data {
            BufferData::Character(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match &*self.data {
            BufferData::Raw(v) => Some(v),
            _ => None,
        }
    }
}

impl Clone for Buffer {
    fn clone(&self) -> Self {
        Buffer::new((*self.data).clone())
    }
}

impl From<BufferData> for Buffer {
    fn from(data: BufferData) -> Self {
        Buffer::new(data)
    }
}

impl From<Buffer> for BufferData {
    fn from(buffer: Buffer) -> Self {
        buffer.into_data()
    }
}

macro_rules! impl_buffer_from_vec {
    ($ty:ty, $variant:ident) => {
        impl From<Vec<$ty>> for Buffer {
            #[inline]
            fn from(v: Vec<$ty>) -> Self {
                Buffer::new(BufferData::$variant(v))
            }
        }
    };
}

impl_buffer_from_vec!(Option<bool>, Logical);
impl_buffer_from_vec!(i32, Integer);
impl_buffer_from_vec!(f64, Double);
impl_buffer_from_vec!(Option<String>, Character);
impl_buffer_from_vec!(u8, Raw);
