//! The value representation crossing the boundary.
//!
//! A [`TypedValue`] is a closed sum of host shapes ([`Payload`]) plus the
//! [`AttributeStore`] it owns. `Clone` is a deep copy: the result shares no
//! storage with the original, including buffers nested inside sequences,
//! records and attributes. [`TypedValue::share`] is the zero-copy alternative
//! for read-only holders; in-place writes to shared buffers fail with
//! `Aliased` until [`TypedValue::make_unique`] copies them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::helpers::shape::read_extents;
use crate::types::attributes::{AttributeStore, AttributesMut, CLASS, DIM, NAMES};
use crate::types::buffer::{Buffer, BufferData};
use crate::types::error::{MarshalError, Result};
use crate::types::na::{is_na_integer, is_na_real};
use crate::types::record::Record;

/// Shape classification of a value, independent of its attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Sequence,
    Record,
    Opaque,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Sequence => "sequence",
            Kind::Record => "record",
            Kind::Opaque => "opaque",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data part of a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Null,
    Boolean(bool),
    Integer(i32),
    Double(#[serde(with = "crate::types::na::serde_real")] f64),
    String(String),
    Sequence(Vec<TypedValue>),
    Record(Record),
    Opaque(Buffer),
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::Null => Kind::Null,
            Payload::Boolean(_) => Kind::Boolean,
            Payload::Integer(_) => Kind::Integer,
            Payload::Double(_) => Kind::Double,
            Payload::String(_) => Kind::String,
            Payload::Sequence(_) => Kind::Sequence,
            Payload::Record(_) => Kind::Record,
            Payload::Opaque(_) => Kind::Opaque,
        }
    }

    fn share(&self) -> Payload {
        match self {
            Payload::Sequence(items) => Payload::Sequence(items.iter().map(TypedValue::share).collect()),
            Payload::Record(record) => {
                let mut shared = Record::new();
                for (name, value) in record.iter() {
                    shared.insert(name, value.share());
                }
                Payload::Record(shared)
            }
            Payload::Opaque(buffer) => Payload::Opaque(buffer.share()),
            scalar => scalar.clone(),
        }
    }
}

/// A dynamically-typed host value with its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ValueRepr", into = "ValueRepr")]
pub struct TypedValue {
    payload: Payload,
    attributes: AttributeStore,
}

#[derive(Serialize, Deserialize)]
struct ValueRepr {
    value: Payload,
    #[serde(default, skip_serializing_if = "AttributeStore::is_empty")]
    attributes: AttributeStore,
}

impl TryFrom<ValueRepr> for TypedValue {
    type Error = MarshalError;

    fn try_from(repr: ValueRepr) -> Result<Self> {
        let value = TypedValue {
            payload: repr.value,
            attributes: repr.attributes,
        };
        value.attributes.validate(value.length())?;
        Ok(value)
    }
}

impl From<TypedValue> for ValueRepr {
    fn from(value: TypedValue) -> Self {
        ValueRepr {
            value: value.payload,
            attributes: value.attributes,
        }
    }
}

impl Default for TypedValue {
    fn default() -> Self {
        TypedValue::null()
    }
}

impl TypedValue {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            attributes: AttributeStore::default(),
        }
    }

    pub fn null() -> Self {
        Self::new(Payload::Null)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(Payload::Boolean(value))
    }

    pub fn integer(value: i32) -> Self {
        Self::new(Payload::Integer(value))
    }

    pub fn double(value: f64) -> Self {
        Self::new(Payload::Double(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Payload::String(value.into()))
    }

    pub fn sequence(items: Vec<TypedValue>) -> Self {
        Self::new(Payload::Sequence(items))
    }

    pub fn record(record: Record) -> Self {
        Self::new(Payload::Record(record))
    }

    pub fn opaque(buffer: impl Into<Buffer>) -> Self {
        Self::new(Payload::Opaque(buffer.into()))
    }

    /// Character `Opaque` from plain strings.
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let data: Vec<Option<String>> = items.into_iter().map(|s| Some(s.into())).collect();
        Self::opaque(data)
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    pub fn into_parts(self) -> (Payload, AttributeStore) {
        (self.payload, self.attributes)
    }

    pub fn kind(&self) -> Kind {
        self.payload.kind()
    }

    /// Element count: 0 for `Null`, 1 for scalars, field count for records.
    pub fn length(&self) -> usize {
        match &self.payload {
            Payload::Null => 0,
            Payload::Boolean(_) | Payload::Integer(_) | Payload::Double(_) | Payload::String(_) => 1,
            Payload::Sequence(items) => items.len(),
            Payload::Record(record) => record.len(),
            Payload::Opaque(buffer) => buffer.len(),
        }
    }

    /// Kind name used in error messages, e.g. `opaque<double>`.
    pub fn shape_name(&self) -> String {
        match &self.payload {
            Payload::Opaque(buffer) => format!("opaque<{}>", buffer.element_type()),
            other => other.kind().to_string(),
        }
    }

    // Element access

    /// Element at `index`.
    ///
    /// `Opaque` elements come back as length-1 `Opaque` values so NA survives;
    /// a scalar is its own element 0.
    pub fn element(&self, index: usize) -> Result<TypedValue> {
        match &self.payload {
            Payload::Sequence(items) => items
                .get(index)
                .cloned()
                .ok_or_else(|| MarshalError::index_out_of_range(index, items.len())),
            Payload::Opaque(buffer) => buffer
                .data()
                .slice_one(index)
                .map(TypedValue::opaque)
                .ok_or_else(|| MarshalError::index_out_of_range(index, buffer.len())),
            Payload::Boolean(_) | Payload::Integer(_) | Payload::Double(_) | Payload::String(_) => {
                if index == 0 {
                    Ok(TypedValue::new(self.payload.clone()))
                } else {
                    Err(MarshalError::index_out_of_range(index, 1))
                }
            }
            Payload::Null => Err(MarshalError::index_out_of_range(index, 0)),
            Payload::Record(_) => Err(MarshalError::type_mismatch(
                "sequence, opaque or scalar",
                self.shape_name(),
            )),
        }
    }

    /// Mutable access to a `Sequence` item.
    pub fn element_mut(&mut self, index: usize) -> Result<&mut TypedValue> {
        let found = self.shape_name();
        match &mut self.payload {
            Payload::Sequence(items) => {
                let len = items.len();
                items
                    .get_mut(index)
                    .ok_or_else(|| MarshalError::index_out_of_range(index, len))
            }
            _ => Err(MarshalError::type_mismatch("sequence", found)),
        }
    }

    /// Overwrite the element at `index` in place.
    ///
    /// Fails with `Aliased` if the target buffer is shared with another
    /// owner; clone or [`make_unique`](Self::make_unique) first.
    pub fn set_element(&mut self, index: usize, value: TypedValue) -> Result<()> {
        let found = self.shape_name();
        match &mut self.payload {
            Payload::Sequence(items) => {
                let len = items.len();
                let slot = items
                    .get_mut(index)
                    .ok_or_else(|| MarshalError::index_out_of_range(index, len))?;
                *slot = value;
                Ok(())
            }
            Payload::Opaque(buffer) => {
                let len = buffer.len();
                if index >= len {
                    return Err(MarshalError::index_out_of_range(index, len));
                }
                buffer.data_mut()?.set(index, &value)
            }
            Payload::Null => Err(MarshalError::index_out_of_range(index, 0)),
            Payload::Record(_) => Err(MarshalError::type_mismatch("sequence, opaque or scalar", found)),
            scalar => {
                if index != 0 {
                    return Err(MarshalError::index_out_of_range(index, 1));
                }
                if value.kind() != scalar.kind() {
                    return Err(MarshalError::type_mismatch(found, value.shape_name()));
                }
                *scalar = value.payload;
                Ok(())
            }
        }
    }

    /// Items of a `Sequence`.
    pub fn items(&self) -> Result<&[TypedValue]> {
        match &self.payload {
            Payload::Sequence(items) => Ok(items),
            _ => Err(MarshalError::type_mismatch("sequence", self.shape_name())),
        }
    }

    // Record access

    pub fn as_record(&self) -> Result<&Record> {
        match &self.payload {
            Payload::Record(record) => Ok(record),
            _ => Err(MarshalError::type_mismatch("record", self.shape_name())),
        }
    }

    pub fn field(&self, name: &str) -> Result<&TypedValue> {
        let record = self.as_record()?;
        record
            .get(name)
            .ok_or_else(|| MarshalError::missing_name(name, record.len()))
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut TypedValue> {
        let found = self.shape_name();
        match &mut self.payload {
            Payload::Record(record) => {
                let len = record.len();
                record
                    .get_mut(name)
                    .ok_or_else(|| MarshalError::missing_name(name, len))
            }
            _ => Err(MarshalError::type_mismatch("record", found)),
        }
    }

    pub fn field_at(&self, index: usize) -> Result<(&str, &TypedValue)> {
        let record = self.as_record()?;
        record
            .get_index(index)
            .ok_or_else(|| MarshalError::index_out_of_range(index, record.len()))
    }

    /// Insert or overwrite a record field, returning the previous value.
    ///
    /// Adding a new field to a record that carries `dim` would resize it, so
    /// that fails with `ShapeMismatch`.
    pub fn set_field(&mut self, name: impl Into<String>, value: TypedValue) -> Result<Option<TypedValue>> {
        let name = name.into();
        let has_dim = self.attributes.contains(DIM);
        let found = self.shape_name();
        match &mut self.payload {
            Payload::Record(record) => {
                if has_dim && !record.contains(&name) {
                    return Err(MarshalError::shape_mismatch_at(
                        DIM,
                        format!("adding field `{}` would resize a value with dim", name),
                    ));
                }
                Ok(record.insert(name, value))
            }
            _ => Err(MarshalError::type_mismatch("record", found)),
        }
    }

    // Scalar accessors

    pub fn as_bool(&self) -> Result<bool> {
        match &self.payload {
            Payload::Boolean(b) => Ok(*b),
            Payload::Opaque(buffer) if buffer.len() == 1 => match buffer.data() {
                BufferData::Logical(v) => v[0].ok_or_else(|| MarshalError::na_value("bool")),
                _ => Err(MarshalError::type_mismatch("boolean", self.shape_name())),
            },
            _ => Err(MarshalError::type_mismatch("boolean", self.shape_name())),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        let x = match &self.payload {
            Payload::Integer(x) => *x,
            Payload::Opaque(buffer) if buffer.len() == 1 => match buffer.data() {
                BufferData::Integer(v) => v[0],
                _ => return Err(MarshalError::type_mismatch("integer", self.shape_name())),
            },
            _ => return Err(MarshalError::type_mismatch("integer", self.shape_name())),
        };
        if is_na_integer(x) {
            return Err(MarshalError::na_value("i32"));
        }
        Ok(x)
    }

    /// Read a double, widening integer data.
    pub fn as_f64(&self) -> Result<f64> {
        let x = match &self.payload {
            Payload::Double(x) => *x,
            Payload::Integer(x) if !is_na_integer(*x) => f64::from(*x),
            Payload::Opaque(buffer) if buffer.len() == 1 => match buffer.data() {
                BufferData::Double(v) => v[0],
                BufferData::Integer(v) if !is_na_integer(v[0]) => f64::from(v[0]),
                BufferData::Integer(_) => return Err(MarshalError::na_value("f64")),
                _ => return Err(MarshalError::type_mismatch("double", self.shape_name())),
            },
            Payload::Integer(_) => return Err(MarshalError::na_value("f64")),
            _ => return Err(MarshalError::type_mismatch("double", self.shape_name())),
        };
        if is_na_real(x) {
            return Err(MarshalError::na_value("f64"));
        }
        Ok(x)
    }

    pub fn as_str(&self) -> Result<&str> {
        match &self.payload {
            Payload::String(s) => Ok(s),
            Payload::Opaque(buffer) if buffer.len() == 1 => match buffer.data() {
                BufferData::Character(v) => v[0].as_deref().ok_or_else(|| MarshalError::na_value("str")),
                _ => Err(MarshalError::type_mismatch("string", self.shape_name())),
            },
            _ => Err(MarshalError::type_mismatch("string", self.shape_name())),
        }
    }

    // Borrowed buffer views

    pub fn as_buffer(&self) -> Result<&Buffer> {
        match &self.payload {
            Payload::Opaque(buffer) => Ok(buffer),
            _ => Err(MarshalError::type_mismatch("opaque", self.shape_name())),
        }
    }

    pub fn as_doubles(&self) -> Result<&[f64]> {
        self.as_buffer()?
            .as_doubles()
            .ok_or_else(|| MarshalError::type_mismatch("opaque<double>", self.shape_name()))
    }

    pub fn as_integers(&self) -> Result<&[i32]> {
        self.as_buffer()?
            .as_integers()
            .ok_or_else(|| MarshalError::type_mismatch("opaque<integer>", self.shape_name()))
    }

    pub fn as_logicals(&self) -> Result<&[Option<bool>]> {
        self.as_buffer()?
            .as_logicals()
            .ok_or_else(|| MarshalError::type_mismatch("opaque<logical>", self.shape_name()))
    }

    pub fn as_strings(&self) -> Result<&[Option<String>]> {
        self.as_buffer()?
            .as_strings()
            .ok_or_else(|| MarshalError::type_mismatch("opaque<character>", self.shape_name()))
    }

    pub fn as_raw(&self) -> Result<&[u8]> {
        self.as_buffer()?
            .as_raw()
            .ok_or_else(|| MarshalError::type_mismatch("opaque<raw>", self.shape_name()))
    }

    // Attributes

    pub fn attributes(&self) -> &AttributeStore {
        &self.attributes
    }

    /// Write handle validating `dim` against this value's length.
    pub fn attributes_mut(&mut self) -> AttributesMut<'_> {
        AttributesMut::new(self.length(), &mut self.attributes)
    }

    pub fn attr(&self, key: &str) -> Option<&TypedValue> {
        self.attributes.get(key)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: TypedValue) -> Result<Option<TypedValue>> {
        self.attributes_mut().set(key, value)
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    pub fn with_attr(mut self, key: impl Into<String>, value: TypedValue) -> Result<Self> {
        self.set_attr(key, value)?;
        Ok(self)
    }

    pub fn remove_attr(&mut self, key: &str) -> bool {
        self.attributes_mut().remove(key)
    }

    /// Class tags, primary first. Empty when no `class` attribute is set.
    pub fn class(&self) -> Vec<String> {
        self.attr(CLASS).map(string_list).unwrap_or_default()
    }

    pub fn inherits(&self, tag: &str) -> bool {
        self.class().iter().any(|c| c == tag)
    }

    /// Field names of a record, else the `names` attribute.
    pub fn names(&self) -> Option<Vec<String>> {
        match &self.payload {
            Payload::Record(record) => Some(record.names()),
            _ => self.attr(NAMES).map(string_list),
        }
    }

    pub fn dim(&self) -> Option<Vec<usize>> {
        self.attr(DIM).and_then(|d| read_extents(DIM, d).ok())
    }

    // Ownership

    /// Read-only alias: every nested buffer shares storage with `self`.
    pub fn share(&self) -> TypedValue {
        TypedValue {
            payload: self.payload.share(),
            attributes: self.attributes.share(),
        }
    }

    /// True if any nested buffer is aliased by another owner.
    pub fn is_shared(&self) -> bool {
        let payload_shared = match &self.payload {
            Payload::Sequence(items) => items.iter().any(TypedValue::is_shared),
            Payload::Record(record) => record.iter().any(|(_, v)| v.is_shared()),
            Payload::Opaque(buffer) => buffer.is_shared(),
            _ => false,
        };
        payload_shared || self.attributes.iter().any(|(_, v)| v.is_shared())
    }

    /// Copy every aliased buffer so that in-place writes become legal.
    pub fn make_unique(&mut self) {
        match &mut self.payload {
            Payload::Sequence(items) => items.iter_mut().for_each(TypedValue::make_unique),
            Payload::Record(record) => record.values_mut().for_each(TypedValue::make_unique),
            Payload::Opaque(buffer) => {
                buffer.make_unique();
            }
            _ => {}
        }
        self.attributes.values_mut().for_each(TypedValue::make_unique);
    }

    /// Re-check the `dim` invariant on this value and everything nested in it.
    pub fn validate(&self) -> Result<()> {
        self.attributes.validate(self.length())?;
        match &self.payload {
            Payload::Sequence(items) => items.iter().try_for_each(TypedValue::validate),
            Payload::Record(record) => record.iter().try_for_each(|(_, v)| v.validate()),
            _ => Ok(()),
        }
    }

    // JSON

    pub fn from_json(json: &str) -> Result<TypedValue> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Read a string-ish attribute value as a list of strings, skipping NA.
pub(crate) fn string_list(value: &TypedValue) -> Vec<String> {
    match value.payload() {
        Payload::String(s) => vec![s.clone()],
        Payload::Opaque(buffer) => buffer
            .as_strings()
            .map(|v| v.iter().flatten().cloned().collect())
            .unwrap_or_default(),
        Payload::Sequence(items) => items
            .iter()
            .filter_map(|item| match item.payload() {
                Payload::String(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.shape_name(), self.length())?;
        let class = self.class();
        if !class.is_empty() {
            write!(f, " class={}", class.join(","))?;
        }
        Ok(())
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::boolean(value)
    }
}

impl From<i32> for TypedValue {
    fn from(value: i32) -> Self {
        TypedValue::integer(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::double(value)
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::string(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::string(value)
    }
}

impl From<Record> for TypedValue {
    fn from(record: Record) -> Self {
        TypedValue::record(record)
    }
}

impl From<Buffer> for TypedValue {
    fn from(buffer: Buffer) -> Self {
        TypedValue::opaque(buffer)
    }
}

impl From<Vec<TypedValue>> for TypedValue {
    fn from(items: Vec<TypedValue>) -> Self {
        TypedValue::sequence(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::na::NA_REAL;

    #[test]
    fn length_follows_kind() {
        assert_eq!(TypedValue::null().length(), 0);
        assert_eq!(TypedValue::string("x").length(), 1);
        assert_eq!(TypedValue::opaque(vec![1u8, 2, 3]).length(), 3);
        let record = Record::from_fields([("a", TypedValue::null()), ("b", TypedValue::null())]).unwrap();
        assert_eq!(TypedValue::record(record).length(), 2);
    }

    #[test]
    fn element_access_checks_shape_and_range() {
        let v = TypedValue::opaque(vec![1.5, 2.5]);
        assert_eq!(v.element(1).unwrap().as_f64().unwrap(), 2.5);
        assert!(v.element(2).unwrap_err().is_index_out_of_range());
        let r = TypedValue::record(Record::new());
        assert!(r.element(0).unwrap_err().is_type_mismatch());
        assert!(v.field("x").unwrap_err().is_type_mismatch());
    }

    #[test]
    fn set_element_refuses_shared_buffer() {
        let mut a = TypedValue::opaque(vec![1, 2, 3]);
        let b = a.share();
        let err = a.set_element(0, TypedValue::integer(9)).unwrap_err();
        assert_eq!(err.error_type(), "aliased");

        a.make_unique();
        a.set_element(0, TypedValue::integer(9)).unwrap();
        assert_eq!(a.as_integers().unwrap(), &[9, 2, 3]);
        assert_eq!(b.as_integers().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn scalar_set_element_keeps_kind() {
        let mut v = TypedValue::integer(1);
        assert!(v.set_element(0, TypedValue::string("x")).unwrap_err().is_type_mismatch());
        v.set_element(0, TypedValue::integer(2)).unwrap();
        assert_eq!(v.as_i32().unwrap(), 2);
    }

    #[test]
    fn set_field_does_not_resize_dimensioned_record() {
        let record = Record::from_fields([("a", TypedValue::integer(1)), ("b", TypedValue::integer(2))]).unwrap();
        let mut v = TypedValue::record(record)
            .with_attr(DIM, TypedValue::opaque(vec![1, 2]))
            .unwrap();
        assert!(v.set_field("c", TypedValue::null()).unwrap_err().is_shape_mismatch());
        assert_eq!(v.set_field("a", TypedValue::integer(5)).unwrap(), Some(TypedValue::integer(1)));
    }

    #[test]
    fn class_and_inherits() {
        let v = TypedValue::opaque(vec![1.0])
            .with_attr(CLASS, TypedValue::strings(["POSIXct", "POSIXt"]))
            .unwrap();
        assert_eq!(v.class(), vec!["POSIXct".to_string(), "POSIXt".to_string()]);
        assert!(v.inherits("POSIXt"));
        assert!(!v.inherits("Date"));
    }

    #[test]
    fn na_scalars_are_reported() {
        let v = TypedValue::opaque(vec![NA_REAL]);
        assert_eq!(v.as_f64().unwrap_err().error_type(), "na_value");
        let v = TypedValue::opaque(vec![None::<bool>]);
        assert_eq!(v.as_bool().unwrap_err().error_type(), "na_value");
    }

    #[test]
    fn json_round_trip_keeps_attributes_and_na() {
        let v = TypedValue::opaque(vec![1.0, NA_REAL, 3.0, 4.0])
            .with_attr(DIM, TypedValue::opaque(vec![2, 2]))
            .unwrap();
        let json = v.to_json_pretty().unwrap();
        let back = TypedValue::from_json(&json).unwrap();
        assert_eq!(back.dim(), Some(vec![2, 2]));
        let data = back.as_doubles().unwrap();
        assert_eq!(data[0], 1.0);
        assert!(is_na_real(data[1]));
    }

    #[test]
    fn json_rejects_inconsistent_dim() {
        let json = r#"{
            "value": {"kind": "opaque", "value": {"type": "integer", "data": [1, 2, 3]}},
            "attributes": {"dim": {"value": {"kind": "opaque", "value": {"type": "integer", "data": [2, 2]}}}}
        }"#;
        let err = TypedValue::from_json(json).unwrap_err();
        assert_eq!(err.error_type(), "json_error");
    }

    #[test]
    fn json_null_needs_no_content() {
        let v = TypedValue::from_json(r#"{"value": {"kind": "null"}}"#).unwrap();
        assert_eq!(v.kind(), Kind::Null);
    }
}
