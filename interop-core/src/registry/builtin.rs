//! Built-in converters: scalars, flat sequences, rectangular buffers.
//!
//! Projections accept every natural host encoding of a shape: the scalar
//! variant, a length-1 `Opaque`, an `Opaque` of the element type, a
//! `Sequence` of scalars and `Null` as the empty sequence. Integer data widens
//! to double; double data narrows to integer only when exact. NA reaching a
//! non-`Option` target fails with `NaValue`.
//!
//! Lifts attach no attributes, except `dim` on matrices.

use crate::helpers::coerce::TryCoerce;
use crate::helpers::shape::{extents_value, matrix_dim};
use crate::registry::{ConversionRegistry, Convert, Converter};
use crate::types::{
    is_na_integer, is_na_real, Buffer, BufferData, MarshalError, Matrix, Payload, Record, Result,
    TypedValue, DIM, NA_INTEGER, NA_REAL,
};

pub(crate) fn install(registry: &mut ConversionRegistry) {
    macro_rules! builtin {
        ($($ty:ty),* $(,)?) => {
            $( registry.insert_builtin(Converter::<$ty>::of()); )*
        };
    }

    builtin!(
        bool,
        i32,
        f64,
        String,
        Vec<bool>,
        Vec<i32>,
        Vec<f64>,
        Vec<String>,
        Vec<u8>,
        Vec<Option<bool>>,
        Vec<Option<i32>>,
        Vec<Option<f64>>,
        Vec<Option<String>>,
        Matrix<f64>,
        Matrix<i32>,
        TypedValue,
        Record,
    );
}

/// Element type of a flat sequence, read NA-aware.
trait Element: Sized {
    const NAME: &'static str;

    /// Read one scalar item. `Null` is NA.
    fn from_item(item: &TypedValue) -> Result<Option<Self>>;

    /// Read a whole buffer, `None` on incompatible element type.
    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>>;

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer;

    fn into_scalar(self) -> TypedValue;
}

fn single<E: Element>(item: &TypedValue) -> Result<Option<E>> {
    match item.payload() {
        Payload::Null => Ok(None),
        Payload::Opaque(buffer) if buffer.len() == 1 => {
            let mut values = E::from_buffer(buffer)
                .ok_or_else(|| MarshalError::type_mismatch(E::NAME, item.shape_name()))??;
            Ok(values.pop().flatten())
        }
        _ => Err(MarshalError::type_mismatch(E::NAME, item.shape_name())),
    }
}

impl Element for bool {
    const NAME: &'static str = "logical";

    fn from_item(item: &TypedValue) -> Result<Option<Self>> {
        match item.payload() {
            Payload::Boolean(b) => Ok(Some(*b)),
            _ => single(item),
        }
    }

    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>> {
        buffer.as_logicals().map(|v| Ok(v.to_vec()))
    }

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer {
        Buffer::from(values)
    }

    fn into_scalar(self) -> TypedValue {
        TypedValue::boolean(self)
    }
}

fn narrow(x: f64) -> Result<Option<i32>> {
    if is_na_real(x) {
        return Ok(None);
    }
    Ok(Some(TryCoerce::<i32>::try_coerce(x)?))
}

fn widen(x: i32) -> Option<f64> {
    (!is_na_integer(x)).then(|| f64::from(x))
}

impl Element for i32 {
    const NAME: &'static str = "integer";

    fn from_item(item: &TypedValue) -> Result<Option<Self>> {
        match item.payload() {
            Payload::Integer(x) => Ok((!is_na_integer(*x)).then_some(*x)),
            Payload::Double(x) => narrow(*x),
            _ => single(item),
        }
    }

    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>> {
        match buffer.data() {
            BufferData::Integer(v) => Some(Ok(v
                .iter()
                .map(|&x| (!is_na_integer(x)).then_some(x))
                .collect())),
            BufferData::Double(v) => Some(v.iter().map(|&x| narrow(x)).collect()),
            _ => None,
        }
    }

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer {
        Buffer::from(
            values
                .into_iter()
                .map(|x| x.unwrap_or(NA_INTEGER))
                .collect::<Vec<i32>>(),
        )
    }

    fn into_scalar(self) -> TypedValue {
        TypedValue::integer(self)
    }
}

impl Element for f64 {
    const NAME: &'static str = "double";

    fn from_item(item: &TypedValue) -> Result<Option<Self>> {
        match item.payload() {
            Payload::Double(x) => Ok((!is_na_real(*x)).then_some(*x)),
            Payload::Integer(x) => Ok(widen(*x)),
            _ => single(item),
        }
    }

    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>> {
        match buffer.data() {
            BufferData::Double(v) => Some(Ok(v
                .iter()
                .map(|&x| (!is_na_real(x)).then_some(x))
                .collect())),
            BufferData::Integer(v) => Some(Ok(v.iter().map(|&x| widen(x)).collect())),
            _ => None,
        }
    }

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer {
        Buffer::from(
            values
                .into_iter()
                .map(|x| x.unwrap_or(NA_REAL))
                .collect::<Vec<f64>>(),
        )
    }

    fn into_scalar(self) -> TypedValue {
        TypedValue::double(self)
    }
}

impl Element for String {
    const NAME: &'static str = "character";

    fn from_item(item: &TypedValue) -> Result<Option<Self>> {
        match item.payload() {
            Payload::String(s) => Ok(Some(s.clone())),
            _ => single(item),
        }
    }

    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>> {
        buffer.as_strings().map(|v| Ok(v.to_vec()))
    }

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer {
        Buffer::from(values)
    }

    fn into_scalar(self) -> TypedValue {
        TypedValue::string(self)
    }
}

impl Element for u8 {
    const NAME: &'static str = "raw";

    fn from_item(item: &TypedValue) -> Result<Option<Self>> {
        match item.payload() {
            Payload::Integer(x) if !is_na_integer(*x) => u8::try_from(*x)
                .map(Some)
                .map_err(|_| MarshalError::invalid_value(format!("{} does not fit in a raw byte", x))),
            _ => single(item),
        }
    }

    fn from_buffer(buffer: &Buffer) -> Option<Result<Vec<Option<Self>>>> {
        buffer.as_raw().map(|v| Ok(v.iter().copied().map(Some).collect()))
    }

    fn into_buffer(values: Vec<Option<Self>>) -> Buffer {
        // raw has no NA; lifts only ever pass Some
        Buffer::from(values.into_iter().map(|x| x.unwrap_or(0)).collect::<Vec<u8>>())
    }

    fn into_scalar(self) -> TypedValue {
        TypedValue::opaque(vec![self])
    }
}

/// Read every element of `value` as `E`, NA as `None`.
fn read_all<E: Element>(value: &TypedValue) -> Result<Vec<Option<E>>> {
    match value.payload() {
        Payload::Null => Ok(Vec::new()),
        Payload::Opaque(buffer) => E::from_buffer(buffer)
            .ok_or_else(|| MarshalError::type_mismatch(format!("opaque<{}>", E::NAME), value.shape_name()))?,
        Payload::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| E::from_item(item).map_err(|e| e.with_context(format!("element {}", i))))
            .collect(),
        Payload::Record(_) => Err(MarshalError::type_mismatch(
            format!("{} sequence", E::NAME),
            value.shape_name(),
        )),
        _ => Ok(vec![E::from_item(value)?]),
    }
}

fn require_all<E: Element>(values: Vec<Option<E>>) -> Result<Vec<E>> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| MarshalError::na_value(format!("element {} of {} data", i, E::NAME))))
        .collect()
}

fn read_scalar<E: Element>(value: &TypedValue) -> Result<E> {
    let mut values = read_all::<E>(value)?;
    if values.len() != 1 {
        return Err(MarshalError::shape_mismatch(format!(
            "expected a single {} value, found length {}",
            E::NAME,
            values.len()
        )));
    }
    values
        .pop()
        .flatten()
        .ok_or_else(|| MarshalError::na_value(format!("{} scalar", E::NAME)))
}

macro_rules! impl_builtin_scalar {
    ($($ty:ty),*) => {
        $(
            impl Convert for $ty {
                fn project(value: &TypedValue) -> Result<Self> {
                    read_scalar::<$ty>(value)
                }

                fn lift(self) -> Result<TypedValue> {
                    Ok(Element::into_scalar(self))
                }
            }
        )*
    };
}

impl_builtin_scalar!(bool, i32, f64, String);

macro_rules! impl_builtin_vec {
    ($($ty:ty),*) => {
        $(
            impl Convert for Vec<$ty> {
                fn project(value: &TypedValue) -> Result<Self> {
                    require_all(read_all::<$ty>(value)?)
                }

                fn lift(self) -> Result<TypedValue> {
                    let values: Vec<Option<$ty>> = self.into_iter().map(Some).collect();
                    Ok(TypedValue::opaque(<$ty as Element>::into_buffer(values)))
                }
            }

            impl Convert for Vec<Option<$ty>> {
                fn project(value: &TypedValue) -> Result<Self> {
                    read_all::<$ty>(value)
                }

                fn lift(self) -> Result<TypedValue> {
                    Ok(TypedValue::opaque(<$ty as Element>::into_buffer(self)))
                }
            }
        )*
    };
}

impl_builtin_vec!(bool, i32, f64, String);

impl Convert for Vec<u8> {
    fn project(value: &TypedValue) -> Result<Self> {
        require_all(read_all::<u8>(value)?)
    }

    fn lift(self) -> Result<TypedValue> {
        Ok(TypedValue::opaque(self))
    }
}

macro_rules! impl_builtin_matrix {
    ($($ty:ty),*) => {
        $(
            impl Convert for Matrix<$ty> {
                fn project(value: &TypedValue) -> Result<Self> {
                    let [nrow, ncol] = matrix_dim(value)?;
                    let data = require_all(read_all::<$ty>(value)?)?;
                    Matrix::new(nrow, ncol, data)
                }

                fn lift(self) -> Result<TypedValue> {
                    let dim = extents_value(&self.dim())?;
                    let values: Vec<Option<$ty>> = self.into_vec().into_iter().map(Some).collect();
                    TypedValue::opaque(<$ty as Element>::into_buffer(values)).with_attr(DIM, dim)
                }
            }
        )*
    };
}

impl_builtin_matrix!(f64, i32);

impl Convert for TypedValue {
    fn project(value: &TypedValue) -> Result<Self> {
        Ok(value.share())
    }

    fn lift(self) -> Result<TypedValue> {
        Ok(self)
    }
}

impl Convert for Record {
    fn project(value: &TypedValue) -> Result<Self> {
        value.as_record().cloned()
    }

    fn lift(self) -> Result<TypedValue> {
        Ok(TypedValue::record(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_projection_shares_buffers() {
        let original = TypedValue::opaque(vec![1.0, 2.0, 3.0]);
        let mut projected = TypedValue::project(&original).unwrap();
        assert!(original.is_shared());
        assert!(projected.is_shared());
        let err = projected.set_element(0, TypedValue::double(9.0)).unwrap_err();
        assert_eq!(err.error_type(), "aliased");

        projected.make_unique();
        projected.set_element(0, TypedValue::double(9.0)).unwrap();
        assert_eq!(original.as_doubles().unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn scalars_accept_length_one_opaque() {
        assert_eq!(f64::project(&TypedValue::opaque(vec![2.5])).unwrap(), 2.5);
        assert_eq!(i32::project(&TypedValue::opaque(vec![3])).unwrap(), 3);
        assert!(bool::project(&TypedValue::opaque(vec![Some(true)])).unwrap());
        let err = f64::project(&TypedValue::opaque(vec![1.0, 2.0])).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn integer_widens_and_double_narrows_only_when_exact() {
        assert_eq!(f64::project(&TypedValue::integer(4)).unwrap(), 4.0);
        assert_eq!(i32::project(&TypedValue::double(4.0)).unwrap(), 4);
        let err = i32::project(&TypedValue::double(4.5)).unwrap_err();
        assert_eq!(err.error_type(), "invalid_value");
    }

    #[test]
    fn na_needs_an_option_target() {
        let v = TypedValue::opaque(vec![1, NA_INTEGER, 3]);
        assert_eq!(Vec::<i32>::project(&v).unwrap_err().error_type(), "na_value");
        assert_eq!(
            Vec::<Option<i32>>::project(&v).unwrap(),
            vec![Some(1), None, Some(3)]
        );
        let lifted = vec![Some(1.0), None].lift().unwrap();
        assert!(is_na_real(lifted.as_doubles().unwrap()[1]));
    }

    #[test]
    fn sequences_of_scalars_and_null_project() {
        let v = TypedValue::sequence(vec![TypedValue::string("a"), TypedValue::null()]);
        assert_eq!(
            Vec::<Option<String>>::project(&v).unwrap(),
            vec![Some("a".to_string()), None]
        );
        assert!(Vec::<f64>::project(&TypedValue::null()).unwrap().is_empty());
        let bad = TypedValue::sequence(vec![TypedValue::integer(1), TypedValue::string("x")]);
        let err = Vec::<i32>::project(&bad).unwrap_err();
        assert_eq!(err.context(), &["element 1".to_string()]);
    }

    #[test]
    fn matrix_needs_dim() {
        let flat = TypedValue::opaque(vec![1.0, 2.0, 3.0, 4.0]);
        let err = Matrix::<f64>::project(&flat).unwrap_err();
        assert!(err.is_shape_mismatch());

        let m = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let lifted = m.clone().lift().unwrap();
        assert_eq!(lifted.dim(), Some(vec![2, 2]));
        assert_eq!(lifted.as_doubles().unwrap(), &[1.0, 3.0, 2.0, 4.0]);
        assert_eq!(Matrix::<f64>::project(&lifted).unwrap(), m);
    }

    #[test]
    fn integer_matrix_reads_double_buffer_exactly() {
        let v = TypedValue::opaque(vec![1.0, 2.0])
            .with_attr(DIM, TypedValue::opaque(vec![1, 2]))
            .unwrap();
        let m = Matrix::<i32>::project(&v).unwrap();
        assert_eq!(m.get(0, 1), Some(&2));
    }

    #[test]
    fn raw_bytes_round_trip() {
        let bytes = vec![0u8, 127, 255];
        let lifted = bytes.clone().lift().unwrap();
        assert_eq!(lifted.as_raw().unwrap(), &bytes[..]);
        assert_eq!(Vec::<u8>::project(&lifted).unwrap(), bytes);
    }
}
