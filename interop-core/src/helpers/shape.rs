//! Reading integer extents such as `dim` out of a value.

use crate::helpers::coerce::TryCoerce;
use crate::types::{BufferData, MarshalError, Payload, Result, TypedValue, DIM};

/// Read a value as a sequence of non-negative extents.
///
/// Accepts an integer or double scalar, an integer or double `Opaque`, or a
/// `Sequence` of those scalars. Doubles must be whole numbers.
pub fn read_extents(key: &str, value: &TypedValue) -> Result<Vec<usize>> {
    let bad = || MarshalError::type_mismatch_at(key, "non-negative integer sequence", value.shape_name());
    match value.payload() {
        Payload::Integer(x) => Ok(vec![extent(key, *x)?]),
        Payload::Double(x) => Ok(vec![extent_f64(key, *x)?]),
        Payload::Opaque(buffer) => match buffer.data() {
            BufferData::Integer(v) => v.iter().map(|x| extent(key, *x)).collect(),
            BufferData::Double(v) => v.iter().map(|x| extent_f64(key, *x)).collect(),
            _ => Err(bad()),
        },
        Payload::Sequence(items) => items
            .iter()
            .map(|item| match item.payload() {
                Payload::Integer(x) => extent(key, *x),
                Payload::Double(x) => extent_f64(key, *x),
                _ => Err(bad()),
            })
            .collect(),
        _ => Err(bad()),
    }
}

fn extent(key: &str, x: i32) -> Result<usize> {
    TryCoerce::<usize>::try_coerce(x)
        .map_err(|e| MarshalError::shape_mismatch_at(key, format!("extent {}: {}", x, e)))
}

fn extent_f64(key: &str, x: f64) -> Result<usize> {
    TryCoerce::<usize>::try_coerce(x)
        .map_err(|e| MarshalError::shape_mismatch_at(key, format!("extent {}: {}", x, e)))
}

/// Product of extents, `None` on overflow.
pub fn product(extents: &[usize]) -> Option<usize> {
    extents.iter().try_fold(1usize, |acc, &n| acc.checked_mul(n))
}

/// Check that `extents` describe exactly `len` elements.
pub fn check_extents(key: &str, extents: &[usize], len: usize) -> Result<()> {
    match product(extents) {
        Some(p) if p == len => Ok(()),
        Some(p) => Err(MarshalError::shape_mismatch_at(
            key,
            format!("{:?} describes {} elements but the value has {}", extents, p, len),
        )),
        None => Err(MarshalError::shape_mismatch_at(
            key,
            format!("{:?} overflows", extents),
        )),
    }
}

/// Encode extents as an integer `Opaque`, the host's native `dim` form.
pub fn extents_value(extents: &[usize]) -> Result<TypedValue> {
    let ints = extents
        .iter()
        .map(|&n| TryCoerce::<i32>::try_coerce(n))
        .collect::<std::result::Result<Vec<i32>, _>>()?;
    Ok(TypedValue::opaque(ints))
}

/// Read `[nrow, ncol]` from `dim`; a value without `dim` is 1-D.
pub fn matrix_dim(value: &TypedValue) -> Result<[usize; 2]> {
    let dim = value.attr(DIM).ok_or_else(|| {
        MarshalError::shape_mismatch_at(
            DIM,
            format!("{} without dim is 1-D, not a matrix", value.shape_name()),
        )
    })?;
    match read_extents(DIM, dim)?.as_slice() {
        [nrow, ncol] => Ok([*nrow, *ncol]),
        other => Err(MarshalError::shape_mismatch_at(
            DIM,
            format!("expected 2 extents, found {}", other.len()),
        )),
    }
}
