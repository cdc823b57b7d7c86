//! Checked numeric coercion between host element types and native indices.
//!
//! The host stores integers as `i32` and reals as `f64`, while native code
//! indexes with `usize` and dates with `i64`.
//!
//! Widening goes through `From`; [`TryCoerce`] covers narrowing, sign and
//! precision checks.

/// Fallible coercion from `Self` to type `R`.
pub trait TryCoerce<R> {
    fn try_coerce(self) -> Result<R, CoerceError>;
}

/// Error type for coercion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoerceError {
    Overflow,
    PrecisionLoss,
    NaN,
    Negative,
}

impl std::fmt::Display for CoerceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoerceError::Overflow => write!(f, "value out of range"),
            CoerceError::PrecisionLoss => write!(f, "precision loss"),
            CoerceError::NaN => write!(f, "NaN cannot be converted"),
            CoerceError::Negative => write!(f, "negative value not allowed"),
        }
    }
}

impl std::error::Error for CoerceError {}

impl TryCoerce<i32> for f64 {
    #[inline]
    fn try_coerce(self) -> Result<i32, CoerceError> {
        if self.is_nan() {
            return Err(CoerceError::NaN);
        }
        if self.fract() != 0.0 {
            return Err(CoerceError::PrecisionLoss);
        }
        // i32::MIN is the host NA sentinel, so it is never a valid target.
        if self <= i32::MIN as f64 || self > i32::MAX as f64 {
            return Err(CoerceError::Overflow);
        }
        Ok(self as i32)
    }
}

impl TryCoerce<i64> for f64 {
    #[inline]
    fn try_coerce(self) -> Result<i64, CoerceError> {
        if self.is_nan() {
            return Err(CoerceError::NaN);
        }
        if self.fract() != 0.0 {
            return Err(CoerceError::PrecisionLoss);
        }
        // i64::MIN/MAX can't be exactly represented in f64, so use safe bounds
        if self < i64::MIN as f64 || self >= i64::MAX as f64 {
            return Err(CoerceError::Overflow);
        }
        Ok(self as i64)
    }
}

impl TryCoerce<usize> for i32 {
    #[inline]
    fn try_coerce(self) -> Result<usize, CoerceError> {
        usize::try_from(self).map_err(|_| CoerceError::Negative)
    }
}

impl TryCoerce<usize> for f64 {
    #[inline]
    fn try_coerce(self) -> Result<usize, CoerceError> {
        if self < 0.0 {
            return Err(CoerceError::Negative);
        }
        let n: i64 = self.try_coerce()?;
        usize::try_from(n).map_err(|_| CoerceError::Overflow)
    }
}

impl TryCoerce<i32> for usize {
    #[inline]
    fn try_coerce(self) -> Result<i32, CoerceError> {
        i32::try_from(self).map_err(|_| CoerceError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_to_i32() {
        assert_eq!(TryCoerce::<i32>::try_coerce(42.0f64), Ok(42));
        assert_eq!(
            TryCoerce::<i32>::try_coerce(42.5f64),
            Err(CoerceError::PrecisionLoss)
        );
        assert_eq!(TryCoerce::<i32>::try_coerce(f64::NAN), Err(CoerceError::NaN));
        assert_eq!(
            TryCoerce::<i32>::try_coerce(3.0e10f64),
            Err(CoerceError::Overflow)
        );
    }

    #[test]
    fn index_coercions_reject_negatives() {
        assert_eq!(TryCoerce::<usize>::try_coerce(-1i32), Err(CoerceError::Negative));
        assert_eq!(TryCoerce::<usize>::try_coerce(7i32), Ok(7));
        assert_eq!(TryCoerce::<usize>::try_coerce(-2.0f64), Err(CoerceError::Negative));
        assert_eq!(TryCoerce::<usize>::try_coerce(6.0f64), Ok(6));
    }

    #[test]
    fn usize_to_i32_overflow() {
        assert_eq!(TryCoerce::<i32>::try_coerce(12usize), Ok(12));
        assert_eq!(
            TryCoerce::<i32>::try_coerce(usize::MAX),
            Err(CoerceError::Overflow)
        );
    }
}
