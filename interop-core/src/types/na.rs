//! Host missing-value (NA) sentinels.
//!
//! Integer NA is `i32::MIN`. Double NA is one specific NaN bit pattern, so
//! ordinary NaN values (e.g. from `0.0 / 0.0`) stay distinguishable from a
//! missing value. Logical and character elements use `Option` instead.

/// NA for integer data.
pub const NA_INTEGER: i32 = i32::MIN;

/// NA for double data (NaN with payload 1954).
pub const NA_REAL: f64 = f64::from_bits(0x7FF0_0000_0000_07A2);

/// Check if an f64 value is the host's NA (not merely any NaN).
#[inline]
pub fn is_na_real(value: f64) -> bool {
    value.to_bits() == NA_REAL.to_bits()
}

/// Check if an i32 value is the host's integer NA.
#[inline]
pub fn is_na_integer(value: i32) -> bool {
    value == NA_INTEGER
}

/// JSON form of a double: `null` is NA, non-finite values are tagged strings.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum JsonReal {
    Number(f64),
    Special(String),
}

const INF: &str = "Inf";
const NEG_INF: &str = "-Inf";
const NAN: &str = "NaN";

fn encode_real(value: f64) -> Option<JsonReal> {
    if is_na_real(value) {
        None
    } else if value.is_nan() {
        Some(JsonReal::Special(NAN.to_string()))
    } else if value == f64::INFINITY {
        Some(JsonReal::Special(INF.to_string()))
    } else if value == f64::NEG_INFINITY {
        Some(JsonReal::Special(NEG_INF.to_string()))
    } else {
        Some(JsonReal::Number(value))
    }
}

fn decode_real<E: serde::de::Error>(encoded: Option<JsonReal>) -> Result<f64, E> {
    match encoded {
        None => Ok(NA_REAL),
        Some(JsonReal::Number(value)) => Ok(value),
        Some(JsonReal::Special(tag)) => match tag.as_str() {
            INF => Ok(f64::INFINITY),
            NEG_INF => Ok(f64::NEG_INFINITY),
            NAN => Ok(f64::NAN),
            other => Err(E::custom(format!(
                "unknown double tag `{}` (expected `{}`, `{}` or `{}`)",
                other, INF, NEG_INF, NAN
            ))),
        },
    }
}

/// JSON encoding of a double: NA is `null`, `Inf`/`-Inf`/`NaN` are strings.
pub(crate) mod serde_real {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::{decode_real, encode_real, JsonReal};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        encode_real(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        decode_real(Option::<JsonReal>::deserialize(deserializer)?)
    }
}

/// Vector form of [`serde_real`].
pub(crate) mod serde_reals {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{decode_real, encode_real, JsonReal};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(values: &Vec<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&encode_real(*value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Option<JsonReal>>::deserialize(deserializer)?
            .into_iter()
            .map(decode_real)
            .collect()
    }
}
