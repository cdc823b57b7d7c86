//! Categorical values.
//!
//! A factor lifts to 1-based integer codes with a character `levels`
//! attribute and class `factor`. Missing values are `NA_INTEGER`.

use crate::domain::{attr_context, integers_at, require_class, required_attr};
use crate::helpers::coerce::TryCoerce;
use crate::registry::Convert;
use crate::types::{is_na_integer, MarshalError, Result, TypedValue, CLASS, NA_INTEGER};

pub const FACTOR_CLASS: &str = "factor";
pub const LEVELS: &str = "levels";

/// Enum-like types with a fixed, ordered set of labels.
///
/// `to_level` returns a 0-based position into [`Levels::LEVELS`].
pub trait Levels: Sized {
    const LEVELS: &'static [&'static str];

    fn to_level(&self) -> usize;

    fn from_level(level: usize) -> Option<Self>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Factor {
    codes: Vec<Option<usize>>,
    levels: Vec<String>,
}

impl Factor {
    /// Codes are 0-based positions into `levels`.
    pub fn new(codes: Vec<Option<usize>>, levels: Vec<String>) -> Result<Self> {
        for (i, level) in levels.iter().enumerate() {
            if levels[..i].contains(level) {
                return Err(MarshalError::invalid_value(format!("duplicate factor level `{}`", level)));
            }
        }
        if let Some(&code) = codes.iter().flatten().find(|&&c| c >= levels.len()) {
            return Err(MarshalError::index_out_of_range(code, levels.len()));
        }
        Ok(Self { codes, levels })
    }

    /// Levels are the sorted distinct labels; `None` stays missing.
    pub fn from_labels<S: AsRef<str>>(labels: &[Option<S>]) -> Self {
        let mut levels: Vec<String> = labels
            .iter()
            .flatten()
            .map(|s| s.as_ref().to_string())
            .collect();
        levels.sort();
        levels.dedup();
        let codes = labels
            .iter()
            .map(|label| {
                label
                    .as_ref()
                    .and_then(|s| levels.binary_search_by(|l| l.as_str().cmp(s.as_ref())).ok())
            })
            .collect();
        Self { codes, levels }
    }

    pub fn from_enum<T: Levels>(values: &[Option<T>]) -> Self {
        Self {
            codes: values.iter().map(|v| v.as_ref().map(Levels::to_level)).collect(),
            levels: T::LEVELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Map codes back to `T`. Levels must match `T::LEVELS` exactly.
    pub fn to_enum<T: Levels>(&self) -> Result<Vec<Option<T>>> {
        if self.levels.iter().map(String::as_str).ne(T::LEVELS.iter().copied()) {
            return Err(MarshalError::type_mismatch_at(
                LEVELS,
                format!("levels [{}]", T::LEVELS.join(", ")),
                format!("levels [{}]", self.levels.join(", ")),
            ));
        }
        self.codes
            .iter()
            .map(|code| match code {
                None => Ok(None),
                Some(c) => T::from_level(*c)
                    .map(Some)
                    .ok_or_else(|| MarshalError::index_out_of_range(*c, T::LEVELS.len())),
            })
            .collect()
    }

    pub fn codes(&self) -> &[Option<usize>] {
        &self.codes
    }

    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    pub fn labels(&self) -> Vec<Option<&str>> {
        self.codes
            .iter()
            .map(|c| c.map(|c| self.levels[c].as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl Convert for Factor {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, FACTOR_CLASS)?;
        let levels_value = required_attr(value, LEVELS, "factor")?;
        let levels = levels_value
            .as_strings()
            .map_err(|e| e.with_context(attr_context(LEVELS)))?
            .iter()
            .map(|l| {
                l.clone()
                    .ok_or_else(|| MarshalError::na_value("factor level").with_context(attr_context(LEVELS)))
            })
            .collect::<Result<Vec<_>>>()?;

        let codes = integers_at("factor", value)?
            .iter()
            .map(|&code| -> Result<Option<usize>> {
                if is_na_integer(code) {
                    return Ok(None);
                }
                let position: usize = code.try_coerce()?;
                match position.checked_sub(1) {
                    Some(p) if p < levels.len() => Ok(Some(p)),
                    _ => Err(MarshalError::index_out_of_range(position, levels.len())),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Factor::new(codes, levels)
    }

    fn lift(self) -> Result<TypedValue> {
        let codes = self
            .codes
            .iter()
            .map(|code| match code {
                None => Ok(NA_INTEGER),
                Some(c) => TryCoerce::<i32>::try_coerce(c + 1),
            })
            .collect::<std::result::Result<Vec<i32>, _>>()?;
        TypedValue::opaque(codes)
            .with_attr(LEVELS, TypedValue::strings(self.levels))?
            .with_attr(CLASS, TypedValue::strings([FACTOR_CLASS]))
    }
}
