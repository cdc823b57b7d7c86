//! Custom converters for domain types.
//!
//! Each domain type owns its structural convention: which payload kind it
//! lifts to and which attributes (`class`, `Dim`, `levels`, `index`, ...) the
//! host needs to interpret it. The registry dispatches to these converters but
//! checks nothing about the attributes itself.
//!
//! | Name | Native type | Host shape |
//! |------|-------------|------------|
//! | `sparse-col` | [`SparseMatrix`] | record `row_index`/`col_ptr`/`values`, class `sparse-col` |
//! | `date` | [`NaiveDate`](chrono::NaiveDate) | double days, class `Date` |
//! | `dates` | [`Dates`] | double days, class `Date` |
//! | `datetime` | [`DateTime<Utc>`](chrono::DateTime) | double seconds, class `POSIXct`/`POSIXt` |
//! | `datetimes` | [`Datetimes`] | double seconds, class `POSIXct`/`POSIXt` |
//! | `xts` | [`XtsSeries`] | double matrix with `index`, class `xts`/`zoo` |
//! | `ts` | [`RegularSeries`] | double vector with `tsp`, class `ts` |
//! | `factor` | [`Factor`] | integer codes with `levels`, class `factor` |
//! | `data-frame` | [`DataFrame`] | record of columns, class `data.frame` |

mod date;
mod factor;
mod frame;
mod sparse;
mod timeseries;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::registry::{ConversionRegistry, Convert, Converter, OnConflict};
use crate::types::{MarshalError, Result, TypedValue, CLASS};

pub use date::{
    lift_datetime, parse_datetime, Dates, Datetimes, DATE_CLASS, DEFAULT_TZONE, POSIXCT_CLASS,
    TZONE,
};
pub use factor::{Factor, Levels, FACTOR_CLASS, LEVELS};
pub use frame::{DataFrame, RowNames, DATA_FRAME_CLASS, ROW_NAMES};
pub use sparse::{SparseMatrix, COL_PTR, ROW_INDEX, SPARSE_CLASS, SPARSE_DIM, VALUES};
pub use timeseries::{
    RegularSeries, XtsSeries, INDEX, INDEX_CLASS, INDEX_TZ, TCLASS, TSP, TS_CLASS, XTS_CLASS,
};

/// Domain converters selectable by name in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DomainConverter {
    SparseCol,
    Date,
    Dates,
    Datetime,
    Datetimes,
    Xts,
    Ts,
    Factor,
    DataFrame,
}

impl DomainConverter {
    pub const ALL: [DomainConverter; 9] = [
        DomainConverter::SparseCol,
        DomainConverter::Date,
        DomainConverter::Dates,
        DomainConverter::Datetime,
        DomainConverter::Datetimes,
        DomainConverter::Xts,
        DomainConverter::Ts,
        DomainConverter::Factor,
        DomainConverter::DataFrame,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DomainConverter::SparseCol => "sparse-col",
            DomainConverter::Date => "date",
            DomainConverter::Dates => "dates",
            DomainConverter::Datetime => "datetime",
            DomainConverter::Datetimes => "datetimes",
            DomainConverter::Xts => "xts",
            DomainConverter::Ts => "ts",
            DomainConverter::Factor => "factor",
            DomainConverter::DataFrame => "data-frame",
        }
    }

    /// Register this converter on `registry`.
    ///
    /// `default_tzone` is written by datetime and xts lifts when the native
    /// value carries no time zone.
    pub fn register(
        &self,
        registry: &mut ConversionRegistry,
        on_conflict: OnConflict,
        default_tzone: &str,
    ) -> Result<()> {
        debug!("Registering domain converter `{}`", self.name());
        let tz = default_tzone.to_string();
        match self {
            DomainConverter::SparseCol => {
                registry.register_converter(Converter::<SparseMatrix>::of(), on_conflict)
            }
            DomainConverter::Date => registry.register_converter(Converter::<NaiveDate>::of(), on_conflict),
            DomainConverter::Dates => registry.register_converter(Converter::<Dates>::of(), on_conflict),
            DomainConverter::Datetime => registry.register_converter(
                Converter::<DateTime<Utc>>::new(<DateTime<Utc> as Convert>::project, move |dt| {
                    lift_datetime(dt, &tz)
                }),
                on_conflict,
            ),
            DomainConverter::Datetimes => registry.register_converter(
                Converter::<Datetimes>::new(<Datetimes as Convert>::project, move |v| v.lift_with_default(&tz)),
                on_conflict,
            ),
            DomainConverter::Xts => registry.register_converter(
                Converter::<XtsSeries>::new(<XtsSeries as Convert>::project, move |v| v.lift_with_default(&tz)),
                on_conflict,
            ),
            DomainConverter::Ts => registry.register_converter(Converter::<RegularSeries>::of(), on_conflict),
            DomainConverter::Factor => registry.register_converter(Converter::<Factor>::of(), on_conflict),
            DomainConverter::DataFrame => {
                registry.register_converter(Converter::<DataFrame>::of(), on_conflict)
            }
        }
    }
}

impl fmt::Display for DomainConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DomainConverter {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self> {
        DomainConverter::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = DomainConverter::ALL.iter().map(|c| c.name()).collect();
                MarshalError::config(format!(
                    "unknown converter `{}` (expected one of: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}

// Shared field and attribute readers for the domain converters.

/// Fail unless `value` carries class tag `tag`.
pub(crate) fn require_class(value: &TypedValue, tag: &str) -> Result<()> {
    if value.inherits(tag) {
        return Ok(());
    }
    let class = value.class();
    let found = if class.is_empty() {
        value.shape_name()
    } else {
        format!("{} with class {}", value.shape_name(), class.join("/"))
    };
    Err(MarshalError::type_mismatch_at(CLASS, format!("class `{}`", tag), found))
}

pub(crate) fn field_context(name: &str) -> String {
    format!("field `{}`", name)
}

pub(crate) fn attr_context(key: &str) -> String {
    format!("attribute `{}`", key)
}

/// Required attribute `key`, else `MissingAttribute`.
pub(crate) fn required_attr<'a>(value: &'a TypedValue, key: &str, expected: &str) -> Result<&'a TypedValue> {
    value
        .attr(key)
        .ok_or_else(|| MarshalError::missing_attribute(key, expected))
}

/// Integer data of `value`, reporting mismatches against `key`.
pub(crate) fn integers_at<'a>(key: &str, value: &'a TypedValue) -> Result<&'a [i32]> {
    value
        .as_buffer()
        .ok()
        .and_then(|b| b.as_integers())
        .ok_or_else(|| MarshalError::type_mismatch_at(key, "opaque<integer>", value.shape_name()))
}

/// Double data of `value`, reporting mismatches against `key`.
pub(crate) fn doubles_at<'a>(key: &str, value: &'a TypedValue) -> Result<&'a [f64]> {
    value
        .as_buffer()
        .ok()
        .and_then(|b| b.as_doubles())
        .ok_or_else(|| MarshalError::type_mismatch_at(key, "opaque<double>", value.shape_name()))
}

/// Double data, widening integer buffers and scalars.
pub(crate) fn reals_at(key: &str, value: &TypedValue) -> Result<Vec<f64>> {
    use crate::types::{is_na_integer, BufferData, Payload, NA_REAL};
    match value.payload() {
        Payload::Double(x) => Ok(vec![*x]),
        Payload::Integer(x) => Ok(vec![if is_na_integer(*x) { NA_REAL } else { f64::from(*x) }]),
        Payload::Opaque(buffer) => match buffer.data() {
            BufferData::Double(v) => Ok(v.clone()),
            BufferData::Integer(v) => Ok(v
                .iter()
                .map(|&x| if is_na_integer(x) { NA_REAL } else { f64::from(x) })
                .collect()),
            _ => Err(MarshalError::type_mismatch_at(key, "double data", value.shape_name())),
        },
        _ => Err(MarshalError::type_mismatch_at(key, "double data", value.shape_name())),
    }
}

/// Single string from a string scalar or length-1 character buffer.
pub(crate) fn string_at(key: &str, value: &TypedValue) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .map_err(|_| MarshalError::type_mismatch_at(key, "string", value.shape_name()))
}
