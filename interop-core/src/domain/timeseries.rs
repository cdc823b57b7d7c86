//! Time-indexed series.
//!
//! Two host conventions describe the same concept and are kept as distinct
//! native types:
//!
//! - [`XtsSeries`]: a double matrix with an explicit `index` attribute
//!   (seconds since the epoch, itself carrying `tzone` and `tclass`) and class
//!   `xts`/`zoo`. Irregular spacing is allowed.
//! - [`RegularSeries`]: a double vector with `tsp = [start, end, frequency]`
//!   and class `ts`. Spacing is implied by the frequency.

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::date::{
    datetime_from_seconds, days_from_date, DATE_CLASS, DEFAULT_TZONE, POSIXCT_CLASS, TZONE,
};
use crate::domain::{attr_context, reals_at, require_class, required_attr, string_at};
use crate::helpers::shape::{extents_value, matrix_dim};
use crate::registry::Convert;
use crate::types::{MarshalError, Matrix, Result, TypedValue, CLASS, DIM};

pub const XTS_CLASS: [&str; 2] = ["xts", "zoo"];
pub const INDEX: &str = "index";
pub const TCLASS: &str = "tclass";
pub const INDEX_CLASS: &str = ".indexCLASS";
pub const INDEX_TZ: &str = ".indexTZ";

pub const TS_CLASS: &str = "ts";
pub const TSP: &str = "tsp";

const SECONDS_PER_DAY: f64 = 86_400.0;
/// Relative tolerance when checking `tsp` against the series length.
const TSP_EPS: f64 = 1e-5;

/// Irregular time series with a seconds-since-epoch index.
#[derive(Debug, Clone, PartialEq)]
pub struct XtsSeries {
    index: Vec<f64>,
    data: Matrix<f64>,
    index_class: String,
    tzone: Option<String>,
}

impl XtsSeries {
    /// Build from an index (seconds) and a matrix with one row per index entry.
    pub fn new(index: Vec<f64>, data: Matrix<f64>) -> Result<Self> {
        if index.len() != data.nrow() {
            return Err(MarshalError::shape_mismatch_at(
                INDEX,
                format!("{} index entries for {} rows", index.len(), data.nrow()),
            ));
        }
        Ok(Self {
            index,
            data,
            index_class: POSIXCT_CLASS[0].to_string(),
            tzone: None,
        })
    }

    /// Single-column series indexed by dates.
    pub fn from_dates(dates: &[NaiveDate], values: Vec<f64>) -> Result<Self> {
        let index = dates
            .iter()
            .map(|d| days_from_date(*d) * SECONDS_PER_DAY)
            .collect();
        let data = Matrix::new(values.len(), 1, values)?;
        Ok(Self::new(index, data)?.with_index_class(DATE_CLASS))
    }

    pub fn with_index_class(mut self, class: impl Into<String>) -> Self {
        self.index_class = class.into();
        self
    }

    pub fn with_tzone(mut self, tzone: impl Into<String>) -> Self {
        self.tzone = Some(tzone.into());
        self
    }

    pub fn index(&self) -> &[f64] {
        &self.index
    }

    pub fn data(&self) -> &Matrix<f64> {
        &self.data
    }

    pub fn index_class(&self) -> &str {
        &self.index_class
    }

    pub fn tzone(&self) -> Option<&str> {
        self.tzone.as_deref()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Index entries as UTC instants.
    pub fn index_datetimes(&self) -> Result<Vec<DateTime<Utc>>> {
        self.index.iter().map(|&seconds| datetime_from_seconds(seconds)).collect()
    }

    /// Lift, using `default_tzone` when no time zone is set.
    pub fn lift_with_default(self, default_tzone: &str) -> Result<TypedValue> {
        let tzone = self.tzone.unwrap_or_else(|| default_tzone.to_string());
        let tclass = self.index_class;
        let dim = extents_value(&self.data.dim())?;

        let index = TypedValue::opaque(self.index)
            .with_attr(TZONE, TypedValue::strings([tzone.as_str()]))?
            .with_attr(TCLASS, TypedValue::strings([tclass.as_str()]))?;

        TypedValue::opaque(self.data.into_vec())
            .with_attr(DIM, dim)?
            .with_attr(INDEX, index)?
            .with_attr(CLASS, TypedValue::strings(XTS_CLASS))?
            .with_attr(INDEX_CLASS, TypedValue::strings([tclass.as_str()]))?
            .with_attr(TCLASS, TypedValue::strings([tclass.as_str()]))?
            .with_attr(INDEX_TZ, TypedValue::strings([tzone.as_str()]))?
            .with_attr(TZONE, TypedValue::strings([tzone.as_str()]))
    }
}

/// First of `keys` present on `value` (or on its index) as a string.
fn first_string(value: &TypedValue, index: &TypedValue, keys: &[(&str, bool)]) -> Result<Option<String>> {
    for &(key, on_index) in keys {
        let holder = if on_index { index } else { value };
        if let Some(v) = holder.attr(key) {
            return string_at(key, v).map(Some).map_err(|e| e.with_context(attr_context(key)));
        }
    }
    Ok(None)
}

impl Convert for XtsSeries {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, XTS_CLASS[0])?;
        let [nrow, ncol] = matrix_dim(value)?;
        let data = Matrix::new(nrow, ncol, reals_at("xts", value)?)?;

        let index_value = required_attr(value, INDEX, "xts")?;
        let index = reals_at(INDEX, index_value).map_err(|e| e.with_context(attr_context(INDEX)))?;
        if index.len() != nrow {
            return Err(MarshalError::shape_mismatch_at(
                INDEX,
                format!("{} index entries for {} rows", index.len(), nrow),
            ));
        }

        let index_class = first_string(value, index_value, &[(TCLASS, true), (INDEX_CLASS, false), (TCLASS, false)])?
            .unwrap_or_else(|| POSIXCT_CLASS[0].to_string());
        let tzone = first_string(value, index_value, &[(TZONE, true), (INDEX_TZ, false), (TZONE, false)])?;

        Ok(XtsSeries {
            index,
            data,
            index_class,
            tzone,
        })
    }

    fn lift(self) -> Result<TypedValue> {
        self.lift_with_default(DEFAULT_TZONE)
    }
}

/// Regularly spaced series: observation `i` is at `start + i / frequency`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularSeries {
    values: Vec<f64>,
    start: f64,
    frequency: f64,
}

impl RegularSeries {
    /// Fails on an empty series, which has no `tsp` describing it.
    pub fn new(values: Vec<f64>, start: f64, frequency: f64) -> Result<Self> {
        if values.is_empty() {
            return Err(MarshalError::invalid_value("a regular series needs at least one observation"));
        }
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(MarshalError::invalid_value(format!(
                "frequency must be positive, got {}",
                frequency
            )));
        }
        if !start.is_finite() {
            return Err(MarshalError::invalid_value("start must be finite"));
        }
        Ok(Self {
            values,
            start,
            frequency,
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Time of the last observation.
    pub fn end(&self) -> f64 {
        self.time(self.values.len().saturating_sub(1))
    }

    pub fn time(&self, i: usize) -> f64 {
        self.start + i as f64 / self.frequency
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Convert for RegularSeries {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, TS_CLASS)?;
        let values = reals_at("ts", value)?;
        let tsp = reals_at(TSP, required_attr(value, TSP, "ts")?)
            .map_err(|e| e.with_context(attr_context(TSP)))?;
        let [start, end, frequency] = tsp.as_slice() else {
            return Err(MarshalError::shape_mismatch_at(
                TSP,
                format!("expected [start, end, frequency], found {} values", tsp.len()),
            ));
        };
        let series = RegularSeries::new(values, *start, *frequency)?;

        let implied = (end - start) * frequency + 1.0;
        if (implied - series.len() as f64).abs() > TSP_EPS * implied.abs().max(1.0) {
            return Err(MarshalError::shape_mismatch_at(
                TSP,
                format!(
                    "tsp describes {} observations but the series has {}",
                    implied.round(),
                    series.len()
                ),
            ));
        }
        Ok(series)
    }

    fn lift(self) -> Result<TypedValue> {
        let tsp = vec![self.start, self.end(), self.frequency];
        TypedValue::opaque(self.values)
            .with_attr(TSP, TypedValue::opaque(tsp))?
            .with_attr(CLASS, TypedValue::strings([TS_CLASS]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Kind;

    fn ten_days() -> XtsSeries {
        let dates: Vec<NaiveDate> = (1..=10)
            .map(|d| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap() + chrono::Days::new(d))
            .collect();
        XtsSeries::from_dates(&dates, (1..=10).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn xts_lift_sets_every_attribute() {
        let v = ten_days().lift().unwrap();
        assert_eq!(v.dim(), Some(vec![10, 1]));
        assert_eq!(v.class(), vec!["xts".to_string(), "zoo".to_string()]);
        assert_eq!(
            v.attributes().keys(),
            vec!["dim", "index", "class", ".indexCLASS", "tclass", ".indexTZ", "tzone"]
        );
        let index = v.attr(INDEX).unwrap();
        assert_eq!(index.as_doubles().unwrap()[0], 86_400.0);
        assert_eq!(index.attr(TCLASS).unwrap().as_str().unwrap(), "Date");
        assert_eq!(index.attr(TZONE).unwrap().as_str().unwrap(), "UTC");
    }

    #[test]
    fn xts_round_trip() {
        let series = ten_days().with_tzone("Europe/Paris");
        let back = XtsSeries::project(&series.clone().lift().unwrap()).unwrap();
        assert_eq!(back, series);
        assert_eq!(back.index_datetimes().unwrap()[1].timestamp(), 2 * 86_400);
    }

    #[test]
    fn xts_index_must_match_rows() {
        let mut v = ten_days().lift().unwrap();
        v.set_attr(INDEX, TypedValue::opaque(vec![0.0, 1.0])).unwrap();
        let err = XtsSeries::project(&v).unwrap_err();
        assert!(err.is_shape_mismatch());
        v.remove_attr(INDEX);
        let err = XtsSeries::project(&v).unwrap_err();
        assert_eq!(err.error_type(), "missing_attribute");
    }

    #[test]
    fn ts_round_trip_and_tsp() {
        let series = RegularSeries::new(vec![1.0, 2.0, 3.0, 4.0], 2000.0, 4.0).unwrap();
        assert_eq!(series.end(), 2000.75);
        let v = series.clone().lift().unwrap();
        assert_eq!(v.kind(), Kind::Opaque);
        assert_eq!(v.attr(TSP).unwrap().as_doubles().unwrap(), &[2000.0, 2000.75, 4.0]);
        assert_eq!(RegularSeries::project(&v).unwrap(), series);
    }

    #[test]
    fn ts_must_not_be_empty() {
        let err = RegularSeries::new(vec![], 2000.0, 4.0).unwrap_err();
        assert_eq!(err.error_type(), "invalid_value");

        let v = TypedValue::opaque(Vec::<f64>::new())
            .with_attr(TSP, TypedValue::opaque(vec![2000.0, 2000.0, 4.0]))
            .unwrap()
            .with_attr(CLASS, TypedValue::string(TS_CLASS))
            .unwrap();
        assert_eq!(RegularSeries::project(&v).unwrap_err().error_type(), "invalid_value");

        let single = RegularSeries::new(vec![7.0], 2000.0, 4.0).unwrap();
        assert_eq!(RegularSeries::project(&single.clone().lift().unwrap()).unwrap(), single);
    }

    #[test]
    fn ts_rejects_inconsistent_tsp() {
        let v = TypedValue::opaque(vec![1.0, 2.0, 3.0])
            .with_attr(TSP, TypedValue::opaque(vec![1.0, 10.0, 1.0]))
            .unwrap()
            .with_attr(CLASS, TypedValue::string(TS_CLASS))
            .unwrap();
        let err = RegularSeries::project(&v).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert!(RegularSeries::new(vec![], 0.0, 0.0).is_err());
    }

    #[test]
    fn two_conventions_are_distinct_types() {
        let ts = RegularSeries::new(vec![1.0], 1.0, 1.0).unwrap().lift().unwrap();
        assert!(XtsSeries::project(&ts).unwrap_err().is_type_mismatch());
    }
}
