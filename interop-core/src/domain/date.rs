//! Dates and datetimes.
//!
//! Dates are double days since 1970-01-01 with class `Date`. Datetimes are
//! double seconds since the epoch with class `POSIXct`/`POSIXt` and a `tzone`
//! attribute naming the display time zone; the instant itself is always UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

use crate::domain::{attr_context, reals_at, require_class, string_at};
use crate::helpers::coerce::TryCoerce;
use crate::registry::Convert;
use crate::types::{is_na_real, MarshalError, Result, TypedValue, CLASS, NA_REAL};

pub const DATE_CLASS: &str = "Date";
pub const POSIXCT_CLASS: [&str; 2] = ["POSIXct", "POSIXt"];
pub const TZONE: &str = "tzone";
pub const DEFAULT_TZONE: &str = "UTC";

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b/%d/%Y", "%Y-%b-%d", "%Y%b%d"];

fn date_from_days(days: f64) -> Result<NaiveDate> {
    if is_na_real(days) {
        return Err(MarshalError::na_value("date"));
    }
    let days: i64 = TryCoerce::<i64>::try_coerce(days.floor())?;
    days.checked_add(EPOCH_DAYS_FROM_CE)
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| MarshalError::invalid_value(format!("{} days is outside the supported date range", days)))
}

pub(crate) fn days_from_date(date: NaiveDate) -> f64 {
    (i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE) as f64
}

pub(crate) fn datetime_from_seconds(seconds: f64) -> Result<DateTime<Utc>> {
    if is_na_real(seconds) {
        return Err(MarshalError::na_value("datetime"));
    }
    let whole = seconds.floor();
    let mut secs: i64 = TryCoerce::<i64>::try_coerce(whole)?;
    let mut nanos = ((seconds - whole) * 1e9).round() as u32;
    if nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| MarshalError::invalid_value(format!("{} seconds is outside the supported range", seconds)))
}

fn seconds_from_datetime(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1e9
}

fn tzone_of(value: &TypedValue) -> Result<Option<String>> {
    value
        .attr(TZONE)
        .map(|tz| string_at(TZONE, tz).map_err(|e| e.with_context(attr_context(TZONE))))
        .transpose()
}

fn require_posixct(value: &TypedValue) -> Result<()> {
    require_class(value, POSIXCT_CLASS[0])
}

fn single<T>(mut values: Vec<T>, what: &str) -> Result<T> {
    if values.len() != 1 {
        return Err(MarshalError::shape_mismatch(format!(
            "expected a single {}, found length {}",
            what,
            values.len()
        )));
    }
    values
        .pop()
        .ok_or_else(|| MarshalError::shape_mismatch(format!("expected a single {}", what)))
}

fn date_value(days: Vec<f64>) -> Result<TypedValue> {
    TypedValue::opaque(days).with_attr(CLASS, TypedValue::strings([DATE_CLASS]))
}

fn datetime_value(seconds: Vec<f64>, tzone: &str) -> Result<TypedValue> {
    TypedValue::opaque(seconds)
        .with_attr(CLASS, TypedValue::strings(POSIXCT_CLASS))?
        .with_attr(TZONE, TypedValue::strings([tzone]))
}

impl Convert for NaiveDate {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, DATE_CLASS)?;
        let days = single(reals_at("Date", value)?, "date")?;
        date_from_days(days)
    }

    fn lift(self) -> Result<TypedValue> {
        date_value(vec![days_from_date(self)])
    }
}

/// NA-aware vector of dates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dates(pub Vec<Option<NaiveDate>>);

impl Convert for Dates {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, DATE_CLASS)?;
        reals_at("Date", value)?
            .into_iter()
            .enumerate()
            .map(|(i, days)| {
                if is_na_real(days) {
                    Ok(None)
                } else {
                    date_from_days(days)
                        .map(Some)
                        .map_err(|e| e.with_context(format!("element {}", i)))
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Dates)
    }

    fn lift(self) -> Result<TypedValue> {
        date_value(
            self.0
                .into_iter()
                .map(|d| d.map_or(NA_REAL, days_from_date))
                .collect(),
        )
    }
}

/// Lift a datetime, labelling it with `tzone`.
pub fn lift_datetime(dt: DateTime<Utc>, tzone: &str) -> Result<TypedValue> {
    datetime_value(vec![seconds_from_datetime(&dt)], tzone)
}

impl Convert for DateTime<Utc> {
    fn project(value: &TypedValue) -> Result<Self> {
        require_posixct(value)?;
        let seconds = single(reals_at("POSIXct", value)?, "datetime")?;
        datetime_from_seconds(seconds)
    }

    fn lift(self) -> Result<TypedValue> {
        lift_datetime(self, DEFAULT_TZONE)
    }
}

/// NA-aware vector of datetimes with an optional display time zone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Datetimes {
    pub values: Vec<Option<DateTime<Utc>>>,
    pub tzone: Option<String>,
}

impl Datetimes {
    pub fn new(values: Vec<Option<DateTime<Utc>>>) -> Self {
        Self { values, tzone: None }
    }

    /// Parse every input with [`parse_datetime`]; failures become NA.
    pub fn parse<S: AsRef<str>>(inputs: &[S]) -> Self {
        Self::new(inputs.iter().map(|s| parse_datetime(s.as_ref()).ok()).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Lift, using `default_tzone` when no time zone is set.
    pub fn lift_with_default(self, default_tzone: &str) -> Result<TypedValue> {
        let tzone = self.tzone.unwrap_or_else(|| default_tzone.to_string());
        let seconds = self
            .values
            .iter()
            .map(|v| v.as_ref().map_or(NA_REAL, seconds_from_datetime))
            .collect();
        datetime_value(seconds, &tzone)
    }
}

impl Convert for Datetimes {
    fn project(value: &TypedValue) -> Result<Self> {
        require_posixct(value)?;
        let values = reals_at("POSIXct", value)?
            .into_iter()
            .enumerate()
            .map(|(i, seconds)| {
                if is_na_real(seconds) {
                    Ok(None)
                } else {
                    datetime_from_seconds(seconds)
                        .map(Some)
                        .map_err(|e| e.with_context(format!("element {}", i)))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Datetimes {
            values,
            tzone: tzone_of(value)?,
        })
    }

    fn lift(self) -> Result<TypedValue> {
        self.lift_with_default(DEFAULT_TZONE)
    }
}

/// Parse a date or datetime string as UTC.
///
/// Datetime formats are tried first (`2004-03-21 12:45:33.123456`,
/// `2004/03/21 12:45:33`, ISO `T` separator), then date-only formats
/// (`2004-03-21`, `2004/03/21`, `20040321`, `Mar/21/2004`, `2004-Mar-21`,
/// `2004Mar21`) at midnight.
pub fn parse_datetime(input: &str) -> Result<DateTime<Utc>> {
    let s = input.trim();
    let len = s.chars().count();
    if len < 8 || len == 9 {
        return Err(MarshalError::invalid_value(format!("inadmissible datetime input `{}`", input)));
    }
    // YYYYMMDD reads as YYYY/MM/DD
    let compact;
    let s = if len == 8 && s.chars().all(|c| c.is_ascii_digit()) {
        compact = format!("{}/{}/{}", &s[..4], &s[4..6], &s[6..]);
        compact.as_str()
    } else {
        s
    };
    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(naive.and_utc());
            }
        }
    }
    Err(MarshalError::invalid_value(format!("unrecognised datetime `{}`", input)))
}
