//! Shared test values.

use chrono::NaiveDate;
use interop_core::{
    DataFrame, MarshalError, Record, Result, SparseMatrix, TypedValue, XtsSeries, CLASS, DIM,
    NA_INTEGER, NA_REAL,
};

/// Row indices of the 6x6 example: entries (4,0) (4,1) (1,3) (5,3) (0,5) (1,5).
pub const SPARSE_ROW_INDEX: [usize; 6] = [4, 4, 1, 5, 0, 1];
pub const SPARSE_COL_PTR: [usize; 7] = [0, 1, 2, 2, 4, 4, 6];
pub const SPARSE_VALUES: [f64; 6] = [1.0; 6];

pub fn sparse_6x6() -> Result<SparseMatrix> {
    SparseMatrix::new(
        6,
        6,
        SPARSE_ROW_INDEX.to_vec(),
        SPARSE_COL_PTR.to_vec(),
        SPARSE_VALUES.to_vec(),
    )
}

/// `n` daily observations starting 1970-01-02, values `1..=n`.
pub fn daily_xts(n: u32) -> Result<XtsSeries> {
    let start = NaiveDate::from_ymd_opt(1970, 1, 2)
        .ok_or_else(|| MarshalError::invalid_value("bad start date"))?;
    let dates: Vec<NaiveDate> = start.iter_days().take(n as usize).collect();
    let values = (1..=n).map(f64::from).collect();
    XtsSeries::from_dates(&dates, values)
}

/// Three rows, a double column and a character column.
pub fn small_frame() -> Result<DataFrame> {
    let columns = Record::from_fields([
        ("x", TypedValue::opaque(vec![1.5, 2.5, NA_REAL])),
        ("y", TypedValue::opaque(vec![Some("a".to_string()), None, Some("c".to_string())])),
    ])?;
    DataFrame::new(columns)
}

/// One value of every kind, each with at least one element to mutate.
pub fn one_of_each_kind() -> Result<Vec<TypedValue>> {
    let nested = Record::from_fields([
        ("inner", TypedValue::opaque(vec![1, 2, 3])),
        ("label", TypedValue::string("x")),
    ])?;
    let record = Record::from_fields([
        ("nested", TypedValue::record(nested)),
        ("flag", TypedValue::boolean(true)),
    ])?;
    Ok(vec![
        TypedValue::boolean(false),
        TypedValue::integer(7),
        TypedValue::double(0.5),
        TypedValue::string("abc"),
        TypedValue::sequence(vec![
            TypedValue::sequence(vec![TypedValue::integer(1)]),
            TypedValue::double(2.0),
        ]),
        TypedValue::record(record),
        TypedValue::opaque(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .with_attr(DIM, TypedValue::opaque(vec![2, 3]))?,
        TypedValue::opaque(vec![Some(true), None])
            .with_attr(CLASS, TypedValue::strings(["flags"]))?,
        TypedValue::opaque(vec![NA_INTEGER, 4]),
    ])
}
