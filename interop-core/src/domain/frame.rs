//! Data frames: records of equal-length columns.
//!
//! Row names are either explicit strings or the compact form
//! `[NA_INTEGER, -nrow]`, which records only the row count.

use crate::domain::{attr_context, field_context, require_class};
use crate::helpers::coerce::TryCoerce;
use crate::registry::Convert;
use crate::types::{
    is_na_integer, BufferData, MarshalError, Payload, Record, Result, TypedValue, CLASS, NA_INTEGER,
};

pub const DATA_FRAME_CLASS: &str = "data.frame";
pub const ROW_NAMES: &str = "row.names";

/// Row labels of a [`DataFrame`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowNames {
    /// `1..=nrow`, stored in the compact form.
    #[default]
    Automatic,
    /// Explicit integer labels, e.g. the surviving rows of a subset.
    Integer(Vec<i32>),
    Character(Vec<String>),
}

impl RowNames {
    /// Number of explicit labels, `None` for automatic names.
    pub fn len(&self) -> Option<usize> {
        match self {
            RowNames::Automatic => None,
            RowNames::Integer(v) => Some(v.len()),
            RowNames::Character(v) => Some(v.len()),
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, RowNames::Automatic)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataFrame {
    columns: Record,
    row_names: RowNames,
    nrow: usize,
    // A frame with no columns learns its row count from row names or its first column.
    rows_known: bool,
}

fn check_column(name: &str, column: &TypedValue, nrow: usize) -> Result<()> {
    if let Payload::Record(_) = column.payload() {
        return Err(MarshalError::type_mismatch_at(name, "column", column.shape_name()));
    }
    if column.length() != nrow {
        return Err(MarshalError::shape_mismatch_at(
            name,
            format!("column has {} rows, expected {}", column.length(), nrow),
        ));
    }
    Ok(())
}

impl DataFrame {
    /// Build from named columns. Every column must have the same length.
    pub fn new(columns: Record) -> Result<Self> {
        let nrow = columns.iter().next().map(|(_, c)| c.length());
        let rows_known = nrow.is_some();
        let mut frame = Self::with_nrow(columns, nrow.unwrap_or(0))?;
        frame.rows_known = rows_known;
        Ok(frame)
    }

    fn with_nrow(columns: Record, nrow: usize) -> Result<Self> {
        for (name, column) in columns.iter() {
            check_column(name, column, nrow).map_err(|e| e.with_context(field_context(name)))?;
        }
        Ok(Self {
            columns,
            row_names: RowNames::Automatic,
            nrow,
            rows_known: true,
        })
    }

    fn set_row_names(mut self, names: RowNames) -> Result<Self> {
        let len = names.len().unwrap_or(self.nrow);
        if self.rows_known && len != self.nrow {
            return Err(MarshalError::shape_mismatch_at(
                ROW_NAMES,
                format!("{} row names for {} rows", len, self.nrow),
            ));
        }
        self.nrow = len;
        self.rows_known = true;
        self.row_names = names;
        Ok(self)
    }

    pub fn with_row_names(self, names: Vec<String>) -> Result<Self> {
        self.set_row_names(RowNames::Character(names))
    }

    /// Explicit integer labels. NA is not a valid label.
    pub fn with_integer_row_names(self, names: Vec<i32>) -> Result<Self> {
        if names.iter().any(|n| is_na_integer(*n)) {
            return Err(MarshalError::na_value("row name"));
        }
        self.set_row_names(RowNames::Integer(names))
    }

    /// Append a column of matching length.
    pub fn push_column(&mut self, name: impl Into<String>, column: TypedValue) -> Result<()> {
        let name = name.into();
        let nrow = if self.rows_known {
            self.nrow
        } else {
            column.length()
        };
        check_column(&name, &column, nrow).map_err(|e| e.with_context(field_context(&name)))?;
        self.columns.push(name, column)?;
        self.nrow = nrow;
        self.rows_known = true;
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<&TypedValue> {
        self.columns
            .get(name)
            .ok_or_else(|| MarshalError::missing_name(name, self.columns.len()))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.names()
    }

    pub fn columns(&self) -> &Record {
        &self.columns
    }

    pub fn into_columns(self) -> Record {
        self.columns
    }

    pub fn row_names(&self) -> &RowNames {
        &self.row_names
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.columns.len()
    }
}

/// Row count and labels from a `row.names` attribute.
fn read_row_names(value: &TypedValue) -> Result<(usize, RowNames)> {
    let found = || MarshalError::type_mismatch_at(ROW_NAMES, "row names", value.shape_name());
    let Payload::Opaque(buffer) = value.payload() else {
        return Err(found());
    };
    match buffer.data() {
        BufferData::Integer(v) if v.len() == 2 && is_na_integer(v[0]) => {
            let nrow: usize = v[1].unsigned_abs().try_into().map_err(|_| found())?;
            Ok((nrow, RowNames::Automatic))
        }
        BufferData::Integer(v) => {
            if v.iter().any(|n| is_na_integer(*n)) {
                return Err(MarshalError::na_value("row name"));
            }
            Ok((v.len(), RowNames::Integer(v.clone())))
        }
        BufferData::Character(v) => {
            let names = v
                .iter()
                .map(|n| n.clone().ok_or_else(|| MarshalError::na_value("row name")))
                .collect::<Result<Vec<_>>>()?;
            Ok((names.len(), RowNames::Character(names)))
        }
        _ => Err(found()),
    }
}

impl Convert for DataFrame {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, DATA_FRAME_CLASS)?;
        let columns = value.as_record()?.clone();
        match value.attr(ROW_NAMES) {
            Some(row_names) => {
                let (nrow, names) =
                    read_row_names(row_names).map_err(|e| e.with_context(attr_context(ROW_NAMES)))?;
                DataFrame::with_nrow(columns, nrow)?.set_row_names(names)
            }
            None => DataFrame::new(columns),
        }
    }

    fn lift(self) -> Result<TypedValue> {
        let row_names = match self.row_names {
            RowNames::Character(names) => TypedValue::strings(names),
            RowNames::Integer(names) => TypedValue::opaque(names),
            RowNames::Automatic => {
                let nrow: i32 = TryCoerce::<i32>::try_coerce(self.nrow)?;
                TypedValue::opaque(vec![NA_INTEGER, -nrow])
            }
        };
        TypedValue::record(self.columns)
            .with_attr(ROW_NAMES, row_names)?
            .with_attr(CLASS, TypedValue::strings([DATA_FRAME_CLASS]))
    }
}
