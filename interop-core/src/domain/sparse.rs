//! Column-compressed sparse matrices.
//!
//! The host convention is a record of three buffers plus attributes:
//!
//! - `row_index`: 0-based row of each stored value (integer)
//! - `col_ptr`: `ncol + 1` offsets into `row_index`/`values` (integer)
//! - `values`: the stored values (double)
//! - attribute `Dim` = `[nrow, ncol]`, attribute `class` = `["sparse-col"]`
//!
//! `Dim` is capitalised because the lowercase `dim` key would have to match
//! the record's field count.

use crate::domain::{attr_context, doubles_at, field_context, integers_at, require_class};
use crate::helpers::coerce::TryCoerce;
use crate::helpers::shape::{extents_value, read_extents};
use crate::registry::Convert;
use crate::types::{MarshalError, Matrix, Record, Result, TypedValue, CLASS};

pub const SPARSE_CLASS: &str = "sparse-col";
pub const ROW_INDEX: &str = "row_index";
pub const COL_PTR: &str = "col_ptr";
pub const VALUES: &str = "values";
pub const SPARSE_DIM: &str = "Dim";

/// Compressed sparse column matrix of doubles.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    nrow: usize,
    ncol: usize,
    row_index: Vec<usize>,
    col_ptr: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Build from raw column-compressed arrays, validating the structure.
    pub fn new(
        nrow: usize,
        ncol: usize,
        row_index: Vec<usize>,
        col_ptr: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if col_ptr.len() != ncol + 1 {
            return Err(MarshalError::shape_mismatch_at(
                COL_PTR,
                format!("expected {} entries for {} columns, found {}", ncol + 1, ncol, col_ptr.len()),
            ));
        }
        if row_index.len() != values.len() {
            return Err(MarshalError::shape_mismatch_at(
                ROW_INDEX,
                format!("{} row indices for {} values", row_index.len(), values.len()),
            ));
        }
        if col_ptr.first() != Some(&0) {
            return Err(MarshalError::invalid_value("col_ptr must start at 0"));
        }
        if col_ptr.last() != Some(&values.len()) {
            return Err(MarshalError::shape_mismatch_at(
                COL_PTR,
                format!("last offset must equal the {} stored values", values.len()),
            ));
        }
        if let Some(j) = col_ptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(MarshalError::invalid_value(format!(
                "col_ptr decreases at column {}",
                j
            )));
        }
        for j in 0..ncol {
            let rows = &row_index[col_ptr[j]..col_ptr[j + 1]];
            if let Some(&r) = rows.iter().find(|&&r| r >= nrow) {
                return Err(MarshalError::index_out_of_range(r, nrow).with_context(format!("column {}", j)));
            }
            if rows.windows(2).any(|w| w[0] >= w[1]) {
                return Err(MarshalError::invalid_value(format!(
                    "row indices of column {} are not strictly increasing",
                    j
                )));
            }
        }
        Ok(Self {
            nrow,
            ncol,
            row_index,
            col_ptr,
            values,
        })
    }

    /// Build from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(nrow: usize, ncol: usize, triplets: &[(usize, usize, f64)]) -> Result<Self> {
        let mut sorted = triplets.to_vec();
        for &(r, c, _) in &sorted {
            if r >= nrow {
                return Err(MarshalError::index_out_of_range(r, nrow));
            }
            if c >= ncol {
                return Err(MarshalError::index_out_of_range(c, ncol));
            }
        }
        sorted.sort_by_key(|&(r, c, _)| (c, r));

        let mut row_index: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<f64> = Vec::with_capacity(sorted.len());
        let mut counts = vec![0usize; ncol];
        let mut last: Option<(usize, usize)> = None;
        for (r, c, x) in sorted {
            if last == Some((r, c)) {
                if let Some(v) = values.last_mut() {
                    *v += x;
                }
                continue;
            }
            row_index.push(r);
            values.push(x);
            counts[c] += 1;
            last = Some((r, c));
        }

        let mut col_ptr = Vec::with_capacity(ncol + 1);
        col_ptr.push(0);
        for count in counts {
            let next = col_ptr.last().copied().unwrap_or(0) + count;
            col_ptr.push(next);
        }
        Self::new(nrow, ncol, row_index, col_ptr, values)
    }

    /// Compress a dense matrix, dropping exact zeros.
    pub fn from_dense(dense: &Matrix<f64>) -> Self {
        let mut row_index = Vec::new();
        let mut values = Vec::new();
        let mut col_ptr = Vec::with_capacity(dense.ncol() + 1);
        col_ptr.push(0);
        for j in 0..dense.ncol() {
            for (i, &x) in dense.column(j).unwrap_or(&[]).iter().enumerate() {
                if x != 0.0 {
                    row_index.push(i);
                    values.push(x);
                }
            }
            col_ptr.push(values.len());
        }
        Self {
            nrow: dense.nrow(),
            ncol: dense.ncol(),
            row_index,
            col_ptr,
            values,
        }
    }

    pub fn to_dense(&self) -> Result<Matrix<f64>> {
        let mut dense = Matrix::filled(self.nrow, self.ncol, 0.0)?;
        for j in 0..self.ncol {
            for k in self.col_ptr[j]..self.col_ptr[j + 1] {
                if let Some(cell) = dense.get_mut(self.row_index[k], j) {
                    *cell = self.values[k];
                }
            }
        }
        Ok(dense)
    }

    pub fn nrow(&self) -> usize {
        self.nrow
    }

    pub fn ncol(&self) -> usize {
        self.ncol
    }

    pub fn dim(&self) -> [usize; 2] {
        [self.nrow, self.ncol]
    }

    /// Number of stored values.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row_index(&self) -> &[usize] {
        &self.row_index
    }

    pub fn col_ptr(&self) -> &[usize] {
        &self.col_ptr
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at `(row, col)`; unstored cells are zero.
    pub fn at(&self, row: usize, col: usize) -> Result<f64> {
        if row >= self.nrow {
            return Err(MarshalError::index_out_of_range(row, self.nrow));
        }
        let (rows, values) = self.column(col)?;
        Ok(rows.binary_search(&row).map(|k| values[k]).unwrap_or(0.0))
    }

    /// Stored rows and values of column `col`.
    pub fn column(&self, col: usize) -> Result<(&[usize], &[f64])> {
        if col >= self.ncol {
            return Err(MarshalError::index_out_of_range(col, self.ncol));
        }
        let range = self.col_ptr[col]..self.col_ptr[col + 1];
        Ok((&self.row_index[range.clone()], &self.values[range]))
    }

    /// Apply `f` to every stored value, keeping the structure.
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> SparseMatrix {
        SparseMatrix {
            values: self.values.iter().map(|&x| f(x)).collect(),
            ..self.clone()
        }
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

fn offsets(key: &str, data: &[i32]) -> Result<Vec<usize>> {
    data.iter()
        .map(|&x| TryCoerce::<usize>::try_coerce(x).map_err(MarshalError::from))
        .collect::<Result<Vec<usize>>>()
        .map_err(|e| e.with_context(field_context(key)))
}

fn to_i32(key: &str, data: &[usize]) -> Result<TypedValue> {
    let ints = data
        .iter()
        .map(|&x| TryCoerce::<i32>::try_coerce(x).map_err(MarshalError::from))
        .collect::<Result<Vec<i32>>>()
        .map_err(|e| e.with_context(field_context(key)))?;
    Ok(TypedValue::opaque(ints))
}

impl Convert for SparseMatrix {
    fn project(value: &TypedValue) -> Result<Self> {
        require_class(value, SPARSE_CLASS)?;
        let record = value.as_record()?;

        let field = |name: &str| {
            record
                .get(name)
                .ok_or_else(|| MarshalError::missing_name(name, record.len()))
        };
        let row_index = integers_at(ROW_INDEX, field(ROW_INDEX)?)
            .map_err(|e| e.with_context(field_context(ROW_INDEX)))?;
        let col_ptr = integers_at(COL_PTR, field(COL_PTR)?)
            .map_err(|e| e.with_context(field_context(COL_PTR)))?;
        let values = doubles_at(VALUES, field(VALUES)?)
            .map_err(|e| e.with_context(field_context(VALUES)))?;

        let row_index = offsets(ROW_INDEX, row_index)?;
        let col_ptr = offsets(COL_PTR, col_ptr)?;

        let (nrow, ncol) = match value.attr(SPARSE_DIM) {
            Some(dim) => match read_extents(SPARSE_DIM, dim)?.as_slice() {
                [nrow, ncol] => (*nrow, *ncol),
                other => {
                    return Err(MarshalError::shape_mismatch_at(
                        SPARSE_DIM,
                        format!("expected 2 extents, found {}", other.len()),
                    )
                    .with_context(attr_context(SPARSE_DIM)))
                }
            },
            None => {
                let nrow = row_index.iter().max().map_or(0, |&r| r + 1);
                (nrow, col_ptr.len().saturating_sub(1))
            }
        };

        SparseMatrix::new(nrow, ncol, row_index, col_ptr, values.to_vec())
    }

    fn lift(self) -> Result<TypedValue> {
        let mut record = Record::new();
        record.push(ROW_INDEX, to_i32(ROW_INDEX, &self.row_index)?)?;
        record.push(COL_PTR, to_i32(COL_PTR, &self.col_ptr)?)?;
        record.push(VALUES, TypedValue::opaque(self.values))?;
        TypedValue::record(record)
            .with_attr(SPARSE_DIM, extents_value(&[self.nrow, self.ncol])?)?
            .with_attr(CLASS, TypedValue::strings([SPARSE_CLASS]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 6x6 with entries (4,0) (4,1) (1,3) (5,3) (0,5) (1,5)
    fn example() -> SparseMatrix {
        SparseMatrix::new(
            6,
            6,
            vec![4, 4, 1, 5, 0, 1],
            vec![0, 1, 2, 2, 4, 4, 6],
            vec![1.0; 6],
        )
        .unwrap()
    }

    #[test]
    fn new_validates_structure() {
        let err = SparseMatrix::new(2, 2, vec![0], vec![0, 1], vec![1.0]).unwrap_err();
        assert!(err.is_shape_mismatch());
        let err = SparseMatrix::new(2, 1, vec![3], vec![0, 1], vec![1.0]).unwrap_err();
        assert!(err.is_index_out_of_range());
        let err = SparseMatrix::new(2, 1, vec![1, 0], vec![0, 2], vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err.error_type(), "invalid_value");
    }

    #[test]
    fn at_and_column() {
        let m = example();
        assert_eq!(m.nnz(), 6);
        assert_eq!(m.at(5, 3).unwrap(), 1.0);
        assert_eq!(m.at(2, 3).unwrap(), 0.0);
        assert!(m.at(6, 0).unwrap_err().is_index_out_of_range());
        let (rows, values) = m.column(5).unwrap();
        assert_eq!(rows, &[0, 1]);
        assert_eq!(values, &[1.0, 1.0]);
        assert_eq!(m.column(2).unwrap().0.len(), 0);
    }

    #[test]
    fn triplets_are_sorted_and_summed() {
        let m = SparseMatrix::from_triplets(3, 2, &[(2, 1, 1.0), (0, 0, 2.0), (2, 1, 0.5)]).unwrap();
        assert_eq!(m.col_ptr(), &[0, 1, 2]);
        assert_eq!(m.row_index(), &[0, 2]);
        assert_eq!(m.values(), &[2.0, 1.5]);
    }

    #[test]
    fn dense_round_trip_and_sum() {
        let m = example();
        let dense = m.to_dense().unwrap();
        assert_eq!(dense.get(4, 0), Some(&1.0));
        assert_eq!(SparseMatrix::from_dense(&dense), m);
        assert_eq!(m.map_values(|x| 2.0 * x).sum(), 12.0);
    }

    #[test]
    fn dense_form_of_huge_extents_fails() {
        let m = SparseMatrix::new(usize::MAX, 2, vec![], vec![0, 0, 0], vec![]).unwrap();
        assert_eq!(m.nnz(), 0);
        assert!(m.to_dense().unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn lift_then_project_keeps_arrays() {
        let lifted = example().lift().unwrap();
        assert_eq!(lifted.class(), vec![SPARSE_CLASS.to_string()]);
        assert_eq!(lifted.field(ROW_INDEX).unwrap().as_integers().unwrap(), &[4, 4, 1, 5, 0, 1]);
        assert_eq!(SparseMatrix::project(&lifted).unwrap(), example());
    }

    #[test]
    fn project_infers_dim_when_absent() {
        let mut lifted = example().lift().unwrap();
        assert!(lifted.remove_attr(SPARSE_DIM));
        let m = SparseMatrix::project(&lifted).unwrap();
        assert_eq!(m.dim(), [6, 6]);
    }

    #[test]
    fn project_names_the_bad_field() {
        let mut lifted = example().lift().unwrap();
        lifted
            .set_field(COL_PTR, TypedValue::opaque(vec![0.0, 1.0, 2.0, 2.0, 4.0, 4.0, 6.0]))
            .unwrap();
        let err = SparseMatrix::project(&lifted).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field `col_ptr`: type mismatch: expected opaque<integer>, found opaque<double> (key `col_ptr`)"
        );
    }

    #[test]
    fn project_requires_class() {
        let mut lifted = example().lift().unwrap();
        lifted.remove_attr(CLASS);
        let err = SparseMatrix::project(&lifted).unwrap_err();
        assert!(err.is_type_mismatch());
    }
}
