//! Rectangular column-major storage.
//!
//! Column-major is the host's layout, so projecting a matrix reuses the flat
//! buffer as-is. Row-major input goes through [`Matrix::from_rows`], which
//! performs the one reordering copy.

use crate::types::error::{MarshalError, Result};

/// Dense `nrow × ncol` matrix in column-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    nrow: usize,
    ncol: usize,
    data: Vec<T>,
}

impl<T> Matrix<T> {
    /// Wrap column-major data. Fails with `ShapeMismatch` if
    /// `data.len() != nrow * ncol`.
    pub fn new(nrow: usize, ncol: usize, data: Vec<T>) -> Result<Self> {
        match nrow.checked_mul(ncol) {
            Some(n) if n == data.len() => Ok(Self { nrow, ncol, data }),
            _ => Err(MarshalError::shape_mismatch(format!(
                "{} x {} matrix needs {} elements, got {}",
                nrow,
                ncol,
                nrow.saturating_mul(ncol),
                data.len()
            ))),
        }
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

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn offset(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.nrow && col < self.ncol).then(|| col * self.nrow + row)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.offset(row, col).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.offset(row, col).map(move |i| &mut self.data[i])
    }

    /// Column `col` as a contiguous slice.
    pub fn column(&self, col: usize) -> Option<&[T]> {
        (col < self.ncol).then(|| &self.data[col * self.nrow..(col + 1) * self.nrow])
    }

    /// Column-major backing data.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Clone> Matrix<T> {
    pub fn filled(nrow: usize, ncol: usize, value: T) -> Result<Self> {
        let len = nrow.checked_mul(ncol).ok_or_else(|| {
            MarshalError::shape_mismatch(format!("{} x {} matrix is too large", nrow, ncol))
        })?;
        Ok(Self {
            nrow,
            ncol,
            data: vec![value; len],
        })
    }

    /// Build from row-major data, reordering into column-major.
    pub fn from_rows(nrow: usize, ncol: usize, rows: &[T]) -> Result<Self> {
        if nrow.checked_mul(ncol) != Some(rows.len()) {
            return Err(MarshalError::shape_mismatch(format!(
                "{} x {} matrix needs {} elements, got {}",
                nrow,
                ncol,
                nrow.saturating_mul(ncol),
                rows.len()
            )));
        }
        let mut data = Vec::with_capacity(rows.len());
        for col in 0..ncol {
            for row in 0..nrow {
                data.push(rows[row * ncol + col].clone());
            }
        }
        Ok(Self { nrow, ncol, data })
    }

    /// Row `row`, copied out of the column-major storage.
    pub fn row(&self, row: usize) -> Option<Vec<T>> {
        (row < self.nrow).then(|| {
            (0..self.ncol)
                .map(|col| self.data[col * self.nrow + row].clone())
                .collect()
        })
    }

    pub fn transpose(&self) -> Matrix<T> {
        let mut data = Vec::with_capacity(self.data.len());
        for row in 0..self.nrow {
            for col in 0..self.ncol {
                data.push(self.data[col * self.nrow + row].clone());
            }
        }
        Matrix {
            nrow: self.ncol,
            ncol: self.nrow,
            data,
        }
    }
}
