use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use crate::err::{NeuraErr, NeuraResult};

/// A sparse matrix holding explicit entries only.
///
/// Entries are kept in column-major (linear) order, so `iter`, `rows`, `columns` and `values`
/// all walk the non-zero entries in the same order.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraSparseMatrix {
    shape: (usize, usize),
    // keyed by (column, row)
    entries: BTreeMap<(usize, usize), f64>,
}

impl NeuraSparseMatrix {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            shape: (rows, columns),
            entries: BTreeMap::new(),
        }
    }

    /// Builds a sparse matrix from `(row, column, value)` triplets; duplicated positions are summed.
    pub fn from_entries(
        rows: usize,
        columns: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> NeuraResult<Self> {
        let mut res = Self::new(rows, columns);

        for (row, column, value) in entries {
            if row >= rows || column >= columns {
                return Err(NeuraErr::mismatch(
                    "sparse matrix entry",
                    (rows, columns),
                    (row + 1, column + 1),
                ));
            }
            res.add_entry(row, column, value);
        }

        Ok(res)
    }

    /// A single-column sparse matrix.
    pub fn column_vector(
        rows: usize,
        entries: impl IntoIterator<Item = (usize, f64)>,
    ) -> NeuraResult<Self> {
        Self::from_entries(rows, 1, entries.into_iter().map(|(row, value)| (row, 0, value)))
    }

    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Number of explicit entries
    #[inline(always)]
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self.entries.get(&(column, row)).copied().unwrap_or(0.0)
    }

    pub(crate) fn add_entry(&mut self, row: usize, column: usize, value: f64) {
        debug_assert!(row < self.shape.0 && column < self.shape.1);

        *self.entries.entry((column, row)).or_insert(0.0) += value;
    }

    /// Iterates over `(row, column, value)` in linear order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.entries
            .iter()
            .map(|(&(column, row), &value)| (row, column, value))
    }

    pub fn rows(&self) -> Vec<usize> {
        self.iter().map(|(row, _, _)| row).collect()
    }

    pub fn columns(&self) -> Vec<usize> {
        self.iter().map(|(_, column, _)| column).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.iter().map(|(_, _, value)| value).collect()
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut res = DMatrix::zeros(self.shape.0, self.shape.1);

        for (row, column, value) in self.iter() {
            res[(row, column)] = value;
        }

        res
    }

    pub fn scale(&mut self, by: f64) {
        for value in self.entries.values_mut() {
            *value *= by;
        }
    }

    /// Merges the entries of `other` into `self`, summing the shared positions.
    pub fn add_assign(&mut self, other: &NeuraSparseMatrix) -> NeuraResult<()> {
        if self.shape != other.shape {
            return Err(NeuraErr::mismatch("sparse matrix", self.shape, other.shape));
        }

        for (&key, &value) in other.entries.iter() {
            *self.entries.entry(key).or_insert(0.0) += value;
        }

        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// A binary column vector, described by the indices of its ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeuraSparseBinary {
    size: usize,
    active: Vec<usize>,
}

impl NeuraSparseBinary {
    pub fn new(size: usize, active: impl IntoIterator<Item = usize>) -> NeuraResult<Self> {
        let mut active: Vec<usize> = active.into_iter().collect();
        active.sort_unstable();
        active.dedup();

        if let Some(&last) = active.last() {
            if last >= size {
                return Err(NeuraErr::mismatch(
                    "sparse binary index",
                    (size, 1),
                    (last + 1, 1),
                ));
            }
        }

        Ok(Self { size, active })
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The sorted indices of the active entries.
    #[inline(always)]
    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    pub fn to_dense(&self) -> DVector<f64> {
        let mut res = DVector::zeros(self.size);

        for &index in self.active.iter() {
            res[index] = 1.0;
        }

        res
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linear_order() {
        let matrix =
            NeuraSparseMatrix::from_entries(3, 2, [(2, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0)]).unwrap();

        assert_eq!(matrix.rows(), vec![1, 2, 0]);
        assert_eq!(matrix.columns(), vec![0, 0, 1]);
        assert_eq!(matrix.values(), vec![3.0, 1.0, 2.0]);
        assert_eq!(matrix.get(0, 1), 2.0);
        assert_eq!(matrix.get(0, 0), 0.0);
    }

    #[test]
    fn test_out_of_bound() {
        assert!(NeuraSparseMatrix::from_entries(2, 2, [(2, 0, 1.0)]).is_err());
        assert!(NeuraSparseBinary::new(4, [1, 4]).is_err());
    }

    #[test]
    fn test_duplicates() {
        let matrix = NeuraSparseMatrix::column_vector(3, [(1, 0.5), (1, 0.25)]).unwrap();
        assert_eq!(matrix.nnz(), 1);
        assert_eq!(matrix.get(1, 0), 0.75);

        let binary = NeuraSparseBinary::new(5, [3, 1, 3]).unwrap();
        assert_eq!(binary.active_indices(), &[1, 3]);
        assert_eq!(binary.to_dense().as_slice(), &[0.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_add_assign() {
        let mut matrix = NeuraSparseMatrix::from_entries(2, 2, [(0, 1, 1.0)]).unwrap();
        let other = NeuraSparseMatrix::from_entries(2, 2, [(0, 1, 0.5), (1, 0, 2.0)]).unwrap();

        matrix.add_assign(&other).unwrap();
        assert_eq!(matrix.to_dense(), nalgebra::dmatrix![0.0, 1.5; 2.0, 0.0]);

        assert_eq!(
            matrix.add_assign(&NeuraSparseMatrix::new(2, 3)),
            Err(NeuraErr::mismatch("sparse matrix", (2, 2), (2, 3)))
        );
    }
}
