mod input;
pub use input::{NeuraInput, NeuraRelevance};

mod sparse;
pub use sparse::{NeuraSparseBinary, NeuraSparseMatrix};

use nalgebra::{DMatrix, DVector};

use crate::{
    err::{NeuraErr, NeuraResult},
    utils::next_id,
};

/// An extension of `std::ops::AddAssign` and `std::ops::MulAssign`
pub trait NeuraVectorSpace {
    /// Fails if `other` does not have the shape of `self`.
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()>;

    fn mul_assign(&mut self, by: f64);

    fn norm_squared(&self) -> f64;
}

impl NeuraVectorSpace for DMatrix<f64> {
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()> {
        if self.shape() != other.shape() {
            return Err(NeuraErr::mismatch("matrix", self.shape(), other.shape()));
        }

        *self += other;
        Ok(())
    }

    fn mul_assign(&mut self, by: f64) {
        *self *= by;
    }

    fn norm_squared(&self) -> f64 {
        self.iter().map(|x| x * x).sum()
    }
}

impl<T: NeuraVectorSpace> NeuraVectorSpace for Vec<T> {
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()> {
        if self.len() != other.len() {
            return Err(NeuraErr::mismatch(
                "vector space items",
                (self.len(), 1),
                (other.len(), 1),
            ));
        }

        self.iter_mut()
            .zip(other.iter())
            .try_for_each(|(left, right)| left.add_assign(right))
    }

    fn mul_assign(&mut self, by: f64) {
        for item in self.iter_mut() {
            item.mul_assign(by);
        }
    }

    fn norm_squared(&self) -> f64 {
        self.iter().map(T::norm_squared).sum()
    }
}

/// A parameter-shaped array that a parameters container can be built from.
pub trait NeuraArray: Clone + std::fmt::Debug {
    /// Builds a zero-filled array; `sparse` is only honored by arrays that have a sparse form.
    fn zeros_like(rows: usize, columns: usize, sparse: bool) -> Self;

    fn shape(&self) -> (usize, usize);
}

/// Stable identifier of a parameter array, assigned once when the array is built.
/// Clones keep the identifier of the array they were cloned from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NeuraParamsId(usize);

/// A learnable dense array. Biases are stored as `n x 1` matrices.
#[derive(Clone, Debug)]
pub struct NeuraParamsArray {
    id: NeuraParamsId,
    pub values: DMatrix<f64>,
}

impl NeuraParamsArray {
    pub fn new(values: DMatrix<f64>) -> Self {
        Self {
            id: NeuraParamsId(next_id()),
            values,
        }
    }

    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::new(DMatrix::zeros(rows, columns))
    }

    pub fn from_vector(values: DVector<f64>) -> Self {
        let rows = values.len();
        Self::new(DMatrix::from_column_slice(rows, 1, values.as_slice()))
    }

    #[inline(always)]
    pub fn id(&self) -> NeuraParamsId {
        self.id
    }

    #[inline(always)]
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Returns the first column as a vector, which is how biases are read.
    pub fn as_vector(&self) -> DVector<f64> {
        self.values.column(0).clone_owned()
    }

    /// Replaces the values, failing if `values` does not have the same shape.
    pub fn assign_values(&mut self, values: DMatrix<f64>) -> NeuraResult<()> {
        if values.shape() != self.values.shape() {
            return Err(NeuraErr::mismatch(
                "parameters array",
                self.values.shape(),
                values.shape(),
            ));
        }

        self.values = values;
        Ok(())
    }
}

impl NeuraArray for NeuraParamsArray {
    fn zeros_like(rows: usize, columns: usize, _sparse: bool) -> Self {
        Self::zeros(rows, columns)
    }

    fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }
}

/// The gradient of a `NeuraParamsArray`.
/// The sparse form only holds the entries that were touched by a sparse input.
#[derive(Clone, Debug, PartialEq)]
pub enum NeuraErrorsArray {
    Dense(DMatrix<f64>),
    Sparse(NeuraSparseMatrix),
}

impl NeuraErrorsArray {
    pub fn zeros(rows: usize, columns: usize, sparse: bool) -> Self {
        if sparse {
            Self::Sparse(NeuraSparseMatrix::new(rows, columns))
        } else {
            Self::Dense(DMatrix::zeros(rows, columns))
        }
    }

    pub fn from_vector(values: &DVector<f64>) -> Self {
        Self::Dense(DMatrix::from_column_slice(values.len(), 1, values.as_slice()))
    }

    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Dense(matrix) => matrix.shape(),
            Self::Sparse(matrix) => matrix.shape(),
        }
    }

    pub fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_))
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        match self {
            Self::Dense(matrix) => matrix[(row, column)],
            Self::Sparse(matrix) => matrix.get(row, column),
        }
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        match self {
            Self::Dense(matrix) => matrix.clone(),
            Self::Sparse(matrix) => matrix.to_dense(),
        }
    }

    /// Overwrites this array with `values`, which must have the same shape.
    pub fn assign(&mut self, values: NeuraErrorsArray) -> NeuraResult<()> {
        if values.shape() != self.shape() {
            return Err(NeuraErr::mismatch("errors array", self.shape(), values.shape()));
        }

        *self = values;
        Ok(())
    }

    /// Calls `callback(row, column, value)` for every dense entry, or for every explicit sparse entry.
    pub fn for_each_entry(&self, mut callback: impl FnMut(usize, usize, f64)) {
        match self {
            Self::Dense(matrix) => {
                for column in 0..matrix.ncols() {
                    for row in 0..matrix.nrows() {
                        callback(row, column, matrix[(row, column)]);
                    }
                }
            }
            Self::Sparse(matrix) => {
                for (row, column, value) in matrix.iter() {
                    callback(row, column, value);
                }
            }
        }
    }

    /// Sets every entry to zero, keeping the dense or sparse form.
    pub fn set_zero(&mut self) {
        match self {
            Self::Dense(matrix) => matrix.fill(0.0),
            Self::Sparse(matrix) => matrix.clear(),
        }
    }
}

impl NeuraArray for NeuraErrorsArray {
    fn zeros_like(rows: usize, columns: usize, sparse: bool) -> Self {
        Self::zeros(rows, columns, sparse)
    }

    fn shape(&self) -> (usize, usize) {
        NeuraErrorsArray::shape(self)
    }
}

impl NeuraVectorSpace for NeuraErrorsArray {
    fn add_assign(&mut self, other: &Self) -> NeuraResult<()> {
        if self.shape() != other.shape() {
            return Err(NeuraErr::mismatch("errors array", self.shape(), other.shape()));
        }

        let replacement = match (&mut *self, other) {
            (Self::Dense(left), Self::Dense(right)) => {
                *left += right;
                None
            }
            (Self::Dense(left), Self::Sparse(right)) => {
                for (row, column, value) in right.iter() {
                    left[(row, column)] += value;
                }
                None
            }
            (Self::Sparse(left), Self::Sparse(right)) => {
                left.add_assign(right)?;
                None
            }
            (Self::Sparse(left), Self::Dense(right)) => Some(Self::Dense(left.to_dense() + right)),
        };

        if let Some(replacement) = replacement {
            *self = replacement;
        }

        Ok(())
    }

    fn mul_assign(&mut self, by: f64) {
        match self {
            Self::Dense(matrix) => *matrix *= by,
            Self::Sparse(matrix) => matrix.scale(by),
        }
    }

    fn norm_squared(&self) -> f64 {
        match self {
            Self::Dense(matrix) => NeuraVectorSpace::norm_squared(matrix),
            Self::Sparse(matrix) => matrix.iter().map(|(_, _, x)| x * x).sum(),
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;

    #[test]
    fn test_params_ids_are_distinct() {
        let a = NeuraParamsArray::zeros(2, 2);
        let b = NeuraParamsArray::zeros(2, 2);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    fn test_assign_values_shape() {
        let mut array = NeuraParamsArray::zeros(2, 3);

        assert!(array.assign_values(DMatrix::zeros(3, 2)).is_err());
        assert!(array.assign_values(DMatrix::from_element(2, 3, 1.0)).is_ok());
        assert_eq!(array.values[(1, 2)], 1.0);
    }

    #[test]
    fn test_errors_add_mixed() {
        let mut dense = NeuraErrorsArray::Dense(dmatrix![1.0, 2.0; 3.0, 4.0]);
        let sparse = NeuraErrorsArray::Sparse(
            NeuraSparseMatrix::from_entries(2, 2, [(0, 1, 0.5), (1, 0, -1.0)]).unwrap(),
        );

        dense.add_assign(&sparse).unwrap();
        assert_eq!(dense, NeuraErrorsArray::Dense(dmatrix![1.0, 2.5; 2.0, 4.0]));

        let mut sparse2 = sparse.clone();
        sparse2.add_assign(&sparse).unwrap();
        sparse2.mul_assign(0.5);
        assert_eq!(sparse2, sparse);
        assert!(sparse2.is_sparse());
    }

    #[test]
    fn test_errors_add_shape_mismatch() {
        let mut errors = NeuraErrorsArray::zeros(2, 3, false);

        assert_eq!(
            errors.add_assign(&NeuraErrorsArray::zeros(3, 2, true)),
            Err(NeuraErr::mismatch("errors array", (2, 3), (3, 2)))
        );
        assert!(vec![errors.clone()]
            .add_assign(&vec![errors.clone(), errors])
            .is_err());
    }

    #[test]
    fn test_errors_as_vector() {
        let errors = NeuraErrorsArray::from_vector(&dvector![1.0, 2.0, 3.0]);

        assert_eq!(errors.shape(), (3, 1));
        assert_eq!(errors.get(2, 0), 3.0);
        assert_eq!(errors.norm_squared(), 14.0);
    }
}
