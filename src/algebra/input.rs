use nalgebra::{DMatrix, DVector};

use super::{NeuraErrorsArray, NeuraSparseBinary, NeuraSparseMatrix};
use crate::err::{NeuraErr, NeuraResult};

/// The input of a layer.
///
/// Sparse inputs are single columns: a multi-column sparse input is rejected by every operation.
#[derive(Clone, Debug, PartialEq)]
pub enum NeuraInput {
    Dense(DVector<f64>),
    SparseBinary(NeuraSparseBinary),
    Sparse(NeuraSparseMatrix),
}

impl NeuraInput {
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(vector) => vector.len(),
            Self::SparseBinary(binary) => binary.len(),
            Self::Sparse(matrix) => matrix.shape().0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Self::Dense(_))
    }

    pub fn as_dense(&self) -> Option<&DVector<f64>> {
        match self {
            Self::Dense(vector) => Some(vector),
            _ => None,
        }
    }

    pub fn to_dense(&self) -> DVector<f64> {
        match self {
            Self::Dense(vector) => vector.clone(),
            Self::SparseBinary(binary) => binary.to_dense(),
            Self::Sparse(matrix) => matrix.to_dense().column(0).clone_owned(),
        }
    }

    fn check_column(&self) -> NeuraResult<()> {
        match self {
            Self::Sparse(matrix) if matrix.shape().1 != 1 => Err(NeuraErr::mismatch(
                "sparse input",
                (matrix.shape().0, 1),
                matrix.shape(),
            )),
            _ => Ok(()),
        }
    }

    /// Returns `weights · self`.
    pub fn dot(&self, weights: &DMatrix<f64>) -> NeuraResult<DVector<f64>> {
        self.check_column()?;

        if weights.ncols() != self.len() {
            return Err(NeuraErr::mismatch(
                "input of weights",
                (weights.ncols(), 1),
                (self.len(), 1),
            ));
        }

        Ok(match self {
            Self::Dense(vector) => weights * vector,
            Self::SparseBinary(binary) => {
                let mut res = DVector::zeros(weights.nrows());
                for &index in binary.active_indices() {
                    res += weights.column(index);
                }
                res
            }
            Self::Sparse(matrix) => {
                let mut res = DVector::zeros(weights.nrows());
                for (row, _, value) in matrix.iter() {
                    res += weights.column(row) * value;
                }
                res
            }
        })
    }

    /// Returns `errors ⊗ selfᵀ`, sparse when `self` is sparse.
    pub fn outer(&self, errors: &DVector<f64>) -> NeuraErrorsArray {
        match self {
            Self::Dense(vector) => NeuraErrorsArray::Dense(errors * vector.transpose()),
            Self::SparseBinary(binary) => {
                let mut res = NeuraSparseMatrix::new(errors.len(), binary.len());
                for &column in binary.active_indices() {
                    for (row, &error) in errors.iter().enumerate() {
                        res.add_entry(row, column, error);
                    }
                }
                NeuraErrorsArray::Sparse(res)
            }
            Self::Sparse(matrix) => {
                let mut res = NeuraSparseMatrix::new(errors.len(), matrix.shape().0);
                for (column, _, value) in matrix.iter() {
                    for (row, &error) in errors.iter().enumerate() {
                        res.add_entry(row, column, error * value);
                    }
                }
                NeuraErrorsArray::Sparse(res)
            }
        }
    }
}

impl From<DVector<f64>> for NeuraInput {
    fn from(vector: DVector<f64>) -> Self {
        Self::Dense(vector)
    }
}

impl From<NeuraSparseBinary> for NeuraInput {
    fn from(binary: NeuraSparseBinary) -> Self {
        Self::SparseBinary(binary)
    }
}

/// The relevance of an input: dense for a dense input, sparse (on the same active rows) otherwise.
#[derive(Clone, Debug, PartialEq)]
pub enum NeuraRelevance {
    Dense(DVector<f64>),
    Sparse(NeuraSparseMatrix),
}

impl NeuraRelevance {
    pub fn to_dense(&self) -> DVector<f64> {
        match self {
            Self::Dense(vector) => vector.clone(),
            Self::Sparse(matrix) => matrix.to_dense().column(0).clone_owned(),
        }
    }

    pub fn sum(&self) -> f64 {
        match self {
            Self::Dense(vector) => vector.sum(),
            Self::Sparse(matrix) => matrix.values().iter().sum(),
        }
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;

    #[test]
    fn test_sparse_dot_matches_dense() {
        let weights = dmatrix![0.1, 0.2, 0.3; -0.4, 0.5, -0.6];
        let binary = NeuraSparseBinary::new(3, [0, 2]).unwrap();

        let sparse = NeuraInput::SparseBinary(binary.clone()).dot(&weights).unwrap();
        let dense = NeuraInput::Dense(binary.to_dense()).dot(&weights).unwrap();

        approx::assert_relative_eq!(sparse, dense);
    }

    #[test]
    fn test_dot_dimensions() {
        let weights = DMatrix::zeros(2, 3);
        assert!(NeuraInput::Dense(dvector![1.0, 2.0]).dot(&weights).is_err());

        let wide = NeuraSparseMatrix::new(3, 2);
        assert!(NeuraInput::Sparse(wide).dot(&weights).is_err());
    }

    #[test]
    fn test_sparse_outer() {
        let errors = dvector![1.0, -2.0];
        let input = NeuraInput::Sparse(NeuraSparseMatrix::column_vector(3, [(1, 0.5)]).unwrap());

        let gradient = input.outer(&errors);
        assert!(gradient.is_sparse());
        assert_eq!(gradient.get(0, 1), 0.5);
        assert_eq!(gradient.get(1, 1), -1.0);
        assert_eq!(gradient.get(1, 0), 0.0);
        assert_eq!(
            gradient.to_dense(),
            NeuraInput::Dense(input.to_dense()).outer(&errors).to_dense()
        );
    }
}
