//! Helpers of the relevance (layer-wise relevance propagation) pass.
//!
//! Every ratio is stabilized with `±RELEVANCE_EPS`, keeping denominators away from zero.
//! The stabilizer is spread back over the contributions, so the decomposition is conservative
//! when the biases are zero: the relevance of the input plus the relevance of the previous
//! output equals the relevance of the output. The share of the biases is lost otherwise.

use nalgebra::{DMatrix, DVector};

use crate::{
    algebra::{NeuraInput, NeuraRelevance, NeuraSparseMatrix},
    err::{NeuraErr, NeuraResult},
    utils::non_zero_sign,
};

pub const RELEVANCE_EPS: f64 = 0.01;

#[inline(always)]
fn stabilizer(y: f64) -> f64 {
    if y >= 0.0 {
        RELEVANCE_EPS
    } else {
        -RELEVANCE_EPS
    }
}

/// Relevance of a dense `x` given `y = W·x (+ b)`, where `x[i]` contributes `W[j,i] * x[i]` to `y[j]`.
pub fn relevance_of_dense(
    x: &DVector<f64>,
    y: &DVector<f64>,
    y_relevance: &DVector<f64>,
    weights: &DMatrix<f64>,
) -> DVector<f64> {
    let n = x.len() as f64;
    let mut res = DVector::zeros(x.len());

    for i in 0..x.len() {
        for j in 0..y.len() {
            let eps = stabilizer(y[j]);
            res[i] += y_relevance[j] * (weights[(j, i)] * x[i] + eps / n) / (y[j] + eps);
        }
    }

    res
}

/// Relevance of an input, dispatched over its variant.
///
/// A sparse binary input only distributes relevance over its active indices; the result is
/// sparse, addressed by the same rows.
pub fn relevance_of_input(
    x: &NeuraInput,
    y: &DVector<f64>,
    y_relevance: &DVector<f64>,
    weights: &DMatrix<f64>,
) -> NeuraResult<NeuraRelevance> {
    match x {
        NeuraInput::Dense(x) => Ok(NeuraRelevance::Dense(relevance_of_dense(
            x,
            y,
            y_relevance,
            weights,
        ))),
        NeuraInput::SparseBinary(binary) => {
            let active = binary.active_indices();
            let n = active.len() as f64;

            let entries = active.iter().map(|&i| {
                let mut relevance = 0.0;
                for j in 0..y.len() {
                    let eps = stabilizer(y[j]);
                    relevance += y_relevance[j] * (weights[(j, i)] + eps / n) / (y[j] + eps);
                }
                (i, relevance)
            });

            Ok(NeuraRelevance::Sparse(NeuraSparseMatrix::column_vector(
                binary.len(),
                entries,
            )?))
        }
        NeuraInput::Sparse(_) => Err(NeuraErr::UnsupportedArray(
            "relevance is not defined for valued sparse inputs",
        )),
    }
}

fn partition_eps(y_contribute_2: &DVector<f64>) -> DVector<f64> {
    y_contribute_2.map(|x| non_zero_sign(x) * RELEVANCE_EPS)
}

/// The share of `y_relevance` that goes to `y_contribute_1`, where `y = y_contribute_1 + y_contribute_2`.
pub fn partition_1(
    y_relevance: &DVector<f64>,
    y: &DVector<f64>,
    y_contribute_1: &DVector<f64>,
    y_contribute_2: &DVector<f64>,
) -> DVector<f64> {
    let eps = partition_eps(y_contribute_2);

    y_relevance
        .component_mul(&(y_contribute_1 + &eps / 2.0))
        .component_div(&(y + eps))
}

/// The share of `y_relevance` that goes to `y_contribute_2`; together with [`partition_1`]
/// it sums back to `y_relevance`.
pub fn partition_2(
    y_relevance: &DVector<f64>,
    y: &DVector<f64>,
    y_contribute_2: &DVector<f64>,
) -> DVector<f64> {
    let eps = partition_eps(y_contribute_2);

    y_relevance
        .component_mul(&(y_contribute_2 + &eps / 2.0))
        .component_div(&(y + eps))
}

/// Divides `relevance` by the sum of its absolute values; a null vector is returned unchanged.
pub fn normalize_l1(relevance: &DVector<f64>) -> DVector<f64> {
    let norm = relevance.lp_norm(1);

    if norm == 0.0 {
        relevance.clone()
    } else {
        relevance / norm
    }
}

#[cfg(test)]
mod test {
    use nalgebra::{dmatrix, dvector};

    use super::*;
    use crate::{algebra::NeuraSparseBinary, assert_approx};

    #[test]
    fn test_partition_sums_to_relevance() {
        let c1 = dvector![0.3, -0.8, 0.05, 1.2, -0.4];
        let c2 = dvector![-0.9, 0.1, 0.0, 0.7, -0.2];
        let y = &c1 + &c2;
        let relevance = dvector![0.2, -0.1, 0.4, 0.25, 0.05];

        let sum = partition_1(&relevance, &y, &c1, &c2) + partition_2(&relevance, &y, &c2);

        for i in 0..5 {
            assert_approx!(relevance[i], sum[i], 1e-12);
        }
    }

    #[test]
    fn test_dense_relevance() {
        let weights = dmatrix![0.5, -1.0; 2.0, 0.25];
        let x = dvector![1.0, 2.0];
        let y = &weights * &x;
        let relevance = dvector![0.75, 0.25];

        let res = relevance_of_dense(&x, &y, &relevance, &weights);

        // y = [-1.5, 2.5]
        let expected_0 = 0.75 * (0.5 - 0.005) / (-1.5 - 0.01) + 0.25 * (2.0 + 0.005) / (2.5 + 0.01);
        let expected_1 = 0.75 * (-2.0 - 0.005) / (-1.5 - 0.01) + 0.25 * (0.5 + 0.005) / (2.5 + 0.01);

        assert_approx!(expected_0, res[0], 1e-12);
        assert_approx!(expected_1, res[1], 1e-12);
    }

    #[test]
    fn test_sparse_relevance_matches_dense_on_active_rows() {
        let weights = dmatrix![0.5, -1.0, 0.3; 2.0, 0.25, -0.7];
        let binary = NeuraSparseBinary::new(3, [0, 2]).unwrap();
        let y = NeuraInput::SparseBinary(binary.clone()).dot(&weights).unwrap();
        let relevance = dvector![0.6, 0.4];

        let NeuraRelevance::Sparse(sparse) = relevance_of_input(
            &NeuraInput::SparseBinary(binary),
            &y,
            &relevance,
            &weights,
        )
        .unwrap() else {
            panic!("expected a sparse relevance");
        };

        assert_eq!(sparse.rows(), vec![0, 2]);

        let n = 2.0;
        let expected = |i: usize| {
            (0..2)
                .map(|j| {
                    let eps = if y[j] >= 0.0 { 0.01 } else { -0.01 };
                    relevance[j] * (weights[(j, i)] + eps / n) / (y[j] + eps)
                })
                .sum::<f64>()
        };
        assert_approx!(expected(0), sparse.get(0, 0), 1e-12);
        assert_approx!(expected(2), sparse.get(2, 0), 1e-12);
    }

    #[test]
    fn test_valued_sparse_is_unsupported() {
        let x = NeuraInput::Sparse(NeuraSparseMatrix::column_vector(2, [(0, 1.0)]).unwrap());

        assert!(matches!(
            relevance_of_input(&x, &dvector![1.0], &dvector![1.0], &dmatrix![1.0, 1.0]),
            Err(NeuraErr::UnsupportedArray(_))
        ));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_l1(&dvector![1.0, -3.0]), dvector![0.25, -0.75]);
        assert_eq!(normalize_l1(&dvector![0.0, 0.0]), dvector![0.0, 0.0]);
    }
}
