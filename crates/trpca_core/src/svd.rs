//! Complex thin SVD of Fourier-domain frontal slices and singular value
//! thresholding.
//!
//! The decomposition itself is delegated to nalgebra; this module converts
//! between ndarray views and nalgebra matrices and applies the shrinkage
//! `σ ↦ σ - ρ` on the singular values that exceed `ρ`.

use nalgebra::{DMatrix, RealField};
use ndarray::{s, Array1, Array2, ArrayView2};
use rustfft::num_complex::Complex;

use crate::float_trait::TrpcaFloat;

/// Economy-size SVD `A = U Σ Vᴴ` of an `m × n` complex matrix.
///
/// `u` is `m × k`, `v_t` is `k × n` and `singular_values` has length
/// `k = min(m, n)`, non-negative and sorted in descending order.
#[derive(Debug, Clone)]
pub struct SliceSvd<F> {
    pub u: Array2<Complex<F>>,
    pub singular_values: Array1<F>,
    pub v_t: Array2<Complex<F>>,
}

/// Result of singular value thresholding on one slice.
#[derive(Debug, Clone)]
pub struct ShrunkSlice<F> {
    /// `U_r diag(σ_r - ρ) Vᴴ_r`
    pub matrix: Array2<Complex<F>>,
    /// Sum of the shrunk singular values.
    pub nuclear_norm: F,
    /// Number of singular values strictly above the threshold.
    pub rank: usize,
}

/// Compute the thin SVD of `matrix` through nalgebra.
///
/// Returns `None` when nalgebra reports non-convergence within `max_niter`
/// iterations (`0` lets it iterate until convergence).
pub(crate) fn complex_thin_svd<T>(
    matrix: ArrayView2<Complex<T>>,
    eps: T,
    max_niter: usize,
) -> Option<SliceSvd<T>>
where
    T: RealField + Copy,
{
    let (rows, cols) = matrix.dim();
    let dense = DMatrix::from_fn(rows, cols, |r, c| matrix[[r, c]]);

    let svd = dense.try_svd(true, true, eps, max_niter)?;
    let u = svd.u?;
    let v_t = svd.v_t?;
    let k = svd.singular_values.len();

    Some(SliceSvd {
        u: Array2::from_shape_fn((rows, k), |(r, c)| u[(r, c)]),
        singular_values: svd.singular_values.iter().copied().collect(),
        v_t: Array2::from_shape_fn((k, cols), |(r, c)| v_t[(r, c)]),
    })
}

impl<F: TrpcaFloat> SliceSvd<F> {
    /// Number of singular values strictly greater than `threshold`.
    pub fn rank_above(&self, threshold: F) -> usize {
        self.singular_values
            .iter()
            .take_while(|&&sigma| sigma > threshold)
            .count()
    }

    /// Singular value thresholding.
    ///
    /// Drops every component with `σ ≤ threshold` and shrinks the rest by
    /// `threshold`. Returns `None` if nothing survives, in which case the
    /// thresholded slice is identically zero.
    pub fn shrink(&self, threshold: F) -> Option<ShrunkSlice<F>> {
        let rank = self.rank_above(threshold);
        if rank == 0 {
            return None;
        }

        let shrunk: Vec<F> = self
            .singular_values
            .iter()
            .take(rank)
            .map(|&sigma| sigma - threshold)
            .collect();

        // Scale the kept columns of U, then one product with the kept rows of Vᴴ.
        let mut u_scaled = self.u.slice(s![.., ..rank]).to_owned();
        for (mut column, &sigma) in u_scaled.columns_mut().into_iter().zip(shrunk.iter()) {
            column.mapv_inplace(|z| z * sigma);
        }
        let matrix = u_scaled.dot(&self.v_t.slice(s![..rank, ..]));

        Some(ShrunkSlice {
            matrix,
            nuclear_norm: shrunk.into_iter().sum(),
            rank,
        })
    }
}
