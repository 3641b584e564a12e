//! Proximal operators used by the ADMM solver.
//!
//! - [`soft_threshold`]: prox of `τ‖·‖₁`, applied entrywise.
//! - [`tensor_nuclear_norm_prox`]: prox of the tensor nuclear norm. The input is
//!   moved to the Fourier domain along the frame axis, every frontal slice is
//!   singular-value thresholded, and the result is transformed back.
//!
//! ## Conjugate symmetry
//!
//! For a real tensor the spectrum satisfies `Ŷ[:, :, n3-k] = conj(Ŷ[:, :, k])`.
//! Only slices `0..⌈n3/2⌉` (plus the Nyquist slice `n3/2` for even `n3`) are
//! decomposed; each interior slice `k` is mirrored into `n3-k` and counted
//! twice in the nuclear norm. DC and Nyquist slices are counted once.

use ndarray::{Array, Array3, ArrayBase, ArrayView3, Axis, Data, DataMut, Dimension};
use rayon::prelude::*;
use rustfft::num_complex::Complex;

use crate::error::{ensure_non_empty, Result, TrpcaError};
use crate::float_trait::TrpcaFloat;
use crate::svd::ShrunkSlice;
use crate::transforms::{fft_frames, ifft_frames, FramePlans};

/// Divisor applied to the weighted sum of Fourier-slice nuclear norms.
///
/// Fixed at 3 independent of the frame count `n3`, whereas the usual tensor
/// nuclear norm divides by `n3`. Only the reported objective depends on it;
/// the thresholded tensor does not.
pub const TNN_NORMALIZATION: f64 = 3.0;

/// Output of [`tensor_nuclear_norm_prox`].
#[derive(Debug, Clone)]
pub struct TnnProx<F> {
    /// Thresholded tensor, same shape as the input.
    pub tensor: Array3<F>,
    /// Tensor nuclear norm of `tensor` (weighted slice sum / [`TNN_NORMALIZATION`]).
    pub nuclear_norm: F,
    /// Largest number of singular values kept in any Fourier slice.
    pub rank: usize,
    /// Largest absolute imaginary part dropped by the inverse transform.
    pub max_imaginary: F,
}

/// Thresholded spectrum produced by [`shrink_fourier_slices`].
#[derive(Debug, Clone)]
pub struct FourierShrinkage<F> {
    /// Hermitian-symmetric spectrum along the frame axis.
    pub spectrum: Array3<Complex<F>>,
    /// Sum of shrunk singular values, interior slices weighted by 2.
    pub weighted_sum: F,
    /// Largest rank retained in any slice.
    pub rank: usize,
}

#[inline(always)]
fn shrink<F: TrpcaFloat>(b: F, tau: F) -> F {
    (b - tau).max(F::zero()) + (b + tau).min(F::zero())
}

/// Soft thresholding `max(0, b - τ) + min(0, b + τ)` of every entry.
///
/// Entries with `|b| ≤ τ` become exactly zero; the others move `τ` towards
/// zero keeping their sign.
pub fn soft_threshold<F, S, D>(input: &ArrayBase<S, D>, tau: F) -> Array<F, D>
where
    F: TrpcaFloat,
    S: Data<Elem = F>,
    D: Dimension,
{
    input.mapv(|b| shrink(b, tau))
}

/// In-place variant of [`soft_threshold`].
pub fn soft_threshold_inplace<F, S, D>(input: &mut ArrayBase<S, D>, tau: F)
where
    F: TrpcaFloat,
    S: DataMut<Elem = F>,
    D: Dimension,
{
    input.mapv_inplace(|b| shrink(b, tau));
}

/// Indices of the Fourier slices that get their own SVD.
///
/// `0..⌈n3/2⌉`, followed by the Nyquist slice when `n3` is even.
fn decomposed_slices(n3: usize) -> Vec<usize> {
    let half = n3.div_ceil(2);
    let mut slices: Vec<usize> = (0..half).collect();
    if n3 % 2 == 0 {
        slices.push(n3 / 2);
    }
    slices
}

/// Singular value thresholding of every frontal slice of a spectrum that
/// came from a real tensor.
///
/// Slices are decomposed in parallel and assembled in index order, so the
/// result does not depend on scheduling. Slice `n3-k` of the output is
/// always the conjugate of slice `k`; slices where no singular value
/// exceeds `rho` are zero and contribute nothing.
pub fn shrink_fourier_slices<F: TrpcaFloat>(
    spectrum: ArrayView3<Complex<F>>,
    rho: F,
    svd_max_iterations: usize,
) -> Result<FourierShrinkage<F>> {
    let (n1, n2, n3) = spectrum.dim();
    ensure_non_empty((n1, n2, n3))?;

    let slices = decomposed_slices(n3);
    let nyquist = if n3 % 2 == 0 { Some(n3 / 2) } else { None };

    let shrunk: Vec<Option<ShrunkSlice<F>>> = slices
        .par_iter()
        .map(|&k| -> Result<Option<ShrunkSlice<F>>> {
            let svd = F::thin_svd(spectrum.index_axis(Axis(2), k), svd_max_iterations)
                .ok_or(TrpcaError::SvdFailed { slice: k })?;
            Ok(svd.shrink(rho))
        })
        .collect::<Result<_>>()?;

    let two = F::from_f64_c(2.0);
    let mut output = Array3::<Complex<F>>::zeros((n1, n2, n3));
    let mut weighted_sum = F::zero();
    let mut rank = 0;

    for (&k, slice) in slices.iter().zip(shrunk) {
        let Some(slice) = slice else {
            tracing::trace!(slice = k, "no singular value above threshold");
            continue;
        };
        tracing::trace!(slice = k, rank = slice.rank, "slice thresholded");

        rank = rank.max(slice.rank);
        let mirrored = k != 0 && Some(k) != nyquist;
        if mirrored {
            weighted_sum += two * slice.nuclear_norm;
            output
                .index_axis_mut(Axis(2), n3 - k)
                .assign(&slice.matrix.mapv(|z| z.conj()));
        } else {
            weighted_sum += slice.nuclear_norm;
        }
        output.index_axis_mut(Axis(2), k).assign(&slice.matrix);
    }

    Ok(FourierShrinkage {
        spectrum: output,
        weighted_sum,
        rank,
    })
}

/// Proximal operator of the tensor nuclear norm with threshold `rho`.
///
/// Builds FFT plans for the input's frame count; use
/// [`tensor_nuclear_norm_prox_with_plans`] inside loops.
pub fn tensor_nuclear_norm_prox<F: TrpcaFloat>(input: ArrayView3<F>, rho: F) -> Result<TnnProx<F>> {
    ensure_non_empty(input.dim())?;
    let plans = FramePlans::new(input.dim().2);
    tensor_nuclear_norm_prox_with_plans(input, rho, &plans, 0)
}

/// Proximal operator of the tensor nuclear norm using pre-computed plans.
///
/// `svd_max_iterations` bounds each slice SVD (`0` = until convergence); a
/// slice that does not converge aborts the whole operator with
/// [`TrpcaError::SvdFailed`].
pub fn tensor_nuclear_norm_prox_with_plans<F: TrpcaFloat>(
    input: ArrayView3<F>,
    rho: F,
    plans: &FramePlans<F>,
    svd_max_iterations: usize,
) -> Result<TnnProx<F>> {
    ensure_non_empty(input.dim())?;
    if rho < F::zero() {
        return Err(TrpcaError::InvalidParameter(format!(
            "threshold must be >= 0, got {:?}",
            rho
        )));
    }
    if input.dim().2 != plans.frames() {
        return Err(TrpcaError::ShapeMismatch(format!(
            "tensor has {} frames but FFT plans were built for {}",
            input.dim().2,
            plans.frames()
        )));
    }

    let spectrum = fft_frames(input, plans);
    let shrinkage = shrink_fourier_slices(spectrum.view(), rho, svd_max_iterations)?;
    let (tensor, max_imaginary) = ifft_frames(&shrinkage.spectrum, plans);

    Ok(TnnProx {
        tensor,
        nuclear_norm: shrinkage.weighted_sum / F::from_f64_c(TNN_NORMALIZATION),
        rank: shrinkage.rank,
        max_imaginary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{frobenius_norm, max_abs_diff};
    use ndarray::{arr1, Array3};
    use rand::prelude::*;
    use rand_distr::{Distribution, Normal};

    fn random_tensor(dim: (usize, usize, usize), seed: u64) -> Array3<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        Array3::from_shape_fn(dim, |_| normal.sample(&mut rng))
    }

    /// Sum of `r` outer products `a ∘ b ∘ c`; every Fourier slice has rank ≤ r.
    fn low_rank_tensor(dim: (usize, usize, usize), r: usize, seed: u64) -> Array3<f64> {
        let (n1, n2, n3) = dim;
        let a = random_tensor((n1, r, 1), seed);
        let b = random_tensor((n2, r, 1), seed + 1);
        let c = random_tensor((n3, r, 1), seed + 2);
        Array3::from_shape_fn(dim, |(i, j, k)| {
            (0..r).map(|q| a[[i, q, 0]] * b[[j, q, 0]] * c[[k, q, 0]]).sum()
        })
    }

    // ==================== Soft Threshold Tests ====================

    #[test]
    fn test_soft_threshold_values() {
        let b = arr1(&[-3.0, -1.0, -0.5, 0.0, 0.5, 1.0, 3.0]);
        let out = soft_threshold(&b, 1.0);
        assert_eq!(out, arr1(&[-2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0]));
    }

    #[test]
    fn test_soft_threshold_zero_tau_is_identity() {
        let b = random_tensor((3, 4, 5), 1);
        assert_eq!(soft_threshold(&b, 0.0), b);
    }

    #[test]
    fn test_soft_threshold_inplace_matches() {
        let b = random_tensor((4, 4, 2), 2);
        let mut inplace = b.clone();
        soft_threshold_inplace(&mut inplace, 0.3);
        assert_eq!(inplace, soft_threshold(&b, 0.3));
    }

    // ==================== Slice Schedule Tests ====================

    #[test]
    fn test_decomposed_slices() {
        assert_eq!(decomposed_slices(1), vec![0]);
        assert_eq!(decomposed_slices(2), vec![0, 1]);
        assert_eq!(decomposed_slices(3), vec![0, 1]);
        assert_eq!(decomposed_slices(4), vec![0, 1, 2]);
        assert_eq!(decomposed_slices(5), vec![0, 1, 2]);
        assert_eq!(decomposed_slices(6), vec![0, 1, 2, 3]);
    }

    // ==================== TNN Prox Tests ====================

    #[test]
    fn test_zero_input_gives_zero_output() {
        let zeros = Array3::<f64>::zeros((5, 4, 3));
        for rho in [1e-6, 0.5, 10.0] {
            let prox = tensor_nuclear_norm_prox(zeros.view(), rho).unwrap();
            assert!(prox.tensor.iter().all(|&v| v == 0.0));
            assert_eq!(prox.nuclear_norm, 0.0);
            assert_eq!(prox.rank, 0);
        }
    }

    #[test]
    fn test_zero_threshold_is_identity() {
        for n3 in [1, 2, 3, 4, 5] {
            let input = random_tensor((4, 3, n3), 10 + n3 as u64);
            let prox = tensor_nuclear_norm_prox(input.view(), 0.0).unwrap();
            assert!(
                max_abs_diff(&prox.tensor, &input) < 1e-10,
                "n3={} not reproduced",
                n3
            );
            assert_eq!(prox.rank, 3);
        }
    }

    #[test]
    fn test_large_threshold_annihilates() {
        let input = random_tensor((6, 6, 4), 3);
        let prox = tensor_nuclear_norm_prox(input.view(), 1e6).unwrap();
        assert!(prox.tensor.iter().all(|&v| v == 0.0));
        assert_eq!(prox.rank, 0);
        assert_eq!(prox.nuclear_norm, 0.0);
    }

    #[test]
    fn test_conjugate_symmetry_of_shrunk_spectrum() {
        for n3 in [3, 4, 5, 6, 7] {
            let input = random_tensor((5, 4, n3), 20 + n3 as u64);
            let plans = FramePlans::new(n3);
            let spectrum = fft_frames(input.view(), &plans);
            let shrinkage = shrink_fourier_slices(spectrum.view(), 0.8, 0).unwrap();

            for k in 1..n3 {
                let slice = shrinkage.spectrum.index_axis(Axis(2), k);
                let mirror = shrinkage.spectrum.index_axis(Axis(2), n3 - k);
                for (a, b) in slice.iter().zip(mirror.iter()) {
                    assert!((a - b.conj()).norm() < 1e-12, "n3={} k={}", n3, k);
                }
            }

            let (_, max_imag) = ifft_frames(&shrinkage.spectrum, &plans);
            assert!(max_imag < 1e-10, "n3={} imag={}", n3, max_imag);
        }
    }

    #[test]
    fn test_output_imaginary_part_vanishes() {
        let input = random_tensor((8, 6, 4), 4);
        let prox = tensor_nuclear_norm_prox(input.view(), 1.5).unwrap();
        assert!(prox.max_imaginary < 1e-10);
    }

    #[test]
    fn test_nuclear_norm_weights_and_normalization() {
        // Thresholding at zero keeps everything, so the reported value is the
        // plain weighted sum of Fourier-slice nuclear norms over 3.
        let n3 = 4;
        let input = random_tensor((4, 4, n3), 5);
        let plans = FramePlans::new(n3);
        let spectrum = fft_frames(input.view(), &plans);

        let mut expected = 0.0;
        for k in 0..n3 {
            let svd = f64::thin_svd(spectrum.index_axis(Axis(2), k), 0).unwrap();
            expected += svd.singular_values.iter().sum::<f64>();
        }
        expected /= TNN_NORMALIZATION;

        let prox = tensor_nuclear_norm_prox(input.view(), 0.0).unwrap();
        assert!(
            (prox.nuclear_norm - expected).abs() < 1e-9 * expected.max(1.0),
            "got {}, expected {}",
            prox.nuclear_norm,
            expected
        );
    }

    #[test]
    fn test_rank_reporting_exact_rank() {
        let r = 2;
        let input = low_rank_tensor((8, 7, 4), r, 6);
        let plans = FramePlans::new(4);
        let spectrum = fft_frames(input.view(), &plans);

        // Pick ρ strictly between the r-th and (r+1)-th singular values across
        // the decomposed slices.
        let mut sigma_r = f64::INFINITY;
        let mut sigma_next = 0.0f64;
        for k in decomposed_slices(4) {
            let svd = f64::thin_svd(spectrum.index_axis(Axis(2), k), 0).unwrap();
            sigma_r = sigma_r.min(svd.singular_values[r - 1]);
            sigma_next = sigma_next.max(svd.singular_values[r]);
        }
        assert!(sigma_next < 1e-8 && sigma_r > 1e-3);
        let rho = 0.5 * sigma_r;

        let prox = tensor_nuclear_norm_prox(input.view(), rho).unwrap();
        assert_eq!(prox.rank, r);
    }

    #[test]
    fn test_prox_is_non_expansive() {
        let a = random_tensor((5, 5, 4), 7);
        let b = random_tensor((5, 5, 4), 8);
        let pa = tensor_nuclear_norm_prox(a.view(), 0.7).unwrap();
        let pb = tensor_nuclear_norm_prox(b.view(), 0.7).unwrap();

        let before = frobenius_norm(&(&a - &b));
        let after = frobenius_norm(&(&pa.tensor - &pb.tensor));
        assert!(after <= before + 1e-10);
    }

    #[test]
    fn test_f32_prox() {
        let input = random_tensor((4, 4, 4), 9).mapv(|v| v as f32);
        let prox = tensor_nuclear_norm_prox(input.view(), 0.0f32).unwrap();
        for (a, b) in prox.tensor.iter().zip(input.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    // ==================== Error Tests ====================

    #[test]
    fn test_empty_axis_rejected() {
        let empty = Array3::<f64>::zeros((3, 0, 4));
        assert!(matches!(
            tensor_nuclear_norm_prox(empty.view(), 1.0),
            Err(TrpcaError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let input = random_tensor((2, 2, 2), 1);
        assert!(matches!(
            tensor_nuclear_norm_prox(input.view(), -1.0),
            Err(TrpcaError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_plan_length_mismatch() {
        let input = random_tensor((3, 3, 4), 2);
        let plans = FramePlans::new(5);
        assert!(matches!(
            tensor_nuclear_norm_prox_with_plans(input.view(), 0.1, &plans, 0),
            Err(TrpcaError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_svd_failure_propagates() {
        let input = random_tensor((8, 8, 2), 3);
        let plans = FramePlans::new(2);
        assert!(matches!(
            tensor_nuclear_norm_prox_with_plans(input.view(), 0.1, &plans, 1),
            Err(TrpcaError::SvdFailed { .. })
        ));
    }
}
