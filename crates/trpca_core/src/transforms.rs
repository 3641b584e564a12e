use ndarray::{Array3, ArrayView3};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::float_trait::TrpcaFloat;

/// Pre-computed FFT plans for transforms along the frame axis (axis 2).
///
/// Planning is the expensive part of rustfft; a solve runs hundreds of
/// forward/inverse pairs of the same length, so the plans are built once.
#[derive(Clone)]
pub struct FramePlans<F: TrpcaFloat> {
    frames: usize,
    forward: Arc<dyn Fft<F>>,
    inverse: Arc<dyn Fft<F>>,
}

impl<F: TrpcaFloat> FramePlans<F> {
    /// Create plans for a stack with `frames` frontal slices.
    pub fn new(frames: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(frames);
        let inverse = planner.plan_fft_inverse(frames);
        Self {
            frames,
            forward,
            inverse,
        }
    }

    /// Transform length these plans were built for.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl<F: TrpcaFloat> std::fmt::Debug for FramePlans<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramePlans")
            .field("frames", &self.frames)
            .finish()
    }
}

/// FFT of every tube `T[i, j, :]` of a real tensor.
/// Returns the unnormalized spectrum.
pub fn fft_frames<F: TrpcaFloat>(input: ArrayView3<F>, plans: &FramePlans<F>) -> Array3<Complex<F>> {
    let (n1, n2, n3) = input.dim();
    debug_assert_eq!(n3, plans.frames);

    let mut output = Array3::<Complex<F>>::zeros((n1, n2, n3));
    let mut tube = vec![Complex::new(F::zero(), F::zero()); n3];

    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n3 {
                tube[k] = Complex::new(input[[i, j, k]], F::zero());
            }
            plans.forward.process(&mut tube);
            for k in 0..n3 {
                output[[i, j, k]] = tube[k];
            }
        }
    }

    output
}

/// Inverse FFT of every tube of a spectrum, normalized by `1/n3`.
///
/// Returns the real part together with the largest absolute imaginary part
/// that was discarded. For a spectrum with Hermitian symmetry along the
/// frame axis the latter is at round-off level.
pub fn ifft_frames<F: TrpcaFloat>(input: &Array3<Complex<F>>, plans: &FramePlans<F>) -> (Array3<F>, F) {
    let (n1, n2, n3) = input.dim();
    debug_assert_eq!(n3, plans.frames);

    let mut output = Array3::<F>::zeros((n1, n2, n3));
    let norm_factor = F::one() / F::usize_as(n3);
    let mut max_imaginary = F::zero();
    let mut tube = vec![Complex::new(F::zero(), F::zero()); n3];

    for i in 0..n1 {
        for j in 0..n2 {
            for k in 0..n3 {
                tube[k] = input[[i, j, k]];
            }
            plans.inverse.process(&mut tube);
            for k in 0..n3 {
                output[[i, j, k]] = tube[k].re * norm_factor;
                max_imaginary = max_imaginary.max(num_traits::Float::abs(tube[k].im * norm_factor));
            }
        }
    }

    (output, max_imaginary)
}
