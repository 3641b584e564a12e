//! Float trait abstraction for f32/f64 support.
//!
//! Every operator in this crate is generic over the element type so that a
//! frame stack can be solved in single or double precision without copying.

use ndarray::ArrayView2;
use num_traits::{Float, FromPrimitive, NumAssign};
use rustfft::num_complex::Complex;
use rustfft::FftNum;
use std::fmt::Debug;
use std::iter::Sum;

use crate::svd::{complex_thin_svd, SliceSvd};

/// Trait alias for floating point types supported by the TRPCA solver.
///
/// This trait combines all the bounds needed for the solver:
/// - Basic float operations (Float, NumAssign)
/// - FFT compatibility (FftNum from rustfft)
/// - Conversion from primitive types (FromPrimitive)
/// - Iteration support (Sum)
/// - A complex thin SVD backed by nalgebra
pub trait TrpcaFloat:
    Float + FftNum + FromPrimitive + NumAssign + Sum + Debug + Send + Sync + 'static
{
    /// Machine epsilon handed to the SVD as its convergence tolerance.
    const SVD_EPSILON: Self;

    /// Create a value from an f64 constant.
    fn from_f64_c(val: f64) -> Self;

    /// Create a value from a usize constant.
    fn usize_as(val: usize) -> Self;

    /// Economy SVD of a complex matrix.
    ///
    /// Returns `None` if the decomposition did not converge within
    /// `max_iterations` sweeps (`0` means no limit).
    fn thin_svd(matrix: ArrayView2<Complex<Self>>, max_iterations: usize) -> Option<SliceSvd<Self>>;
}

impl TrpcaFloat for f32 {
    const SVD_EPSILON: Self = f32::EPSILON;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val as f32
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f32
    }

    fn thin_svd(matrix: ArrayView2<Complex<Self>>, max_iterations: usize) -> Option<SliceSvd<Self>> {
        complex_thin_svd(matrix, Self::SVD_EPSILON, max_iterations)
    }
}

impl TrpcaFloat for f64 {
    const SVD_EPSILON: Self = f64::EPSILON;

    #[inline]
    fn from_f64_c(val: f64) -> Self {
        val
    }

    #[inline]
    fn usize_as(val: usize) -> Self {
        val as f64
    }

    fn thin_svd(matrix: ArrayView2<Complex<Self>>, max_iterations: usize) -> Option<SliceSvd<Self>> {
        complex_thin_svd(matrix, Self::SVD_EPSILON, max_iterations)
    }
}
