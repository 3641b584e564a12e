use ndarray::{Array, ArrayBase, Data, Dimension, Zip};
use num_traits::Float;

use crate::float_trait::TrpcaFloat;

/// Largest absolute entry (`‖A‖_max`). Zero for an empty array.
pub fn max_abs<F, S, D>(a: &ArrayBase<S, D>) -> F
where
    F: TrpcaFloat,
    S: Data<Elem = F>,
    D: Dimension,
{
    a.iter().fold(F::zero(), |acc, &x| acc.max(Float::abs(x)))
}

/// Largest absolute entrywise difference `max |a - b|`.
///
/// # Panics
/// If the shapes differ.
pub fn max_abs_diff<F, S1, S2, D>(a: &ArrayBase<S1, D>, b: &ArrayBase<S2, D>) -> F
where
    F: TrpcaFloat,
    S1: Data<Elem = F>,
    S2: Data<Elem = F>,
    D: Dimension,
{
    Zip::from(a)
        .and(b)
        .fold(F::zero(), |acc, &x, &y| acc.max(Float::abs(x - y)))
}

/// Entrywise ℓ1 norm of the flattened array.
pub fn l1_norm<F, S, D>(a: &ArrayBase<S, D>) -> F
where
    F: TrpcaFloat,
    S: Data<Elem = F>,
    D: Dimension,
{
    a.iter().map(|&x| Float::abs(x)).sum()
}

/// Frobenius norm (ℓ2 norm of the flattened array).
pub fn frobenius_norm<F, S, D>(a: &ArrayBase<S, D>) -> F
where
    F: TrpcaFloat,
    S: Data<Elem = F>,
    D: Dimension,
{
    a.iter().map(|&x| x * x).sum::<F>().sqrt()
}

/// `‖estimate - reference‖_F / ‖reference‖_F`.
///
/// Falls back to the absolute error when the reference is all zeros.
///
/// # Panics
/// If the shapes differ.
pub fn relative_error<F, S1, S2, D>(estimate: &ArrayBase<S1, D>, reference: &ArrayBase<S2, D>) -> F
where
    F: TrpcaFloat,
    S1: Data<Elem = F>,
    S2: Data<Elem = F>,
    D: Dimension,
{
    let diff_sq = Zip::from(estimate)
        .and(reference)
        .fold(F::zero(), |acc, &x, &y| acc + (x - y) * (x - y));
    let reference_norm = frobenius_norm(reference);
    if reference_norm > F::zero() {
        diff_sq.sqrt() / reference_norm
    } else {
        diff_sq.sqrt()
    }
}

/// Clamp every entry into `[lo, hi]`.
///
/// The solver never clips its output; callers that display or store the
/// low-rank component (e.g. as intensities in `[0, max|X|]`) apply this.
pub fn clamp_range<F, S, D>(a: &ArrayBase<S, D>, lo: F, hi: F) -> Array<F, D>
where
    F: TrpcaFloat,
    S: Data<Elem = F>,
    D: Dimension,
{
    a.mapv(|x| x.max(lo).min(hi))
}
