use thiserror::Error;

/// Errors raised by the TRPCA operators and solver.
///
/// Non-convergence of the ADMM loop is not an error; it is reported through
/// [`crate::Termination::BudgetExhausted`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrpcaError {
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("SVD failed to converge on Fourier slice {slice}")]
    SvdFailed { slice: usize },
}

pub type Result<T> = std::result::Result<T, TrpcaError>;

/// Reject tensors with a zero-length axis before any work is done.
pub(crate) fn ensure_non_empty(dim: (usize, usize, usize)) -> Result<()> {
    let (n1, n2, n3) = dim;
    if n1 == 0 || n2 == 0 || n3 == 0 {
        return Err(TrpcaError::InvalidShape(format!(
            "every axis must be non-empty, got {}x{}x{}",
            n1, n2, n3
        )));
    }
    Ok(())
}
