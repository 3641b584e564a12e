//! Tensor Robust PCA Core Library
//!
//! Pure Rust implementation of Tensor Robust Principal Component Analysis:
//! a 3-way array (e.g. a stack of video frames, frames along the last axis)
//! is split into a low-rank component and a sparse outlier component by ADMM
//! on the tensor nuclear norm. Frame decoding, corruption and persistence are
//! left to the caller.

pub mod admm;
pub mod error;
pub mod float_trait;
pub mod prox;
pub mod svd;
pub mod transforms;
pub mod utils;

// Re-export commonly used types at the crate root
pub use admm::{
    default_lambda, solve_trpca, trpca, trpca_with_plans, IterationRecord, Termination,
    TrpcaConfig, TrpcaOutput,
};
pub use error::{Result, TrpcaError};
pub use float_trait::TrpcaFloat;
pub use prox::{
    shrink_fourier_slices, soft_threshold, soft_threshold_inplace, tensor_nuclear_norm_prox,
    tensor_nuclear_norm_prox_with_plans, FourierShrinkage, TnnProx, TNN_NORMALIZATION,
};
pub use svd::{ShrunkSlice, SliceSvd};
pub use transforms::{fft_frames, ifft_frames, FramePlans};
