//! ADMM solver for Tensor Robust PCA
//!
//! Splits a corrupted frame stack `X` into a low-rank part `L` and a sparse
//! part `S` by solving
//!
//! ```text
//! min ‖L‖_TNN + λ‖S‖₁   subject to   L + S = X
//! ```
//!
//! with the Alternating Direction Method of Multipliers:
//!
//! 1. `L ← prox_tnn(X - S - Y/μ, 1/μ)`
//! 2. `S ← prox_l1(X - L - Y/μ, λ/μ)`
//! 3. `dY = L + S - X`
//! 4. Stop when `max(‖ΔL‖_max, ‖ΔS‖_max, ‖dY‖_max) < tol`
//! 5. Otherwise `Y ← Y + μ·dY` and `μ ← min(ρ·μ, μ_max)`
//!
//! Exhausting `max_iter` is reported through [`Termination`], not as an error.

use ndarray::{Array3, ArrayView3, Zip};

use crate::error::{ensure_non_empty, Result, TrpcaError};
use crate::float_trait::TrpcaFloat;
use crate::prox::{soft_threshold_inplace, tensor_nuclear_norm_prox_with_plans, TnnProx};
use crate::transforms::FramePlans;
use crate::utils::{frobenius_norm, l1_norm, max_abs, max_abs_diff};

// =============================================================================
// Constants
// =============================================================================

/// Default convergence tolerance on the largest entrywise change
const DEFAULT_TOL: f64 = 1e-8;

/// Default iteration budget
const DEFAULT_MAX_ITER: usize = 500;

/// Default growth factor of the penalty parameter
const DEFAULT_RHO: f64 = 1.1;

/// Default initial penalty parameter
const DEFAULT_MU: f64 = 1e-4;

/// Default cap on the penalty parameter
const DEFAULT_MAX_MU: f64 = 1e10;

/// Default SVD iteration limit per slice (0 = until convergence)
const DEFAULT_SVD_MAX_ITERATIONS: usize = 0;

// =============================================================================
// Types
// =============================================================================

/// How the ADMM loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The largest entrywise change dropped below `tol`.
    Converged,
    /// `max_iter` iterations ran without meeting `tol`.
    BudgetExhausted,
}

/// Diagnostics of one ADMM iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord<F> {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Penalty parameter used during this iteration.
    pub mu: F,
    /// `max(‖ΔL‖_max, ‖ΔS‖_max, ‖L + S - X‖_max)`
    pub change: F,
    /// `‖L‖_TNN + λ‖S‖₁`
    pub objective: F,
    /// `‖L + S - X‖_F`
    pub residual_norm: F,
}

/// Configuration for the TRPCA solver.
///
/// Defaults match the reference settings. Use `Default::default()` and
/// override fields or chain the `with_*` setters.
#[derive(Debug, Clone)]
pub struct TrpcaConfig<F: TrpcaFloat> {
    /// Weight of the ℓ1 term. `None` uses [`default_lambda`] for the input shape.
    pub lambda: Option<F>,
    /// Convergence tolerance. Default: 1e-8
    pub tol: F,
    /// Iteration budget. Default: 500
    pub max_iter: usize,
    /// Penalty growth factor, must be >= 1. Default: 1.1
    pub rho: F,
    /// Initial penalty parameter. Default: 1e-4
    pub mu: F,
    /// Upper bound on the penalty parameter. Default: 1e10
    pub max_mu: F,
    /// Iteration limit for each slice SVD, 0 for no limit. Default: 0
    pub svd_max_iterations: usize,
    /// Keep an [`IterationRecord`] per iteration. Default: true
    pub record_history: bool,
}

impl<F: TrpcaFloat> Default for TrpcaConfig<F> {
    fn default() -> Self {
        Self {
            lambda: None,
            tol: F::from_f64_c(DEFAULT_TOL),
            max_iter: DEFAULT_MAX_ITER,
            rho: F::from_f64_c(DEFAULT_RHO),
            mu: F::from_f64_c(DEFAULT_MU),
            max_mu: F::from_f64_c(DEFAULT_MAX_MU),
            svd_max_iterations: DEFAULT_SVD_MAX_ITERATIONS,
            record_history: true,
        }
    }
}

impl<F: TrpcaFloat> TrpcaConfig<F> {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lambda(mut self, lambda: F) -> Self {
        self.lambda = Some(lambda);
        self
    }

    pub fn with_tol(mut self, tol: F) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the penalty schedule: initial value, growth factor and cap.
    pub fn with_penalty(mut self, mu: F, rho: F, max_mu: F) -> Self {
        self.mu = mu;
        self.rho = rho;
        self.max_mu = max_mu;
        self
    }

    pub fn with_svd_max_iterations(mut self, svd_max_iterations: usize) -> Self {
        self.svd_max_iterations = svd_max_iterations;
        self
    }

    pub fn with_history(mut self, record_history: bool) -> Self {
        self.record_history = record_history;
        self
    }

    /// Validate the configuration parameters.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(TrpcaError::InvalidParameter(msg.to_string()));

        if let Some(lambda) = self.lambda {
            if !lambda.is_finite() || lambda < F::zero() {
                return invalid("lambda must be finite and >= 0");
            }
        }
        if !self.tol.is_finite() || self.tol <= F::zero() {
            return invalid("tol must be finite and > 0");
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be > 0");
        }
        if !self.rho.is_finite() || self.rho < F::one() {
            return invalid("rho must be finite and >= 1");
        }
        if !self.mu.is_finite() || self.mu <= F::zero() {
            return invalid("mu must be finite and > 0");
        }
        if !self.max_mu.is_finite() || self.max_mu < self.mu {
            return invalid("max_mu must be finite and >= mu");
        }
        Ok(())
    }
}

/// Result of a TRPCA solve.
#[derive(Debug, Clone)]
pub struct TrpcaOutput<F> {
    /// Low-rank component `L`.
    pub low_rank: Array3<F>,
    /// Sparse component `S`.
    pub sparse: Array3<F>,
    /// `‖L‖_TNN + λ‖S‖₁` of the returned pair.
    pub objective: F,
    /// `‖L + S - X‖_F` of the returned pair.
    pub residual_norm: F,
    /// Number of iterations performed.
    pub iterations: usize,
    pub termination: Termination,
    /// The weight actually used for the ℓ1 term.
    pub lambda: F,
    /// Per-iteration diagnostics (empty when history recording is disabled).
    pub history: Vec<IterationRecord<F>>,
}

impl<F> TrpcaOutput<F> {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// `(L, S, objective, residual_norm, iterations_used)`
    pub fn into_parts(self) -> (Array3<F>, Array3<F>, F, F, usize) {
        (
            self.low_rank,
            self.sparse,
            self.objective,
            self.residual_norm,
            self.iterations,
        )
    }
}

/// Loop-carried solver state, owned by a single solve.
struct AdmmState<F> {
    low_rank: Array3<F>,
    sparse: Array3<F>,
    dual: Array3<F>,
    mu: F,
}

impl<F: TrpcaFloat> AdmmState<F> {
    fn new(dim: (usize, usize, usize), mu: F) -> Self {
        Self {
            low_rank: Array3::zeros(dim),
            sparse: Array3::zeros(dim),
            dual: Array3::zeros(dim),
            mu,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Standard weight `1 / sqrt(max(n1, n2) · n3)` for the sparse term.
pub fn default_lambda<F: TrpcaFloat>(dim: (usize, usize, usize)) -> F {
    let (n1, n2, n3) = dim;
    F::one() / F::usize_as(n1.max(n2) * n3).sqrt()
}

/// `X - A - Y/μ`, the shared shape of both proximal targets.
fn proximal_target<F: TrpcaFloat>(
    x: ArrayView3<F>,
    other: &Array3<F>,
    dual: &Array3<F>,
    inv_mu: F,
) -> Array3<F> {
    let mut target = Array3::zeros(x.raw_dim());
    Zip::from(&mut target)
        .and(x)
        .and(other)
        .and(dual)
        .for_each(|t, &xv, &a, &y| *t = xv - a - y * inv_mu);
    target
}

// =============================================================================
// Main Entry Points
// =============================================================================

/// Run TRPCA with pre-computed FFT plans (Internal/Advanced).
///
/// Plans must have been built for `x.dim().2` frames; reuse them across
/// solves of equally long stacks.
pub fn trpca_with_plans<F: TrpcaFloat>(
    x: ArrayView3<F>,
    config: &TrpcaConfig<F>,
    plans: &FramePlans<F>,
) -> Result<TrpcaOutput<F>> {
    config.validate()?;
    let dim = x.dim();
    ensure_non_empty(dim)?;
    if dim.2 != plans.frames() {
        return Err(TrpcaError::ShapeMismatch(format!(
            "tensor has {} frames but FFT plans were built for {}",
            dim.2,
            plans.frames()
        )));
    }

    let lambda = config.lambda.unwrap_or_else(|| default_lambda(dim));
    let mut state = AdmmState::new(dim, config.mu);
    let mut history = Vec::new();
    let mut termination = Termination::BudgetExhausted;
    let mut iterations = 0;
    let mut objective = F::zero();
    let mut residual_norm = F::zero();

    tracing::debug!(
        n1 = dim.0,
        n2 = dim.1,
        n3 = dim.2,
        lambda = ?lambda,
        max_iter = config.max_iter,
        "starting TRPCA solve"
    );

    for iter in 0..config.max_iter {
        iterations = iter + 1;
        let mu = state.mu;
        let inv_mu = F::one() / mu;

        // Low-rank update
        let target = proximal_target(x, &state.sparse, &state.dual, inv_mu);
        let TnnProx {
            tensor: low_rank,
            nuclear_norm,
            ..
        } = tensor_nuclear_norm_prox_with_plans(
            target.view(),
            inv_mu,
            plans,
            config.svd_max_iterations,
        )?;
        let previous_low_rank = std::mem::replace(&mut state.low_rank, low_rank);

        // Sparse update
        let mut sparse = proximal_target(x, &state.low_rank, &state.dual, inv_mu);
        soft_threshold_inplace(&mut sparse, lambda * inv_mu);
        let previous_sparse = std::mem::replace(&mut state.sparse, sparse);

        // Primal residual
        let mut residual = Array3::<F>::zeros(dim);
        Zip::from(&mut residual)
            .and(&state.low_rank)
            .and(&state.sparse)
            .and(x)
            .for_each(|d, &l, &s, &xv| *d = l + s - xv);

        let change = max_abs_diff(&previous_low_rank, &state.low_rank)
            .max(max_abs_diff(&previous_sparse, &state.sparse))
            .max(max_abs(&residual));

        objective = nuclear_norm + lambda * l1_norm(&state.sparse);
        residual_norm = frobenius_norm(&residual);

        if config.record_history {
            history.push(IterationRecord {
                iteration: iterations,
                mu,
                change,
                objective,
                residual_norm,
            });
        }

        if change < config.tol {
            termination = Termination::Converged;
            break;
        }

        // Dual ascent and penalty growth
        Zip::from(&mut state.dual)
            .and(&residual)
            .for_each(|y, &d| *y += mu * d);
        state.mu = (config.rho * mu).min(config.max_mu);

        tracing::debug!(
            iter = iterations,
            max_iter = config.max_iter,
            err = ?residual_norm,
            objective = ?objective,
            change = ?change,
            mu = ?state.mu,
            "ADMM iteration"
        );
    }

    match termination {
        Termination::Converged => tracing::info!(
            iterations,
            objective = ?objective,
            residual_norm = ?residual_norm,
            "TRPCA converged"
        ),
        Termination::BudgetExhausted => tracing::warn!(
            iterations,
            residual_norm = ?residual_norm,
            "TRPCA stopped at iteration budget without reaching tolerance"
        ),
    }

    Ok(TrpcaOutput {
        low_rank: state.low_rank,
        sparse: state.sparse,
        objective,
        residual_norm,
        iterations,
        termination,
        lambda,
        history,
    })
}

/// Run TRPCA on a frame stack `X` (`n1 × n2 × n3`, frames along axis 2).
pub fn trpca<F: TrpcaFloat>(x: ArrayView3<F>, config: &TrpcaConfig<F>) -> Result<TrpcaOutput<F>> {
    ensure_non_empty(x.dim())?;
    let plans = FramePlans::new(x.dim().2);
    trpca_with_plans(x, config, &plans)
}

/// Run TRPCA with explicit parameters.
///
/// Equivalent to [`trpca`] with a config built from the arguments:
/// `λ = lambda`, `mu` as the initial penalty growing by `rho` up to `max_mu`.
pub fn solve_trpca<F: TrpcaFloat>(
    x: ArrayView3<F>,
    lambda: F,
    tol: F,
    max_iter: usize,
    rho: F,
    mu: F,
    max_mu: F,
) -> Result<TrpcaOutput<F>> {
    let config = TrpcaConfig::new()
        .with_lambda(lambda)
        .with_tol(tol)
        .with_max_iter(max_iter)
        .with_penalty(mu, rho, max_mu);
    trpca(x, &config)
}

// =============================================================================
// Tests
// =============================================================================
