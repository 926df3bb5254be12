//! Gradient-based unconstrained minimization.
//!
//! Two families of minimizers share one anytime driver: quasi-Newton methods
//! (BFGS, DFP) that maintain a dense inverse-Hessian estimate, and nonlinear
//! conjugate gradient (Liu-Storey, Polak-Ribiere, Fletcher-Reeves) with
//! periodic steepest-descent restarts. Both search along each direction with a
//! pluggable [`LineMinimizer`].

pub mod anytime;
pub mod convergence;
pub mod error;
pub mod linalg;
pub mod line_search;
pub mod objective;
pub mod result;
pub mod solvers;

#[cfg(feature = "nalgebra")]
pub mod nalgebra_support;

pub use anytime::{AnytimeMinimizer, AnytimeState, MinimizerSettings, StepStatus};
pub use convergence::{check_convergence, convergence, TOLERANCE_DELTA_X};
pub use error::{MinimizeError, Result};
pub use line_search::{
    ArmijoParams, BacktrackingLineMinimizer, CachedGradient, LineMinimizer, LineMinimum,
    WolfeLineMinimizer, WolfeParams,
};
pub use linalg::Matrix;
pub use objective::{DirectionalFunction, FnObjective, Objective};
pub use result::{Iterate, OptimResult, TerminationReason};
pub use solvers::conjugate_gradient::{
    ConjugateGradient, FletcherReeves, FletcherReevesMinimizer, LiuStorey, LiuStoreyMinimizer,
    PolakRibiere, PolakRibiereMinimizer, ScaleFactor,
};
pub use solvers::quasi_newton::{
    bfgs_update_rule, dfp_update_rule, BfgsMinimizer, BfgsUpdate, DfpMinimizer, DfpUpdate,
    HessianUpdate, QuasiNewton,
};
