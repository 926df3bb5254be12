use approx::{assert_abs_diff_eq, assert_relative_eq};
use minimizer::{
    bfgs_update_rule, convergence, AnytimeMinimizer, BfgsMinimizer, BfgsUpdate,
    ConjugateGradient, FnObjective, LiuStorey, LiuStoreyMinimizer, Matrix, MinimizeError,
    MinimizerSettings, Objective, PolakRibiere, PolakRibiereMinimizer, QuasiNewton, StepStatus,
    TerminationReason, WolfeLineMinimizer,
};

// ============================================================
// Test objectives
// ============================================================

/// f(x) = x^T A x with A = [[4, 1, 0], [1, 3, 0.5], [0, 0.5, 2]].
struct SpdQuadratic;

const A: [[f64; 3]; 3] = [[4.0, 1.0, 0.0], [1.0, 3.0, 0.5], [0.0, 0.5, 2.0]];

impl Objective<f64> for SpdQuadratic {
    fn dim(&self) -> usize {
        3
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let ax: Vec<f64> = A
            .iter()
            .map(|row| row.iter().zip(x).map(|(a, xi)| a * xi).sum())
            .collect();
        let f = x.iter().zip(&ax).map(|(xi, axi)| xi * axi).sum();
        let g = ax.iter().map(|v| 2.0 * v).collect();
        (f, g)
    }
}

/// f(x, y) = 100 (y - x^2)^2 + (1 - x)^2.
struct Rosenbrock;

impl Objective<f64> for Rosenbrock {
    fn dim(&self) -> usize {
        2
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let a = 1.0 - x[0];
        let b = x[1] - x[0] * x[0];
        let f = a * a + 100.0 * b * b;
        (f, vec![-2.0 * a - 400.0 * x[0] * b, 200.0 * b])
    }
}

fn settings(tolerance: f64, max_iterations: usize, x0: &[f64]) -> MinimizerSettings<f64> {
    MinimizerSettings::new(tolerance, max_iterations)
        .unwrap()
        .with_initial_guess(x0.to_vec())
}

fn bfgs_with(settings: MinimizerSettings<f64>) -> BfgsMinimizer<f64> {
    QuasiNewton::new(BfgsUpdate, WolfeLineMinimizer::default(), settings)
}

// ============================================================
// Convex quadratic
// ============================================================

#[test]
fn bfgs_converges_on_spd_quadratic() {
    let mut bfgs = BfgsMinimizer::<f64>::bfgs();
    bfgs.set_initial_guess(Some(vec![1.0, -2.0, 3.0]));
    let result = bfgs.learn(&mut SpdQuadratic).unwrap();

    assert!(result.termination.is_converged(), "{:?}", result.termination);
    assert!(result.iterations <= 20, "iterations = {}", result.iterations);
    for &xi in &result.x {
        assert_abs_diff_eq!(xi, 0.0, epsilon = 1e-6);
    }
}

#[test]
fn conjugate_gradient_variants_converge_on_spd_quadratic() {
    let x0 = [1.0, -2.0, 3.0];

    let mut ls = LiuStoreyMinimizer::<f64>::liu_storey();
    ls.set_initial_guess(Some(x0.to_vec()));
    let ls_result = ls.learn(&mut SpdQuadratic).unwrap();

    let mut pr = PolakRibiereMinimizer::<f64>::polak_ribiere();
    pr.set_initial_guess(Some(x0.to_vec()));
    let pr_result = pr.learn(&mut SpdQuadratic).unwrap();

    for result in [ls_result, pr_result] {
        assert!(result.termination.is_converged(), "{:?}", result.termination);
        assert!(result.iterations <= 30, "iterations = {}", result.iterations);
        for &xi in &result.x {
            assert_abs_diff_eq!(xi, 0.0, epsilon = 1e-4);
        }
    }
}

// ============================================================
// BFGS update rule
// ============================================================

#[test]
fn bfgs_update_keeps_exact_symmetry() {
    let mut h = Matrix::from_rows(vec![
        vec![2.0, 0.3, -0.1],
        vec![0.3, 1.5, 0.2],
        vec![-0.1, 0.2, 1.0],
    ])
    .unwrap();
    let pairs = [
        ([0.1, -0.7, 0.3], [0.4, -1.1, 0.9]),
        ([1.3, 0.2, -0.5], [2.0, 0.1, -0.3]),
        ([-0.01, 0.03, 0.07], [-0.02, 0.05, 0.2]),
    ];
    for (delta, gamma) in pairs {
        assert!(bfgs_update_rule(&mut h, &delta, &gamma, 1e-10).unwrap());
        assert!(h.is_symmetric());
    }
}

#[test]
fn bfgs_update_skips_orthogonal_pair() {
    let mut h = Matrix::<f64>::identity(2);
    let before = h.clone();
    let updated = bfgs_update_rule(&mut h, &[1.0, 0.0], &[0.0, 1.0], 1e-8).unwrap();
    assert!(!updated);
    assert_eq!(h, before);
}

// ============================================================
// Stopping criterion
// ============================================================

#[test]
fn stopping_criterion_is_scale_invariant() {
    let x = [0.8, -1.5, 2.0];
    let delta = [1e-3, 2e-3, -1e-3];
    let gradient = [1e-4, 3e-4, -2e-4];
    let k = 1e6;

    for tol in [1e-2, 1e-3, 1e-4, 1e-6] {
        let unscaled = convergence(&x, None, &gradient, &delta, tol);
        let xs: Vec<f64> = x.iter().map(|v| v * k).collect();
        let ds: Vec<f64> = delta.iter().map(|v| v * k).collect();
        let gs: Vec<f64> = gradient.iter().map(|v| v / k).collect();
        let scaled = convergence(&xs, None, &gs, &ds, tol);
        assert_eq!(unscaled, scaled, "tol = {}", tol);
    }
}

#[test]
fn stopping_criterion_fires_on_tiny_steps() {
    let x = [1e5, -2e5];
    let delta = [1e-3, 1e-3];
    let gradient = [1.0, 1.0];
    assert!(convergence(&x, None, &gradient, &delta, 1e-6));
}

// ============================================================
// Conjugate gradient restarts
// ============================================================

#[test]
fn restart_every_two_n_iterations() {
    let mut cg = ConjugateGradient::new(
        PolakRibiere,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-12, 100, &[-1.2, 1.0]),
    );
    let mut obj = Rosenbrock;
    assert_eq!(cg.initialize(&mut obj).unwrap(), StepStatus::Continue);
    assert_eq!(cg.last_beta(), None);

    let period = PolakRibiereMinimizer::<f64>::restart_period(2);
    assert_eq!(period, 4);

    for k in 1..=2 * period {
        assert_eq!(cg.step(&mut obj).unwrap(), StepStatus::Continue);
        assert_eq!(cg.iteration(), k);
        if k % period == 0 {
            assert_eq!(cg.last_beta(), Some(0.0), "iteration {}", k);
            let steepest: Vec<f64> = cg.state().gradient().iter().map(|g| -g).collect();
            assert_eq!(cg.direction(), steepest.as_slice());
        }
    }
    assert!(cg.restarts() >= 2);
}

// ============================================================
// Rosenbrock
// ============================================================

#[test]
fn conjugate_gradient_variants_solve_rosenbrock() {
    let x0 = [-1.2, 1.0];

    let mut ls = ConjugateGradient::new(
        LiuStorey,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-8, 2000, &x0),
    );
    let ls_result = ls.learn(&mut Rosenbrock).unwrap();

    let mut pr = ConjugateGradient::new(
        PolakRibiere,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-8, 2000, &x0),
    );
    let pr_result = pr.learn(&mut Rosenbrock).unwrap();

    for result in [ls_result, pr_result] {
        assert_ne!(result.termination, TerminationReason::MaxIterations);
        assert!(
            result.termination.is_converged(),
            "{:?}",
            result.termination
        );
        assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-5);
    }
}

#[test]
fn rosenbrock_converges_at_default_scale_tolerance() {
    let x0 = [-1.2, 1.0];

    let mut ls = ConjugateGradient::new(
        LiuStorey,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-5, 1000, &x0),
    );
    let mut pr = ConjugateGradient::new(
        PolakRibiere,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-5, 1000, &x0),
    );
    let mut bfgs = bfgs_with(settings(1e-5, 1000, &x0));

    let results = [
        ls.learn(&mut Rosenbrock).unwrap(),
        pr.learn(&mut Rosenbrock).unwrap(),
        bfgs.learn(&mut Rosenbrock).unwrap(),
    ];
    for result in results {
        assert!(
            result.termination.is_converged(),
            "{:?}",
            result.termination
        );
        assert!(result.iterations < 200, "iterations = {}", result.iterations);
        assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-4);
    }
}

#[test]
fn bfgs_solves_rosenbrock() {
    let mut bfgs = bfgs_with(settings(1e-8, 500, &[-1.2, 1.0]));
    let result = bfgs.learn(&mut Rosenbrock).unwrap();

    assert_ne!(result.termination, TerminationReason::MaxIterations);
    assert!(result.termination.is_converged(), "{:?}", result.termination);
    assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-5);
}

// ============================================================
// End-to-end
// ============================================================

#[test]
fn bfgs_end_to_end_shifted_quadratic() {
    let mut obj = FnObjective::new(2, |x: &[f64]| {
        let a = x[0] - 3.0;
        let b = x[1] + 1.0;
        (a * a + b * b, vec![2.0 * a, 2.0 * b])
    });
    let mut bfgs = bfgs_with(settings(1e-8, 50, &[0.0, 0.0]));
    let result = bfgs.learn(&mut obj).unwrap();

    assert_abs_diff_eq!(result.x[0], 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.x[1], -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.value, 0.0, epsilon = 1e-10);
    assert!(result.termination.is_converged());
    assert_eq!(result.func_evals, obj.func_evals());
}

// ============================================================
// Anytime behavior and configuration
// ============================================================

#[test]
fn current_best_is_available_mid_run() {
    let mut bfgs = bfgs_with(settings(1e-10, 100, &[-1.2, 1.0]));
    let mut obj = Rosenbrock;
    assert!(bfgs.current_best().is_none());

    bfgs.initialize(&mut obj).unwrap();
    let mut last = bfgs.current_best().unwrap().output;
    assert_relative_eq!(last, 24.2, epsilon = 1e-12);

    for _ in 0..5 {
        bfgs.step(&mut obj).unwrap();
        let best = bfgs.current_best().unwrap().output;
        assert!(best <= last, "{} > {}", best, last);
        last = best;
    }

    let snapshot = bfgs.result().unwrap();
    assert_eq!(snapshot.iterations, 5);
    assert_eq!(snapshot.value, last);
}

#[test]
fn iteration_budget_is_a_normal_termination() {
    let mut pr = ConjugateGradient::new(
        PolakRibiere,
        WolfeLineMinimizer::<f64>::default(),
        settings(1e-12, 3, &[-1.2, 1.0]),
    );
    let result = pr.learn(&mut Rosenbrock).unwrap();
    assert_eq!(result.termination, TerminationReason::MaxIterations);
    assert_eq!(result.iterations, 3);

    // Further steps do nothing.
    assert_eq!(
        pr.step(&mut Rosenbrock).unwrap(),
        StepStatus::Finished(TerminationReason::MaxIterations)
    );
    assert_eq!(pr.iteration(), 3);
}

#[test]
fn start_at_minimum_takes_no_steps() {
    let mut bfgs = BfgsMinimizer::<f64>::bfgs();
    bfgs.set_initial_guess(Some(vec![1.0, 1.0]));
    let result = bfgs.learn(&mut Rosenbrock).unwrap();
    assert_eq!(result.termination, TerminationReason::GradientNorm);
    assert_eq!(result.iterations, 0);
    assert_eq!(result.func_evals, 1);
}

#[test]
fn missing_initial_guess_starts_at_origin() {
    let mut ls = LiuStoreyMinimizer::<f64>::liu_storey();
    ls.initialize(&mut Rosenbrock).unwrap();
    let start = ls.current_best().unwrap();
    assert_eq!(start.input, vec![0.0, 0.0]);
    assert_eq!(start.output, 1.0);
}

#[test]
fn configuration_errors_surface_immediately() {
    let mut bfgs = BfgsMinimizer::<f64>::bfgs();
    assert_eq!(
        bfgs.set_tolerance(-1.0).unwrap_err(),
        MinimizeError::InvalidTolerance { tolerance: -1.0 }
    );
    assert_eq!(
        bfgs.set_max_iterations(0).unwrap_err(),
        MinimizeError::InvalidMaxIterations { max_iterations: 0 }
    );

    bfgs.set_initial_guess(Some(vec![1.0, 2.0, 3.0]));
    assert_eq!(
        bfgs.learn(&mut Rosenbrock).unwrap_err(),
        MinimizeError::DimensionMismatch {
            expected: 2,
            found: 3
        }
    );
}

#[test]
fn step_before_initialize_is_an_error() {
    let mut pr = PolakRibiereMinimizer::<f64>::polak_ribiere();
    assert_eq!(
        pr.step(&mut Rosenbrock).unwrap_err(),
        MinimizeError::NotInitialized
    );
}

#[test]
fn non_finite_start_reports_numerical_error() {
    let mut obj = FnObjective::new(1, |x: &[f64]| (f64::NAN, vec![x[0]]));
    let mut bfgs = BfgsMinimizer::<f64>::bfgs();
    bfgs.set_initial_guess(Some(vec![1.0]));
    let result = bfgs.learn(&mut obj).unwrap();
    assert_eq!(result.termination, TerminationReason::NumericalError);
    assert_eq!(result.iterations, 0);
}
