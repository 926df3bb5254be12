use minimizer::Objective;

// ─── Rosenbrock ────────────────────────────────────────────────────────────
// Chained form: Σ_i (1 - x_i)² + 100·(x_{i+1} - x_i²)², minimum at (1, ..., 1).

pub struct Rosenbrock {
    pub dim: usize,
}

impl Objective<f64> for Rosenbrock {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let n = x.len();
        let mut f = 0.0;
        let mut g = vec![0.0; n];
        for i in 0..n - 1 {
            let t1 = 1.0 - x[i];
            let t2 = x[i + 1] - x[i] * x[i];
            f += t1 * t1 + 100.0 * t2 * t2;
            g[i] += -2.0 * t1 - 400.0 * x[i] * t2;
            g[i + 1] += 200.0 * t2;
        }
        (f, g)
    }
}

// ─── PDE Poisson Residual ──────────────────────────────────────────────────
// 1D Poisson residual: Σ_i r_i², where r_i = -u_{i-1} + 2u_i - u_{i+1} - h²
// x = interior node values, Dirichlet BCs u_0 = u_{N+1} = 0, h = 1/(N+1)

pub struct PoissonResidual {
    pub dim: usize,
}

fn residuals(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h = 1.0 / (n as f64 + 1.0);
    (0..n)
        .map(|i| {
            let u_prev = if i == 0 { 0.0 } else { x[i - 1] };
            let u_next = if i == n - 1 { 0.0 } else { x[i + 1] };
            2.0 * x[i] - u_prev - u_next - h * h
        })
        .collect()
}

impl Objective<f64> for PoissonResidual {
    fn dim(&self) -> usize {
        self.dim
    }

    fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
        let r = residuals(x);
        let n = x.len();
        let f = r.iter().map(|ri| ri * ri).sum();
        // ∇f = 2 Kᵀ r with K = tridiag(-1, 2, -1), which is symmetric.
        let g = (0..n)
            .map(|i| {
                let r_prev = if i == 0 { 0.0 } else { r[i - 1] };
                let r_next = if i == n - 1 { 0.0 } else { r[i + 1] };
                2.0 * (2.0 * r[i] - r_prev - r_next)
            })
            .collect();
        (f, g)
    }
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 2 == 0 { -1.2 } else { 1.0 })
        .collect()
}
