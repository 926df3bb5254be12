pub mod conjugate_gradient;
pub mod quasi_newton;
