use log::trace;
use num_traits::Float;

use super::{CachedGradient, LineMinimizer, LineMinimum};
use crate::error::{MinimizeError, Result};
use crate::objective::{DirectionalFunction, LineSample, Objective};

/// Parameters for the strong-Wolfe line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WolfeParams<F> {
    /// Sufficient decrease parameter (default: 1e-4).
    pub c1: F,
    /// Curvature parameter; smaller is a more exact search (default: 0.1).
    pub c2: F,
    /// First trial step (default: 1.0).
    pub initial_step: F,
    /// Growth factor while bracketing (default: 2.0).
    pub expansion: F,
    /// Maximum trial steps while bracketing (default: 50).
    pub max_bracket: usize,
    /// Maximum trial steps while zooming into a bracket (default: 50).
    pub max_zoom: usize,
}

impl Default for WolfeParams<f64> {
    fn default() -> Self {
        WolfeParams {
            c1: 1e-4,
            c2: 0.1,
            initial_step: 1.0,
            expansion: 2.0,
            max_bracket: 50,
            max_zoom: 50,
        }
    }
}

impl Default for WolfeParams<f32> {
    fn default() -> Self {
        WolfeParams {
            c1: 1e-4,
            c2: 0.1,
            initial_step: 1.0,
            expansion: 2.0,
            max_bracket: 30,
            max_zoom: 30,
        }
    }
}

impl<F: Float> WolfeParams<F> {
    /// Check `0 < c1 < c2 < 1`, `initial_step > 0`, `expansion > 1` and
    /// non-zero budgets.
    pub fn validate(&self) -> Result<()> {
        if !(self.c1 > F::zero() && self.c1 < self.c2) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "c1",
                reason: "must satisfy 0 < c1 < c2",
            });
        }
        if !(self.c2 < F::one()) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "c2",
                reason: "must be below 1",
            });
        }
        if !(self.initial_step > F::zero()) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "initial_step",
                reason: "must be positive",
            });
        }
        if !(self.expansion > F::one()) {
            return Err(MinimizeError::InvalidLineSearch {
                name: "expansion",
                reason: "must exceed 1",
            });
        }
        if self.max_bracket == 0 || self.max_zoom == 0 {
            return Err(MinimizeError::InvalidLineSearch {
                name: "max_bracket/max_zoom",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Derivative-based line search satisfying the strong Wolfe conditions.
///
/// Brackets an acceptable step by expansion, then zooms in with safeguarded
/// cubic interpolation (Nocedal & Wright, Alg. 3.5/3.6). Every trial point is
/// differentiated, so the gradient at the accepted point is always returned
/// as the cache.
#[derive(Debug, Clone)]
pub struct WolfeLineMinimizer<F> {
    params: WolfeParams<F>,
}

impl<F: Float> WolfeLineMinimizer<F> {
    pub fn new(params: WolfeParams<F>) -> Result<Self> {
        params.validate()?;
        Ok(WolfeLineMinimizer { params })
    }

    pub fn params(&self) -> &WolfeParams<F> {
        &self.params
    }

    fn sufficient_decrease(&self, sample: &LineSample<F>, value0: F, slope0: F) -> bool {
        sample.value.is_finite() && sample.value <= value0 + self.params.c1 * sample.t * slope0
    }

    fn curvature(&self, sample: &LineSample<F>, slope0: F) -> bool {
        sample.slope.abs() <= F::zero() - self.params.c2 * slope0
    }

    /// Refine a bracket. `lo` satisfies sufficient decrease and has the lowest
    /// value seen; the minimum lies between `lo.t` and `hi.t`.
    fn zoom<O: Objective<F>>(
        &self,
        line: &mut DirectionalFunction<'_, F, O>,
        value0: F,
        slope0: F,
        mut lo: LineSample<F>,
        mut hi: LineSample<F>,
    ) -> Option<LineMinimum<F>> {
        for _ in 0..self.params.max_zoom {
            let width = (hi.t - lo.t).abs();
            if width <= F::epsilon() * lo.t.abs().max(F::one()) {
                break;
            }

            let t = interpolate(&lo, &hi);
            let cur = line.sample(t);
            trace!(
                "wolfe zoom: t = {:?}, phi = {:?}, dphi = {:?}",
                t.to_f64(),
                cur.value.to_f64(),
                cur.slope.to_f64()
            );

            if !self.sufficient_decrease(&cur, value0, slope0) || cur.value >= lo.value {
                hi = cur;
            } else {
                if self.curvature(&cur, slope0) {
                    return Some(accept(cur, line.evals()));
                }
                if cur.slope * (hi.t - lo.t) >= F::zero() {
                    hi = std::mem::replace(&mut lo, cur);
                } else {
                    lo = cur;
                }
            }
        }

        // Out of budget: `lo` still decreases the objective if it moved at all.
        if lo.t > F::zero() {
            trace!("wolfe zoom: budget exhausted, accepting best bracket end");
            Some(accept(lo, line.evals()))
        } else {
            None
        }
    }
}

impl<F: Float> Default for WolfeLineMinimizer<F>
where
    WolfeParams<F>: Default,
{
    fn default() -> Self {
        WolfeLineMinimizer {
            params: WolfeParams::default(),
        }
    }
}

impl<F: Float> LineMinimizer<F> for WolfeLineMinimizer<F> {
    fn minimize_along<O: Objective<F>>(
        &mut self,
        line: &mut DirectionalFunction<'_, F, O>,
        value: F,
        gradient: &[F],
    ) -> Option<LineMinimum<F>> {
        let slope0 = line.initial_slope(gradient);
        if !(slope0 < F::zero()) {
            return None;
        }

        let mut prev = LineSample {
            t: F::zero(),
            x: line.offset().to_vec(),
            value,
            gradient: gradient.to_vec(),
            slope: slope0,
        };
        let mut t = self.params.initial_step;

        for i in 0..self.params.max_bracket {
            let cur = line.sample(t);
            trace!(
                "wolfe bracket: t = {:?}, phi = {:?}, dphi = {:?}",
                t.to_f64(),
                cur.value.to_f64(),
                cur.slope.to_f64()
            );

            if !self.sufficient_decrease(&cur, value, slope0) || (i > 0 && cur.value >= prev.value)
            {
                return self.zoom(line, value, slope0, prev, cur);
            }
            if self.curvature(&cur, slope0) {
                return Some(accept(cur, line.evals()));
            }
            if cur.slope >= F::zero() {
                return self.zoom(line, value, slope0, cur, prev);
            }

            t = t * self.params.expansion;
            prev = cur;
        }

        // Still descending after the whole budget; take the furthest point.
        if prev.t > F::zero() {
            Some(accept(prev, line.evals()))
        } else {
            None
        }
    }
}

fn accept<F: Float>(sample: LineSample<F>, evals: usize) -> LineMinimum<F> {
    LineMinimum {
        input: sample.x.clone(),
        output: sample.value,
        step: sample.t,
        evals,
        last_gradient: Some(CachedGradient {
            input: sample.x,
            gradient: sample.gradient,
        }),
    }
}

/// Trial step inside the bracket: cubic interpolation on both ends, falling
/// back to a quadratic on `lo` and then to bisection. The result is kept at
/// least a tenth of the bracket away from either end.
fn interpolate<F: Float>(lo: &LineSample<F>, hi: &LineSample<F>) -> F {
    let two = F::one() + F::one();
    let three = two + F::one();
    let tenth = F::from(0.1).unwrap_or_else(|| F::one() / (three * three + F::one()));

    let width = hi.t - lo.t;
    let mid = lo.t + width / two;

    let mut trial = None;
    if hi.value.is_finite() && hi.slope.is_finite() {
        let d1 = lo.slope + hi.slope - three * (lo.value - hi.value) / (lo.t - hi.t);
        let disc = d1 * d1 - lo.slope * hi.slope;
        if disc >= F::zero() {
            let d2 = disc.sqrt() * width.signum();
            let t = hi.t - width * (hi.slope + d2 - d1) / (hi.slope - lo.slope + two * d2);
            if t.is_finite() {
                trial = Some(t);
            }
        }
    }
    if trial.is_none() && hi.value.is_finite() {
        let curv = hi.value - lo.value - lo.slope * width;
        if curv > F::zero() {
            let t = lo.t - lo.slope * width * width / (two * curv);
            if t.is_finite() {
                trial = Some(t);
            }
        }
    }

    let t = trial.unwrap_or(mid);
    let left = lo.t.min(hi.t);
    let right = lo.t.max(hi.t);
    let margin = tenth * width.abs();
    t.max(left + margin).min(right - margin)
}
