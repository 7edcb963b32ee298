//! Derivative-free minimisation
//!
//! The smoothing and ARIMA models pick their parameters by minimising a sum
//! of squared errors over a transformed (unconstrained) parameter space.
//! Nelder-Mead is enough for the two or three dimensions involved.

use crate::{MathError, Result};

/// Nelder-Mead simplex minimiser
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    /// Maximum number of simplex iterations
    pub max_iterations: usize,
    /// Stop once the spread of function values across the simplex drops below this
    pub tolerance: f64,
    /// Offset applied to each coordinate to build the initial simplex
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-10,
            initial_step: 0.5,
        }
    }
}

/// Best point found by a minimisation run
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    /// Location of the minimum
    pub point: Vec<f64>,
    /// Objective value at `point`
    pub value: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Whether the tolerance was reached before `max_iterations`
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Create a minimiser with the given iteration budget and tolerance
    pub fn new(max_iterations: usize, tolerance: f64) -> Result<Self> {
        if max_iterations == 0 {
            return Err(MathError::InvalidInput(
                "max_iterations must be greater than zero".to_string(),
            ));
        }
        if !(tolerance > 0.0) {
            return Err(MathError::InvalidInput(
                "tolerance must be positive".to_string(),
            ));
        }

        Ok(Self {
            max_iterations,
            tolerance,
            ..Self::default()
        })
    }

    /// Minimise `objective` starting from `start`.
    ///
    /// Non-finite objective values are treated as `+inf`, so the simplex moves
    /// away from regions where the model blows up. Running out of iterations
    /// is not an error; the best vertex is returned with `converged = false`.
    pub fn minimize<F>(&self, mut objective: F, start: &[f64]) -> Result<Minimum>
    where
        F: FnMut(&[f64]) -> f64,
    {
        if start.is_empty() {
            return Err(MathError::InvalidInput(
                "Starting point must have at least one dimension".to_string(),
            ));
        }

        let mut eval = |x: &[f64]| {
            let value = objective(x);
            if value.is_finite() {
                value
            } else {
                f64::INFINITY
            }
        };

        let dim = start.len();
        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
        simplex.push(start.to_vec());
        for i in 0..dim {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            // order vertices best to worst
            let mut order: Vec<usize> = (0..=dim).collect();
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.iter().map(|&i| simplex[i].clone()).collect();
            values = order.iter().map(|&i| values[i]).collect();

            let best = values[0];
            let worst = values[dim];
            if best.is_finite() && (worst - best).abs() <= self.tolerance * (1.0 + best.abs()) {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..dim)
                .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
                .collect();
            let towards = |coefficient: f64, from: &[f64]| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(from)
                    .map(|(c, x)| c + coefficient * (c - x))
                    .collect()
            };

            let reflected = towards(REFLECTION, &simplex[dim]);
            let reflected_value = eval(&reflected);

            if reflected_value < values[0] {
                let expanded = towards(EXPANSION, &simplex[dim]);
                let expanded_value = eval(&expanded);
                if expanded_value < reflected_value {
                    simplex[dim] = expanded;
                    values[dim] = expanded_value;
                } else {
                    simplex[dim] = reflected;
                    values[dim] = reflected_value;
                }
                continue;
            }

            if reflected_value < values[dim - 1] {
                simplex[dim] = reflected;
                values[dim] = reflected_value;
                continue;
            }

            let contracted = if reflected_value < values[dim] {
                towards(CONTRACTION, &simplex[dim])
            } else {
                towards(-CONTRACTION, &simplex[dim])
            };
            let contracted_value = eval(&contracted);
            if contracted_value < values[dim].min(reflected_value) {
                simplex[dim] = contracted;
                values[dim] = contracted_value;
                continue;
            }

            // shrink everything towards the best vertex
            let best_vertex = simplex[0].clone();
            for i in 1..=dim {
                simplex[i] = best_vertex
                    .iter()
                    .zip(&simplex[i])
                    .map(|(b, x)| b + SHRINK * (x - b))
                    .collect();
                values[i] = eval(&simplex[i]);
            }
        }

        let (best_index, best_value) = values
            .iter()
            .copied()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .ok_or_else(|| MathError::CalculationError("Empty simplex".to_string()))?;

        if !best_value.is_finite() {
            return Err(MathError::CalculationError(
                "Objective is not finite anywhere on the simplex".to_string(),
            ));
        }

        Ok(Minimum {
            point: simplex[best_index].clone(),
            value: best_value,
            iterations,
            converged,
        })
    }
}

/// Map an unconstrained value into (0, 1)
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Inverse of [`logistic`], clamping the input away from 0 and 1
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}
