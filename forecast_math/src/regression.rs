//! Ordinary least squares regression
//!
//! Feature sets built from lagged values are frequently collinear (a noise
//! free trend makes every lag an affine function of the first one). The fit
//! therefore uses a column-pivoted modified Gram-Schmidt QR: columns that add
//! nothing to the span of the ones already chosen get a zero coefficient.

use crate::{ensure_finite, MathError, Result};

/// Relative residual norm below which a column counts as linearly dependent
const RANK_TOLERANCE: f64 = 1e-10;

/// Fitted linear model `y = intercept + coefficients . x`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Vec<f64>,
    rank: usize,
}

impl LinearRegression {
    /// Fit the model to row-major `features` and `targets`
    pub fn fit(features: &[Vec<f64>], targets: &[f64]) -> Result<Self> {
        let n = features.len();
        if n == 0 {
            return Err(MathError::InsufficientData(
                "Cannot fit a regression without observations".to_string(),
            ));
        }
        if targets.len() != n {
            return Err(MathError::InvalidInput(format!(
                "Feature rows ({}) do not match target length ({})",
                n,
                targets.len()
            )));
        }
        let width = features[0].len();
        if features.iter().any(|row| row.len() != width) {
            return Err(MathError::InvalidInput(
                "All feature rows must have the same length".to_string(),
            ));
        }
        for row in features {
            ensure_finite(row, "Feature matrix")?;
        }
        ensure_finite(targets, "Targets")?;

        // column-major design matrix, intercept first
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(width + 1);
        columns.push(vec![1.0; n]);
        for j in 0..width {
            columns.push(features.iter().map(|row| row[j]).collect());
        }

        let beta = solve_least_squares(columns, targets);

        Ok(Self {
            intercept: beta.solution[0],
            coefficients: beta.solution[1..].to_vec(),
            rank: beta.rank,
        })
    }

    /// Predict the target for one feature row
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(MathError::InvalidInput(format!(
                "Expected {} features, got {}",
                self.coefficients.len(),
                row.len()
            )));
        }

        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    /// Coefficient of determination on the given data
    pub fn score(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<f64> {
        let predictions = features
            .iter()
            .map(|row| self.predict(row))
            .collect::<Result<Vec<f64>>>()?;
        r_squared(targets, &predictions)
    }

    /// Intercept term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Feature coefficients; dependent columns are zero
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of independent columns (intercept included)
    pub fn rank(&self) -> usize {
        self.rank
    }
}

struct LeastSquaresSolution {
    solution: Vec<f64>,
    rank: usize,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

fn subtract_scaled(target: &mut [f64], scale: f64, basis: &[f64]) {
    for (t, b) in target.iter_mut().zip(basis) {
        *t -= scale * b;
    }
}

/// Basic least-squares solution via column-pivoted modified Gram-Schmidt
fn solve_least_squares(columns: Vec<Vec<f64>>, targets: &[f64]) -> LeastSquaresSolution {
    let width = columns.len();
    let scale: Vec<f64> = columns.iter().map(|c| norm(c)).collect();
    let mut residual = columns;

    let mut basis: Vec<Vec<f64>> = Vec::new();
    let mut r_rows: Vec<Vec<f64>> = Vec::new();
    let mut order: Vec<usize> = Vec::new();
    let mut remaining: Vec<usize> = (0..width).collect();

    let independent = |j: usize, residual: &[Vec<f64>]| {
        let current = norm(&residual[j]);
        (current > RANK_TOLERANCE * scale[j]).then_some(current)
    };

    loop {
        let pivot = remaining
            .iter()
            .filter_map(|&j| independent(j, &residual).map(|n| (j, n)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(j, _)| j);
        let Some(j) = pivot else { break };
        remaining.retain(|&k| k != j);

        // re-orthogonalise the pivot against the existing basis
        for (k, q) in basis.iter().enumerate() {
            let d = dot(q, &residual[j]);
            r_rows[k][j] += d;
            subtract_scaled(&mut residual[j], d, q);
        }
        let Some(length) = independent(j, &residual) else {
            continue;
        };

        let q: Vec<f64> = residual[j].iter().map(|v| v / length).collect();
        let mut row = vec![0.0; width];
        row[j] = length;
        for &l in &remaining {
            let d = dot(&q, &residual[l]);
            row[l] = d;
            subtract_scaled(&mut residual[l], d, &q);
        }

        basis.push(q);
        r_rows.push(row);
        order.push(j);
    }

    let qty: Vec<f64> = basis.iter().map(|q| dot(q, targets)).collect();
    let mut solution = vec![0.0; width];
    for k in (0..order.len()).rev() {
        let j = order[k];
        let known: f64 = order[k + 1..]
            .iter()
            .map(|&m| r_rows[k][m] * solution[m])
            .sum();
        solution[j] = (qty[k] - known) / r_rows[k][j];
    }

    LeastSquaresSolution {
        solution,
        rank: order.len(),
    }
}

/// Coefficient of determination.
///
/// When the targets have no variance the score is 1 for a perfect fit and 0
/// otherwise.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> Result<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(
            "Actual and predicted values must have the same non-zero length".to_string(),
        ));
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_residual: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_total == 0.0 {
        return Ok(if ss_residual == 0.0 { 1.0 } else { 0.0 });
    }

    Ok(1.0 - ss_residual / ss_total)
}
