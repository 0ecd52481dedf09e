use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transition::TransitionMatrix;

/// How far `pi * P` may stray from `pi` in any entry.
pub const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Pivots smaller than this make the system singular.
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Clone, Debug, PartialEq, Serialize)]
/// The long-run fraction of turns a token ends on each square.
pub struct SteadyState {
    probabilities: Vec<f64>,
    /// `max |pi * P - pi|` of the solution.
    residual: f64,
}

impl SteadyState {
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn get(&self, square: usize) -> f64 {
        self.probabilities[square]
    }

    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Square indexes with their probabilities, most likely first.
    pub fn ranked(&self) -> Vec<(usize, f64)> {
        rank(&self.probabilities)
    }

    /// The largest difference between this distribution and `other` on any square.
    pub fn max_abs_difference(&self, other: &[f64]) -> f64 {
        max_abs_difference(&self.probabilities, other)
    }
}

/// Indexes of `probabilities` sorted by descending probability.
pub fn rank(probabilities: &[f64]) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    ranked
}

/// The largest entry-wise difference between `a` and `b`. NaN if any difference is NaN.
pub fn max_abs_difference(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0., |max, d| if d > max || d.is_nan() { d } else { max })
}

/*********        SOLVER        *********/

/// Solve for the stationary distribution `pi` of `matrix`, where `pi * P = pi` and `sum(pi) = 1`.
///
/// Transposing gives `(P^T - I) x = 0`, which has rank `n - 1` when the
/// distribution is unique. The last equation is replaced by `sum(x) = 1` to
/// pin down the scale, and the system is solved by Gaussian elimination.
pub fn solve(matrix: &TransitionMatrix) -> Result<SteadyState> {
    let n = matrix.size();

    let closed = closed_classes(matrix);
    if closed.len() != 1 {
        return Err(Error::NotUnique {
            closed_classes: closed.len(),
        });
    }

    // A = P^T - I
    let mut a: Vec<Vec<f64>> = (0..n)
        .map(|r| {
            (0..n)
                .map(|c| matrix.get(c, r) - if r == c { 1. } else { 0. })
                .collect()
        })
        .collect();
    a[n - 1] = vec![1.; n];

    let mut b = vec![0.; n];
    b[n - 1] = 1.;

    let mut probabilities = gaussian_solve(a, b)?;

    // Round-off can leave transient squares slightly negative
    for p in probabilities.iter_mut() {
        *p = p.max(0.);
    }
    let total: f64 = probabilities.iter().sum();
    for p in probabilities.iter_mut() {
        *p /= total;
    }

    let residual = check_residual(matrix, &probabilities, RESIDUAL_TOLERANCE)?;

    debug!(states = n, residual, "solved steady state");

    Ok(SteadyState {
        probabilities,
        residual,
    })
}

/// Return `max |pi * P - pi|`, failing if it is above `tolerance` or NaN.
fn check_residual(matrix: &TransitionMatrix, probabilities: &[f64], tolerance: f64) -> Result<f64> {
    let residual = max_abs_difference(&matrix.step(probabilities), probabilities);
    if residual.is_nan() || residual > tolerance {
        return Err(Error::Residual {
            residual,
            tolerance,
        });
    }

    Ok(residual)
}

/// Solve the stationary distribution a second way and return its largest
/// difference from `steady`.
///
/// A column of ones is appended to `P - I`, turning `pi * P = pi, sum(pi) = 1`
/// into `pi * M = (0, ..., 0, 1)`. Its least-squares solution through the
/// pseudo-inverse of `M` solves `(M * M^T) pi^T = M * (0, ..., 0, 1)^T`, and
/// the right-hand side is the ones column.
pub fn cross_check(matrix: &TransitionMatrix, steady: &SteadyState) -> Result<f64> {
    let n = matrix.size();
    let shifted = |i: usize, j: usize| matrix.get(i, j) - if i == j { 1. } else { 0. };

    // M * M^T = (P - I)(P - I)^T + 1 * 1^T
    let gram: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| (0..n).map(|k| shifted(i, k) * shifted(j, k)).sum::<f64>() + 1.)
                .collect()
        })
        .collect();

    let pseudo = gaussian_solve(gram, vec![1.; n])?;
    let difference = steady.max_abs_difference(&pseudo);

    debug!(difference, "cross-checked steady state against pseudo-inverse");

    Ok(difference)
}

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
fn gaussian_solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n {
        return Err(Error::NotSquare {
            rows: a.len(),
            columns: n,
        });
    }
    if let Some(row) = a.iter().find(|row| row.len() != n) {
        return Err(Error::NotSquare {
            rows: n,
            columns: row.len(),
        });
    }

    for column in 0..n {
        // Use the largest remaining entry in this column as the pivot
        let pivot_row = (column..n)
            .max_by(|&i, &j| a[i][column].abs().total_cmp(&a[j][column].abs()))
            .unwrap_or(column);
        let pivot = a[pivot_row][column];

        if pivot.abs() < PIVOT_EPSILON {
            return Err(Error::Singular { column, pivot });
        }

        a.swap(column, pivot_row);
        b.swap(column, pivot_row);

        for row in column + 1..n {
            let factor = a[row][column] / pivot;
            if factor == 0. {
                continue;
            }
            for k in column..n {
                a[row][k] -= factor * a[column][k];
            }
            b[row] -= factor * b[column];
        }
    }

    // Back substitution
    let mut x = vec![0.; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}

/*********        CHAIN STRUCTURE        *********/

/// The closed communicating classes of the chain: sets of states that
/// reach each other and can't be left. A chain has a unique stationary
/// distribution exactly when it has one closed class.
pub fn closed_classes(matrix: &TransitionMatrix) -> Vec<Vec<usize>> {
    let n = matrix.size();
    let successors = matrix.successors();

    // reachable[i][j]: j can be reached from i in zero or more steps
    let reachable: Vec<Vec<bool>> = (0..n)
        .map(|start| {
            let mut seen = vec![false; n];
            let mut stack = vec![start];
            seen[start] = true;

            while let Some(i) = stack.pop() {
                for &j in &successors[i] {
                    if !seen[j] {
                        seen[j] = true;
                        stack.push(j);
                    }
                }
            }

            seen
        })
        .collect();

    let mut assigned = vec![false; n];
    let mut classes = vec![];

    for i in 0..n {
        if assigned[i] {
            continue;
        }

        let class: Vec<usize> = (0..n)
            .filter(|&j| reachable[i][j] && reachable[j][i])
            .collect();
        for &j in &class {
            assigned[j] = true;
        }

        // Closed when nothing outside the class is reachable from it
        let closed = (0..n).all(|j| !reachable[i][j] || reachable[j][i]);
        if closed {
            classes.push(class);
        }
    }

    classes
}
