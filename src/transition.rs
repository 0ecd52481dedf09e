use tracing::{debug, warn};

use crate::board::Board;
use crate::cards::LandingResolver;
use crate::dice::DiceDistribution;
use crate::error::{Error, Result};

/// How far a row's sum may stray from 1.
pub const ROW_TOLERANCE: f64 = 1e-9;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
/// What to do with a row that doesn't sum to 1.
pub enum RowPolicy {
    /// Fail with `Error::RowNotStochastic`.
    #[default]
    Strict,
    /// Divide the row by its sum and log a warning.
    Renormalize,
}

#[derive(Clone, Debug, PartialEq)]
/// A row-stochastic matrix where entry `(i, j)` is the probability
/// of a token on square `i` ending its turn on square `j`.
pub struct TransitionMatrix {
    size: usize,
    /// Row-major entries.
    data: Vec<f64>,
}

impl TransitionMatrix {
    /*********        INITIALISATION INTERFACES        *********/

    /// Build the transition matrix of a token rolling `dice` on `board`.
    pub fn build(board: &Board, dice: &DiceDistribution, policy: RowPolicy) -> Result<Self> {
        let size = board.len();
        let resolver = LandingResolver::new(board)?;
        let mut data = vec![0.; size * size];

        for (start, row) in data.chunks_mut(size).enumerate() {
            for roll in dice.rolls() {
                let landing = (start + roll.sum) % size;
                resolver.resolve(landing, roll.probability, row)?;
            }

            check_row(start, row, policy)?;
        }

        debug!(size, ?policy, "built transition matrix");

        Ok(Self { size, data })
    }

    /// Wrap existing rows, checking that they form a square, row-stochastic matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>, policy: RowPolicy) -> Result<Self> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);

        for row in rows {
            if row.len() != size {
                return Err(Error::NotSquare {
                    rows: size,
                    columns: row.len(),
                });
            }
            data.extend(row);
        }

        if size > 0 {
            for (i, row) in data.chunks_mut(size).enumerate() {
                check_row(i, row, policy)?;
            }
        }

        Ok(Self { size, data })
    }

    /*********        GETTERS        *********/

    /// The number of states (squares).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.size..(i + 1) * self.size]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // `chunks(0)` panics, and an empty matrix has no rows anyway
        self.data.chunks(self.size.max(1))
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.size + j]
    }

    /*********        CHAIN OPERATIONS        *********/

    /// Advance a distribution over squares by one turn (`pi * P`).
    pub fn step(&self, distribution: &[f64]) -> Vec<f64> {
        let mut next = vec![0.; self.size];

        for (p, row) in distribution.iter().zip(self.rows()) {
            for (n, q) in next.iter_mut().zip(row) {
                *n += p * q;
            }
        }

        next
    }

    /// For every state, the states reachable from it in one step.
    pub fn successors(&self) -> Vec<Vec<usize>> {
        self.rows()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &p)| p > 0.)
                    .map(|(j, _)| j)
                    .collect()
            })
            .collect()
    }
}

/// Check that `row` is a probability distribution, fixing its sum if `policy` allows.
fn check_row(index: usize, row: &mut [f64], policy: RowPolicy) -> Result<()> {
    if let Some((column, &value)) = row.iter().enumerate().find(|&(_, &p)| p < 0. || p.is_nan()) {
        return Err(Error::NegativeProbability {
            row: index,
            column,
            value,
        });
    }

    let sum: f64 = row.iter().sum();
    if (sum - 1.).abs() <= ROW_TOLERANCE {
        return Ok(());
    }

    match policy {
        RowPolicy::Renormalize if sum > 0. && sum.is_finite() => {
            warn!(row = index, sum, "transition row is not stochastic, renormalizing");
            for p in row.iter_mut() {
                *p /= sum;
            }
            Ok(())
        }
        _ => Err(Error::RowNotStochastic { row: index, sum }),
    }
}
