//! Long-run square occupancy of a token on a Monopoly-style board.
//!
//! Movement is modelled as a Markov chain: [`transition::TransitionMatrix`]
//! combines a [`dice::DiceDistribution`] with the board's card decks, and
//! [`steady_state::solve`] finds its stationary distribution. The
//! [`simulation`] module walks a token around the same board to check the
//! result empirically.

pub mod board;
pub mod cards;
pub mod dice;
pub mod error;
pub mod simulation;
pub mod steady_state;
pub mod transition;

pub use board::{Board, BoardSpec, SquareKind};
pub use dice::{DiceConfig, DiceDistribution};
pub use error::{Error, Result};
pub use simulation::{simulate, SimulationConfig, SimulationOutcome, Simulator};
pub use steady_state::{cross_check, solve, SteadyState};
pub use transition::{RowPolicy, TransitionMatrix};

/// Build the transition matrix for `dice` on `board` and solve its steady state.
pub fn exact_steady_state(
    board: &Board,
    dice: &DiceConfig,
    policy: RowPolicy,
) -> Result<(TransitionMatrix, SteadyState)> {
    let distribution = DiceDistribution::new(dice.clone())?;
    let matrix = TransitionMatrix::build(board, &distribution, policy)?;
    let steady = solve(&matrix)?;

    Ok((matrix, steady))
}
