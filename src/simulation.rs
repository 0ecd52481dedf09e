//! Monte Carlo random walk of a single token.
//!
//! The walk rolls the raw dice and draws one concrete card per card square,
//! following the same landing rules that the transition matrix spreads out
//! as probabilities. Its occupancy frequencies should converge to the
//! steady state.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::{debug, info};

use crate::board::{Board, SquareKind};
use crate::cards::{CardEffect, DeckKind};
use crate::dice::DiceConfig;
use crate::error::{Error, Result};
use crate::steady_state::max_abs_difference;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SimulationConfig {
    /// The number of batches to run.
    pub batches: u64,
    /// The number of moves in each batch.
    pub batch_size: u64,
    /// The square the token starts on.
    pub start: usize,
    /// Seed for the random number generator.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            batches: 3000,
            batch_size: 1000,
            start: 0,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// The total number of moves simulated, saturating at `u64::MAX`.
    pub fn total_moves(&self) -> u64 {
        self.batches.saturating_mul(self.batch_size)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// Progress of the walk after a batch.
pub struct BatchReport {
    /// Batches completed so far, starting at 1.
    pub batch: u64,
    /// Moves simulated so far.
    pub moves: u64,
    /// Largest difference between the occupancy so far and the exact steady state, if known.
    pub distance: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
/// The result of a whole simulation run.
pub struct SimulationOutcome {
    /// The fraction of moves that ended on each square.
    pub occupancy: Vec<f64>,
    pub reports: Vec<BatchReport>,
}

/// A token walking around a board.
pub struct Simulator<'a> {
    board: &'a Board,
    dice: DiceConfig,
    rng: StdRng,
    /// Card samplers, `None` for decks without cards.
    chance: Option<WeightedIndex<u32>>,
    community_chest: Option<WeightedIndex<u32>>,
    /// The square the token is currently on.
    position: usize,
    /// The number of moves that ended on each square.
    visits: Vec<u64>,
    moves: u64,
}

impl<'a> Simulator<'a> {
    /*********        INITIALISATION INTERFACES        *********/

    /// Return a new simulator with the token on `start`.
    pub fn new(board: &'a Board, dice: DiceConfig, start: usize, seed: u64) -> Result<Self> {
        dice.validate()?;
        let position = board.check_index(start)?;

        let sampler = |kind: DeckKind| {
            WeightedIndex::<u32>::new(board.deck(kind).cards().iter().map(|c| c.count)).ok()
        };

        Ok(Self {
            board,
            dice,
            rng: StdRng::seed_from_u64(seed),
            chance: sampler(DeckKind::Chance),
            community_chest: sampler(DeckKind::CommunityChest),
            position,
            visits: vec![0; board.len()],
            moves: 0,
        })
    }

    /*********        GETTERS        *********/

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn moves(&self) -> u64 {
        self.moves
    }

    pub fn visits(&self) -> &[u64] {
        &self.visits
    }

    /// The fraction of moves so far that ended on each square.
    pub fn occupancy(&self) -> Vec<f64> {
        if self.moves == 0 {
            return vec![0.; self.visits.len()];
        }

        self.visits
            .iter()
            .map(|&v| v as f64 / self.moves as f64)
            .collect()
    }

    /*********        MOVEMENT        *********/

    /// Roll the dice, move the token and record where it ends up.
    pub fn step(&mut self) -> Result<usize> {
        let roll = self.dice.roll(&mut self.rng);
        let landing = (self.position + roll) % self.board.len();

        self.position = self.settle(landing)?;
        self.visits[self.position] += 1;
        self.moves += 1;

        Ok(self.position)
    }

    /// Apply the effect of the square the token landed on, drawing cards as needed.
    fn settle(&mut self, mut landing: usize) -> Result<usize> {
        let board = self.board;
        let mut draws = 0;

        loop {
            let square = board.square(landing);
            if square.kind == SquareKind::GoToJail {
                return Ok(board.jail());
            }

            let kind = match square.kind.deck() {
                Some(kind) if draws < board.max_card_draws() => kind,
                _ => return Ok(landing),
            };

            let deck = board.deck(kind);
            let card = deck.cards()[self.draw(kind)?];
            draws += 1;

            if card.effect == CardEffect::Stay {
                return Ok(landing);
            }
            landing = deck.destination(&card, board, landing)?;
        }
    }

    /// Draw a card from the deck, returning its index in `Deck::cards()`.
    fn draw(&mut self, kind: DeckKind) -> Result<usize> {
        let sampler = match kind {
            DeckKind::Chance => &self.chance,
            DeckKind::CommunityChest => &self.community_chest,
        };
        let sampler = sampler.as_ref().ok_or(Error::EmptyDeck(kind.name()))?;

        Ok(sampler.sample(&mut self.rng))
    }

    /// Make `size` moves.
    pub fn run_batch(&mut self, size: u64) -> Result<()> {
        for _ in 0..size {
            self.step()?;
        }
        Ok(())
    }

    /// Run `batches` batches of `batch_size` moves, reporting after each
    /// batch how far the occupancy is from `exact`, if given.
    pub fn run(
        &mut self,
        batches: u64,
        batch_size: u64,
        exact: Option<&[f64]>,
    ) -> Result<Vec<BatchReport>> {
        let mut reports = vec![];

        for batch in 1..=batches {
            self.run_batch(batch_size)?;

            let distance = exact.map(|e| max_abs_difference(&self.occupancy(), e));
            debug!(batch, moves = self.moves, ?distance, "finished batch");

            reports.push(BatchReport {
                batch,
                moves: self.moves,
                distance,
            });
        }

        Ok(reports)
    }
}

/// Walk a token around `board` as described by `config`.
pub fn simulate(
    board: &Board,
    dice: &DiceConfig,
    config: &SimulationConfig,
    exact: Option<&[f64]>,
) -> Result<SimulationOutcome> {
    let mut simulator = Simulator::new(board, dice.clone(), config.start, config.seed)?;
    let reports = simulator.run(config.batches, config.batch_size, exact)?;

    info!(
        moves = simulator.moves(),
        distance = ?reports.last().and_then(|r| r.distance),
        "simulation finished"
    );

    Ok(SimulationOutcome {
        occupancy: simulator.occupancy(),
        reports,
    })
}
