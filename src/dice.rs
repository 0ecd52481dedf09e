use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
/// The dice rolled every turn. Every die has the same faces.
pub struct DiceConfig {
    /// The value printed on each face of a die.
    pub faces: Vec<u32>,
    /// The number of dice rolled at once.
    pub count: u32,
}

impl Default for DiceConfig {
    /// Two ordinary six-sided dice.
    fn default() -> Self {
        Self {
            faces: (1..=6).collect(),
            count: 2,
        }
    }
}

impl DiceConfig {
    /// Return a config for `count` dice with the given faces.
    pub fn new(faces: Vec<u32>, count: u32) -> Self {
        Self { faces, count }
    }

    /// Reject configurations that can't produce a distribution.
    pub fn validate(&self) -> Result<()> {
        if self.faces.is_empty() {
            return Err(Error::NoDiceFaces);
        }
        if self.count == 0 {
            return Err(Error::NoDice);
        }

        Ok(())
    }

    /// Roll every die once and return the sum.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        (0..self.count)
            .map(|_| self.faces[rng.gen_range(0..self.faces.len())] as usize)
            .sum()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
/// A possible outcome of rolling the dice.
pub struct DiceRoll {
    /// The sum of all the dice.
    pub sum: usize,
    /// The probability of the dice adding up to `sum`.
    pub probability: f64,
}

#[derive(Clone, Debug)]
/// The probability mass function of the sum of the dice.
pub struct DiceDistribution {
    config: DiceConfig,
    /// Every reachable sum, in ascending order.
    rolls: Vec<DiceRoll>,
}

impl DiceDistribution {
    /// Build the distribution of the sum of `config.count` dice.
    pub fn new(config: DiceConfig) -> Result<Self> {
        config.validate()?;

        let face_count = config.faces.len();
        let total = (face_count as u64)
            .checked_pow(config.count)
            .ok_or(Error::TooManyDiceOutcomes {
                faces: face_count,
                count: config.count,
            })?;

        // Number of ordered combinations that produce each sum. Each die
        // extends every combination of the previous dice by one face.
        let mut ways: BTreeMap<usize, u64> = BTreeMap::from([(0, 1)]);
        for _ in 0..config.count {
            let mut next = BTreeMap::new();
            for (&sum, &count) in &ways {
                for &face in &config.faces {
                    *next.entry(sum + face as usize).or_insert(0) += count;
                }
            }
            ways = next;
        }

        let rolls = ways
            .into_iter()
            .map(|(sum, count)| DiceRoll {
                sum,
                probability: count as f64 / total as f64,
            })
            .collect::<Vec<_>>();

        debug!(
            dice = config.count,
            faces = face_count,
            outcomes = total,
            sums = rolls.len(),
            "built dice distribution"
        );

        Ok(Self { config, rolls })
    }

    /// The dice this distribution was built from.
    pub fn config(&self) -> &DiceConfig {
        &self.config
    }

    /// Every reachable sum with its probability, ascending by sum.
    pub fn rolls(&self) -> &[DiceRoll] {
        &self.rolls
    }

    /// The probability of rolling exactly `sum`.
    pub fn probability(&self, sum: usize) -> f64 {
        self.rolls
            .binary_search_by_key(&sum, |r| r.sum)
            .map(|i| self.rolls[i].probability)
            .unwrap_or(0.)
    }

    pub fn total_probability(&self) -> f64 {
        self.rolls.iter().map(|r| r.probability).sum()
    }

    /// The most likely sum. Ties go to the smallest sum.
    pub fn mode(&self) -> usize {
        self.rolls
            .iter()
            .fold(None::<DiceRoll>, |best, r| match best {
                Some(b) if b.probability >= r.probability => Some(b),
                _ => Some(*r),
            })
            .map(|r| r.sum)
            .unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        self.rolls
            .iter()
            .map(|r| r.sum as f64 * r.probability)
            .sum()
    }

    pub fn min_sum(&self) -> usize {
        self.rolls.first().map(|r| r.sum).unwrap_or(0)
    }

    pub fn max_sum(&self) -> usize {
        self.rolls.last().map(|r| r.sum).unwrap_or(0)
    }
}
