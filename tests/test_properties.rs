//! Property-based tests for the dice, transition matrix and solver.

use proptest::prelude::*;

use monopoly_markov::board::SquareSpec;
use monopoly_markov::cards::{CardEffectSpec, CardSpec, DeckSpec};
use monopoly_markov::{
    solve, Board, BoardSpec, DiceConfig, DiceDistribution, Error, RowPolicy, SquareKind,
    TransitionMatrix,
};

/// Strategy: a small die with arbitrary (possibly repeated) faces, rolled a few times.
fn dice_strategy() -> impl Strategy<Value = DiceConfig> {
    (prop::collection::vec(0..20u32, 1..8), 1..4u32)
        .prop_map(|(faces, count)| DiceConfig::new(faces, count))
}

/// Strategy: a random board with Go, Jail and a station in front and random squares after.
fn board_strategy() -> impl Strategy<Value = BoardSpec> {
    (
        prop::collection::vec(0..4u8, 2..28),
        -6..6i64,
        -6..6i64,
        1..4u32,
    )
        .prop_map(|(kinds, chance_steps, chest_steps, max_card_draws)| {
            let mut squares = vec![
                SquareSpec::new("Go", SquareKind::Normal),
                SquareSpec::new("Jail", SquareKind::Normal),
                SquareSpec::new("Central Station", SquareKind::Normal),
            ];
            for (i, kind) in kinds.into_iter().enumerate() {
                let kind = match kind {
                    0 => SquareKind::Normal,
                    1 => SquareKind::GoToJail,
                    2 => SquareKind::Chance,
                    _ => SquareKind::CommunityChest,
                };
                squares.push(SquareSpec::new(&format!("Square {}", i), kind));
            }

            let advance = |square: &str| {
                CardSpec::new(
                    CardEffectSpec::AdvanceTo {
                        square: square.to_owned(),
                    },
                    1,
                )
            };

            BoardSpec {
                squares,
                go: "Go".to_owned(),
                jail: "Jail".to_owned(),
                chance: DeckSpec::new(vec![
                    advance("Go"),
                    advance("Jail"),
                    CardSpec::new(CardEffectSpec::NearestStation, 2),
                    CardSpec::new(CardEffectSpec::Move { steps: chance_steps }, 1),
                    CardSpec::new(CardEffectSpec::Stay, 11),
                ]),
                community_chest: DeckSpec::new(vec![
                    advance("Go"),
                    advance("Jail"),
                    CardSpec::new(CardEffectSpec::Move { steps: chest_steps }, 1),
                    CardSpec::new(CardEffectSpec::Stay, 13),
                ]),
                max_card_draws,
            }
        })
}

proptest! {
    // 1. Dice distributions always sum to 1
    #[test]
    fn dice_sum_to_one(config in dice_strategy()) {
        let dist = DiceDistribution::new(config).unwrap();
        prop_assert!((dist.total_probability() - 1.).abs() < 1e-9);
        prop_assert!(dist.rolls().iter().all(|r| r.probability > 0.));
    }

    // 2. Consecutive faces give a distribution symmetric about the midpoint
    #[test]
    fn dice_symmetric(sides in 1..10u32, count in 1..4u32) {
        let dist = DiceDistribution::new(DiceConfig::new((1..=sides).collect(), count)).unwrap();
        let (min, max) = (dist.min_sum(), dist.max_sum());

        for offset in 0..=(max - min) {
            let low = dist.probability(min + offset);
            let high = dist.probability(max - offset);
            prop_assert!((low - high).abs() < 1e-12, "P({}) != P({})", min + offset, max - offset);
        }
    }

    // 3. The reference board stays row-stochastic under any dice
    #[test]
    fn reference_rows_stochastic(config in dice_strategy()) {
        let board = Board::reference().unwrap();
        let dist = DiceDistribution::new(config).unwrap();
        let matrix = TransitionMatrix::build(&board, &dist, RowPolicy::Strict).unwrap();

        for row in matrix.rows() {
            prop_assert!((row.iter().sum::<f64>() - 1.).abs() < 1e-9);
        }
    }

    // 4. Random boards stay row-stochastic, and any solution is stationary
    #[test]
    fn random_boards_solve(spec in board_strategy()) {
        let board = Board::new(&spec).unwrap();
        let dist = DiceDistribution::new(DiceConfig::default()).unwrap();
        let matrix = TransitionMatrix::build(&board, &dist, RowPolicy::Strict).unwrap();

        for row in matrix.rows() {
            prop_assert!((row.iter().sum::<f64>() - 1.).abs() < 1e-9);
            prop_assert!(row.iter().all(|&p| p >= 0.));
        }

        match solve(&matrix) {
            Ok(steady) => {
                let pi = steady.probabilities();
                prop_assert!((pi.iter().sum::<f64>() - 1.).abs() < 1e-9);
                prop_assert!(pi.iter().all(|&p| p >= 0.));
                prop_assert!(steady.max_abs_difference(&matrix.step(pi)) < 1e-6);
            }
            Err(err) => prop_assert!(matches!(err, Error::NotUnique { .. }), "{}", err),
        }
    }

    // 5. Building is a pure function of its inputs
    #[test]
    fn build_is_deterministic(spec in board_strategy()) {
        let board = Board::new(&spec).unwrap();
        let dist = DiceDistribution::new(DiceConfig::default()).unwrap();

        let first = TransitionMatrix::build(&board, &dist, RowPolicy::Strict).unwrap();
        let second = TransitionMatrix::build(&board, &dist, RowPolicy::Strict).unwrap();
        prop_assert_eq!(first, second);
    }
}
