use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::board::{Board, SquareKind};
use crate::error::{Error, Result};

/*********        DECK SPECS        *********/

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
/// What a card does to the token, with destinations referred to by name.
pub enum CardEffectSpec {
    /// The token doesn't move.
    Stay,
    /// The token moves to the named square.
    AdvanceTo { square: String },
    /// The token moves to the first station ahead of it.
    NearestStation,
    /// The token moves by `steps` squares. Negative steps move backwards.
    Move { steps: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// `count` identical cards in a deck.
pub struct CardSpec {
    #[serde(flatten)]
    pub effect: CardEffectSpec,
    pub count: u32,
}

impl CardSpec {
    pub fn new(effect: CardEffectSpec, count: u32) -> Self {
        Self { effect, count }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
/// A deck as written in a board file.
pub struct DeckSpec {
    pub cards: Vec<CardSpec>,
}

impl DeckSpec {
    pub fn new(cards: Vec<CardSpec>) -> Self {
        Self { cards }
    }
}

/*********        RESOLVED DECKS        *********/

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The two decks on a board.
pub enum DeckKind {
    Chance,
    CommunityChest,
}

impl DeckKind {
    pub fn name(&self) -> &'static str {
        match self {
            DeckKind::Chance => "chance",
            DeckKind::CommunityChest => "community chest",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// What a card does to the token, with destinations resolved to square indexes.
pub enum CardEffect {
    Stay,
    AdvanceTo(usize),
    NearestStation,
    Move(i64),
}

impl CardEffect {
    /// The square a token drawing this card on `landing` is moved to. Returns
    /// `None` for a nearest-station card on a board without stations.
    pub fn destination(&self, board: &Board, landing: usize) -> Option<usize> {
        match *self {
            CardEffect::Stay => Some(landing),
            CardEffect::AdvanceTo(square) => Some(square),
            CardEffect::NearestStation => board.nearest_station_after(landing),
            CardEffect::Move(steps) => Some(board.offset(landing, steps)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub effect: CardEffect,
    /// The number of copies of this card in the deck.
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq)]
/// A shuffled deck that is drawn from with replacement.
pub struct Deck {
    kind: DeckKind,
    cards: Vec<Card>,
    /// The total number of cards in the deck.
    total: u32,
}

impl Deck {
    /// Resolve the square names in `spec` with `lookup`.
    pub fn resolve<F>(kind: DeckKind, spec: &DeckSpec, lookup: &F) -> Result<Deck>
    where
        F: Fn(&str) -> Result<usize>,
    {
        let cards = spec
            .cards
            .iter()
            .map(|card| {
                let effect = match &card.effect {
                    CardEffectSpec::Stay => CardEffect::Stay,
                    CardEffectSpec::AdvanceTo { square } => CardEffect::AdvanceTo(lookup(square.as_str())?),
                    CardEffectSpec::NearestStation => CardEffect::NearestStation,
                    CardEffectSpec::Move { steps } => CardEffect::Move(*steps),
                };

                Ok(Card {
                    effect,
                    count: card.count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let total = cards
            .iter()
            .try_fold(0u32, |total, c| total.checked_add(c.count))
            .ok_or(Error::DeckTooLarge(kind.name()))?;

        Ok(Deck { kind, cards, total })
    }

    pub fn kind(&self) -> DeckKind {
        self.kind
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// The probability of drawing any one copy of `card`.
    pub fn probability(&self, card: &Card) -> f64 {
        card.count as f64 / self.total as f64
    }

    /// The destination of `card` drawn on `landing`.
    pub fn destination(&self, card: &Card, board: &Board, landing: usize) -> Result<usize> {
        card.effect
            .destination(board, landing)
            .ok_or(Error::NoStations(self.kind.name()))
    }
}

/*********        RESOLVER        *********/

/// Add `mass` to `row[index]`.
fn accumulate(row: &mut [f64], index: usize, mass: f64) -> Result<()> {
    let size = row.len();
    let cell = row
        .get_mut(index)
        .ok_or(Error::DestinationOutOfBounds { index, size })?;
    *cell += mass;
    Ok(())
}

#[derive(Clone, Debug)]
/// Where a token that lands on each square of a board ends its turn.
///
/// Landing on 'go to jail' sends the token to jail. Landing on a card square
/// splits the token over the deck's cards, and every card that moves the
/// token is dispatched again on the square it moves to. This lets a "go back
/// 3 squares" card that lands on a community chest square draw from that deck
/// too. At most `board.max_card_draws()` cards are drawn per landing; past
/// that the token stays where the last card put it.
///
/// Outcomes are built one draw at a time. A card square with `k` draws left
/// only depends on the outcomes with `k - 1` draws left, so each card square
/// is resolved once per draw rather than once per chain of cards.
pub struct LandingResolver<'a> {
    board: &'a Board,
    /// For every card square, the distribution of squares the token ends on.
    outcomes: Vec<Option<Vec<f64>>>,
}

impl<'a> LandingResolver<'a> {
    pub fn new(board: &'a Board) -> Result<Self> {
        let size = board.len();
        // With no draws left a card square keeps the token
        let mut outcomes: Vec<Option<Vec<f64>>> = vec![None; size];

        for draws_left in 1..=board.max_card_draws() {
            let mut next = Vec::with_capacity(size);

            for landing in 0..size {
                let deck = match board.square(landing).kind.deck() {
                    Some(kind) => board.deck(kind),
                    None => {
                        next.push(None);
                        continue;
                    }
                };

                let mut outcome = vec![0.; size];
                for card in deck.cards() {
                    let share = deck.probability(card);

                    match card.effect {
                        CardEffect::Stay => accumulate(&mut outcome, landing, share)?,
                        _ => {
                            let destination = deck.destination(card, board, landing)?;
                            settle(board, &outcomes, destination, share, &mut outcome)?;
                        }
                    }
                }
                next.push(Some(outcome));
            }

            if next == outcomes {
                trace!(draws_left, "card outcomes settled before the draw limit");
                break;
            }
            outcomes = next;
        }

        Ok(Self { board, outcomes })
    }

    pub fn board(&self) -> &Board {
        self.board
    }

    /// Spread the probability `mass` of a token landing on `landing` over the
    /// squares it ends its turn on, adding the result to `row`.
    pub fn resolve(&self, landing: usize, mass: f64, row: &mut [f64]) -> Result<()> {
        let landing = self.board.check_index(landing)?;
        settle(self.board, &self.outcomes, landing, mass, row)
    }
}

/// Send `mass` landing on `landing` to where `outcomes` says it ends up.
fn settle(
    board: &Board,
    outcomes: &[Option<Vec<f64>>],
    landing: usize,
    mass: f64,
    row: &mut [f64],
) -> Result<()> {
    if board.square(landing).kind == SquareKind::GoToJail {
        return accumulate(row, board.jail(), mass);
    }

    match &outcomes[landing] {
        Some(outcome) => {
            for (square, &p) in outcome.iter().enumerate().filter(|&(_, &p)| p > 0.) {
                accumulate(row, square, mass * p)?;
            }
            Ok(())
        }
        None => accumulate(row, landing, mass),
    }
}

/// Resolve a single landing. Use a [`LandingResolver`] to resolve many.
pub fn resolve_landing(board: &Board, landing: usize, mass: f64, row: &mut [f64]) -> Result<()> {
    LandingResolver::new(board)?.resolve(landing, mass, row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardSpec, SquareSpec, CHANCE_DESTINATIONS, MAX_CARD_DRAWS};

    fn resolved_row(board: &Board, landing: usize, mass: f64) -> Vec<f64> {
        let mut row = vec![0.; board.len()];
        resolve_landing(board, landing, mass, &mut row).unwrap();
        row
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    /// A line of chance squares whose only moving card steps back one square.
    fn chance_chain(max_card_draws: u32) -> Board {
        let spec = BoardSpec {
            squares: vec![
                SquareSpec::new("Go", SquareKind::Normal),
                SquareSpec::new("C1", SquareKind::Chance),
                SquareSpec::new("C2", SquareKind::Chance),
                SquareSpec::new("C3", SquareKind::Chance),
                SquareSpec::new("Jail", SquareKind::Normal),
            ],
            go: "Go".to_owned(),
            jail: "Jail".to_owned(),
            chance: DeckSpec::new(vec![
                CardSpec::new(CardEffectSpec::Move { steps: -1 }, 1),
                CardSpec::new(CardEffectSpec::Stay, 1),
            ]),
            community_chest: DeckSpec::default(),
            max_card_draws,
        };
        Board::new(&spec).unwrap()
    }

    #[test]
    fn test_go_to_jail() {
        let board = Board::reference().unwrap();
        let row = resolved_row(&board, 30, 0.25);

        assert_eq!(row[10], 0.25);
        assert_eq!(row.iter().sum::<f64>(), 0.25);
    }

    #[test]
    fn test_normal_square_keeps_mass() {
        let board = Board::reference().unwrap();
        let row = resolved_row(&board, 24, 0.5);

        assert_eq!(row[24], 0.5);
        assert_eq!(row.iter().filter(|&&p| p != 0.).count(), 1);
    }

    #[test]
    fn test_chance_shares() {
        let board = Board::reference().unwrap();
        let row = resolved_row(&board, 7, 1.);

        let fixed: f64 = CHANCE_DESTINATIONS
            .iter()
            .map(|name| row[board.index_of(name).unwrap()])
            .sum();
        let station = row[15];
        // Back three from 'Chance 1' is 'Income Tax', a plain square
        let back_three = row[4];
        let stay = row[7];

        assert!(close(fixed, 6. / 16.));
        assert!(close(station, 2. / 16.));
        assert!(close(back_three, 1. / 16.));
        assert!(close(stay, 7. / 16.));
        assert!(close(fixed + station + back_three + stay, 1.));
        assert!(close(row.iter().sum(), 1.));
    }

    #[test]
    fn test_chance_back_three_draws_community_chest() {
        let board = Board::reference().unwrap();
        let row = resolved_row(&board, 36, 1.);

        // 'Go' and 'Jail': one chance card each, plus one community chest
        // card each after going back three to 'Community Chest 3'
        assert!(close(row[0], 1. / 16. + 1. / 256.));
        assert!(close(row[10], 1. / 16. + 1. / 256.));
        assert!(close(row[33], 14. / 256.));
        // Nearest station wraps around to 'King's Cross Station', which also has its own card
        assert!(close(row[5], 3. / 16.));
        assert!(close(row[36], 7. / 16.));
        assert!(close(row.iter().sum(), 1.));
    }

    #[test]
    fn test_single_draw_limit_stops_composition() {
        let board = Board::reference().unwrap().with_max_card_draws(1).unwrap();
        let row = resolved_row(&board, 36, 1.);

        assert!(close(row[33], 1. / 16.));
        assert!(close(row[0], 1. / 16.));
    }

    #[test]
    fn test_community_chest_shares() {
        let board = Board::reference().unwrap();
        let row = resolved_row(&board, 17, 0.5);

        assert!(close(row[0], 0.5 / 16.));
        assert!(close(row[10], 0.5 / 16.));
        assert!(close(row[17], 0.5 * 14. / 16.));
        assert!(close(row.iter().sum(), 0.5));
    }

    #[test]
    fn test_chained_draws_respect_limit() {
        let row = resolved_row(&chance_chain(2), 3, 1.);
        assert!(close(row[3], 0.5));
        assert!(close(row[2], 0.25));
        assert!(close(row[1], 0.25));
        assert_eq!(row[0], 0.);

        let row = resolved_row(&chance_chain(3), 3, 1.);
        assert!(close(row[1], 0.125));
        assert!(close(row[0], 0.125));
    }

    #[test]
    fn test_card_onto_go_to_jail_goes_to_jail() {
        let spec = BoardSpec {
            squares: vec![
                SquareSpec::new("Go", SquareKind::Normal),
                SquareSpec::new("Police", SquareKind::GoToJail),
                SquareSpec::new("Chance", SquareKind::Chance),
                SquareSpec::new("Jail", SquareKind::Normal),
            ],
            go: "Go".to_owned(),
            jail: "Jail".to_owned(),
            chance: DeckSpec::new(vec![CardSpec::new(CardEffectSpec::Move { steps: -1 }, 1)]),
            community_chest: DeckSpec::default(),
            max_card_draws: 1,
        };
        let board = Board::new(&spec).unwrap();
        let row = resolved_row(&board, 2, 1.);

        assert_eq!(row, vec![0., 0., 0., 1.]);
    }

    /// A ring of chance squares whose cards step forward, step back or stay.
    fn chance_ring(size: usize, max_card_draws: u32) -> Board {
        let spec = BoardSpec {
            squares: (0..size)
                .map(|i| SquareSpec::new(&format!("C{}", i), SquareKind::Chance))
                .collect(),
            go: "C0".to_owned(),
            jail: "C0".to_owned(),
            chance: DeckSpec::new(vec![
                CardSpec::new(CardEffectSpec::Move { steps: 1 }, 1),
                CardSpec::new(CardEffectSpec::Move { steps: -1 }, 1),
                CardSpec::new(CardEffectSpec::Stay, 2),
            ]),
            community_chest: DeckSpec::default(),
            max_card_draws,
        };
        Board::new(&spec).unwrap()
    }

    #[test]
    fn test_deepest_draw_limit_resolves() {
        // Every card chain branches twice per draw, so this only finishes
        // when outcomes are shared between chains
        let board = chance_ring(6, MAX_CARD_DRAWS);
        let resolver = LandingResolver::new(&board).unwrap();

        for landing in 0..6 {
            let mut row = vec![0.; 6];
            resolver.resolve(landing, 1., &mut row).unwrap();

            assert!(close(row.iter().sum(), 1.));
            assert!(row.iter().all(|&p| p > 0.));
            // Stepping forward and back are equally likely
            assert!(close(row[(landing + 1) % 6], row[(landing + 5) % 6]));
        }
    }

    #[test]
    fn test_shallow_ring_matches_card_chains() {
        // Two draws: stay, or step once and draw again on the next square,
        // where a second step uses up the last draw
        let board = chance_ring(6, 2);
        let row = resolved_row(&board, 3, 1.);

        assert!(close(row[3], 0.5 + 2. * 0.25 * 0.25));
        assert!(close(row[2], 0.25 * 0.5));
        assert!(close(row[4], 0.25 * 0.5));
        assert!(close(row[1], 0.25 * 0.25));
        assert!(close(row[5], 0.25 * 0.25));
        assert!(close(row.iter().sum(), 1.));
    }

    #[test]
    fn test_resolve_rejects_landing_off_board() {
        let board = chance_chain(2);
        let resolver = LandingResolver::new(&board).unwrap();
        let mut row = vec![0.; 5];

        assert_eq!(
            resolver.resolve(5, 1., &mut row).unwrap_err(),
            Error::SquareOutOfRange { index: 5, size: 5 }
        );
    }

    #[test]
    fn test_accumulate_out_of_bounds() {
        let mut row = vec![0.; 3];
        assert_eq!(
            accumulate(&mut row, 3, 0.1).unwrap_err(),
            Error::DestinationOutOfBounds { index: 3, size: 3 }
        );
    }
}
