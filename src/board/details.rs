use lazy_static::lazy_static;

use super::{BoardSpec, SquareKind, SquareSpec, DEFAULT_MAX_CARD_DRAWS};
use crate::cards::{CardEffectSpec, CardSpec, DeckSpec};

/// The squares of the London board, starting from 'Go' and going clockwise.
/// Card squares are numbered so that every name is unique.
const REFERENCE_SQUARES: [(&str, SquareKind); 40] = [
    ("Go", SquareKind::Normal),
    ("Old Kent Road", SquareKind::Normal),
    ("Community Chest 1", SquareKind::CommunityChest),
    ("Whitechapel Road", SquareKind::Normal),
    ("Income Tax", SquareKind::Normal),
    ("King's Cross Station", SquareKind::Normal),
    ("The Angel Islington", SquareKind::Normal),
    ("Chance 1", SquareKind::Chance),
    ("Euston Road", SquareKind::Normal),
    ("Pentonville Road", SquareKind::Normal),
    ("Jail", SquareKind::Normal),
    ("Pall Mall", SquareKind::Normal),
    ("Electric Company", SquareKind::Normal),
    ("Whitehall", SquareKind::Normal),
    ("Northumberland Avenue", SquareKind::Normal),
    ("Marylebone Station", SquareKind::Normal),
    ("Bow Street", SquareKind::Normal),
    ("Community Chest 2", SquareKind::CommunityChest),
    ("Marlborough Street", SquareKind::Normal),
    ("Vine Street", SquareKind::Normal),
    ("Free Parking", SquareKind::Normal),
    ("Strand", SquareKind::Normal),
    ("Chance 2", SquareKind::Chance),
    ("Fleet Street", SquareKind::Normal),
    ("Trafalgar Square", SquareKind::Normal),
    ("Fenchurch Street Station", SquareKind::Normal),
    ("Leicester Square", SquareKind::Normal),
    ("Coventry Street", SquareKind::Normal),
    ("Water Works", SquareKind::Normal),
    ("Piccadilly", SquareKind::Normal),
    ("Go to Jail", SquareKind::GoToJail),
    ("Regent Street", SquareKind::Normal),
    ("Oxford Street", SquareKind::Normal),
    ("Community Chest 3", SquareKind::CommunityChest),
    ("Bond Street", SquareKind::Normal),
    ("Liverpool Street Station", SquareKind::Normal),
    ("Chance 3", SquareKind::Chance),
    ("Park Lane", SquareKind::Normal),
    ("Super Tax", SquareKind::Normal),
    ("Mayfair", SquareKind::Normal),
];

/// Squares that one chance card each sends the token to.
pub const CHANCE_DESTINATIONS: [&str; 6] = [
    "Go",
    "Mayfair",
    "Jail",
    "Trafalgar Square",
    "Pall Mall",
    "King's Cross Station",
];

/// Squares that one community chest card each sends the token to.
pub const COMMUNITY_CHEST_DESTINATIONS: [&str; 2] = ["Go", "Jail"];

fn advance_to(square: &str) -> CardSpec {
    CardSpec::new(
        CardEffectSpec::AdvanceTo {
            square: square.to_owned(),
        },
        1,
    )
}

lazy_static! {
    /// The 16 chance cards, grouped by what they do to the token.
    pub static ref CHANCE_DECK: DeckSpec = {
        let mut cards: Vec<CardSpec> = CHANCE_DESTINATIONS.iter().map(|&s| advance_to(s)).collect();

        // "Advance to the nearest station" occurs twice in the deck
        cards.push(CardSpec::new(CardEffectSpec::NearestStation, 2));
        cards.push(CardSpec::new(CardEffectSpec::Move { steps: -3 }, 1));
        // Cards that only cost or pay money
        cards.push(CardSpec::new(CardEffectSpec::Stay, 7));

        DeckSpec::new(cards)
    };

    /// The 16 community chest cards, grouped by what they do to the token.
    pub static ref COMMUNITY_CHEST_DECK: DeckSpec = {
        let mut cards: Vec<CardSpec> = COMMUNITY_CHEST_DESTINATIONS
            .iter()
            .map(|&s| advance_to(s))
            .collect();

        cards.push(CardSpec::new(CardEffectSpec::Stay, 14));

        DeckSpec::new(cards)
    };

    /// The London board with its standard decks.
    pub static ref REFERENCE_BOARD: BoardSpec = BoardSpec {
        squares: REFERENCE_SQUARES
            .iter()
            .map(|&(name, kind)| SquareSpec::new(name, kind))
            .collect(),
        go: "Go".to_owned(),
        jail: "Jail".to_owned(),
        chance: CHANCE_DECK.clone(),
        community_chest: COMMUNITY_CHEST_DECK.clone(),
        max_card_draws: DEFAULT_MAX_CARD_DRAWS,
    };
}
