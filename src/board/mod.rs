mod details;
pub use details::*;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cards::{CardEffect, Deck, DeckKind, DeckSpec};
use crate::error::{Error, Result};

/// How many card draws a single landing may trigger unless the board says otherwise.
pub const DEFAULT_MAX_CARD_DRAWS: u32 = 2;

/// The most card draws a single landing may be configured to trigger.
pub const MAX_CARD_DRAWS: u32 = 64;

fn default_max_card_draws() -> u32 {
    DEFAULT_MAX_CARD_DRAWS
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// What happens to a token that lands on a square.
pub enum SquareKind {
    /// Nothing happens.
    #[default]
    Normal,
    /// The token is sent straight to jail.
    GoToJail,
    /// A card is drawn from the chance deck.
    Chance,
    /// A card is drawn from the community chest deck.
    CommunityChest,
}

impl SquareKind {
    /// The deck drawn from when landing on this kind of square, if any.
    pub fn deck(&self) -> Option<DeckKind> {
        match self {
            SquareKind::Chance => Some(DeckKind::Chance),
            SquareKind::CommunityChest => Some(DeckKind::CommunityChest),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A square as written in a board file.
pub struct SquareSpec {
    pub name: String,
    #[serde(default)]
    pub kind: SquareKind,
    /// Whether this square is a station. When left out, any
    /// square with "Station" in its name is a station.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub station: Option<bool>,
}

impl SquareSpec {
    pub fn new(name: &str, kind: SquareKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            station: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// A board as written in a board file. Squares refer to each other by name.
pub struct BoardSpec {
    /// The squares in the order a token visits them.
    pub squares: Vec<SquareSpec>,
    /// The name of the starting square.
    pub go: String,
    /// The name of the square tokens are sent to by "go to jail" effects.
    pub jail: String,
    #[serde(default)]
    pub chance: DeckSpec,
    #[serde(default)]
    pub community_chest: DeckSpec,
    /// How many card draws one landing may trigger, counting the first.
    #[serde(default = "default_max_card_draws")]
    pub max_card_draws: u32,
}

impl BoardSpec {
    /// Parse a board from YAML.
    pub fn from_yaml(source: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }
}

fn check_card_draws(max_card_draws: u32) -> Result<()> {
    match max_card_draws {
        0 => Err(Error::NoCardDraws),
        requested if requested > MAX_CARD_DRAWS => Err(Error::TooManyCardDraws {
            requested,
            max: MAX_CARD_DRAWS,
        }),
        _ => Ok(()),
    }
}

#[derive(Clone, Debug, PartialEq)]
/// A square on a built board.
pub struct Square {
    pub name: String,
    pub kind: SquareKind,
    pub is_station: bool,
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Clone, Debug)]
/// A cyclic game board. Immutable once built.
pub struct Board {
    squares: Vec<Square>,
    /// Index of every square, keyed by name.
    name_to_index: HashMap<String, usize>,
    go: usize,
    jail: usize,
    chance: Deck,
    community_chest: Deck,
    /// The first station strictly ahead of each square, wrapping around.
    nearest_station: Vec<Option<usize>>,
    max_card_draws: u32,
}

impl Board {
    /*********        INITIALISATION INTERFACES        *********/

    /// Build and validate a board.
    pub fn new(spec: &BoardSpec) -> Result<Board> {
        if spec.squares.is_empty() {
            return Err(Error::EmptyBoard);
        }
        check_card_draws(spec.max_card_draws)?;

        let mut name_to_index = HashMap::with_capacity(spec.squares.len());
        let mut squares = Vec::with_capacity(spec.squares.len());

        for (i, square) in spec.squares.iter().enumerate() {
            if let Some(&first) = name_to_index.get(&square.name) {
                return Err(Error::DuplicateSquare {
                    name: square.name.clone(),
                    first,
                    second: i,
                });
            }
            name_to_index.insert(square.name.clone(), i);

            let is_station = square
                .station
                .unwrap_or_else(|| square.name.contains("Station"));

            // A station that draws a card would be its own nearest-station destination
            if is_station && square.kind.deck().is_some() {
                return Err(Error::StationOnCardSquare(square.name.clone()));
            }

            squares.push(Square {
                name: square.name.clone(),
                kind: square.kind,
                is_station,
            });
        }

        let lookup = |name: &str| {
            name_to_index
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnknownSquare(name.to_owned()))
        };

        let go = lookup(spec.go.as_str())?;
        let jail = lookup(spec.jail.as_str())?;
        let chance = Deck::resolve(DeckKind::Chance, &spec.chance, &lookup)?;
        let community_chest =
            Deck::resolve(DeckKind::CommunityChest, &spec.community_chest, &lookup)?;

        let nearest_station = Board::nearest_stations(&squares);
        let has_stations = squares.iter().any(|s| s.is_station);

        // Decks only need to be usable if some square actually draws from them
        for deck in [&chance, &community_chest] {
            if !squares.iter().any(|s| s.kind.deck() == Some(deck.kind())) {
                continue;
            }
            if deck.is_empty() {
                return Err(Error::EmptyDeck(deck.kind().name()));
            }
            let needs_station = deck
                .cards()
                .iter()
                .any(|c| c.effect == CardEffect::NearestStation);
            if needs_station && !has_stations {
                return Err(Error::NoStations(deck.kind().name()));
            }
        }

        debug!(
            squares = squares.len(),
            go,
            jail,
            max_card_draws = spec.max_card_draws,
            "built board"
        );

        Ok(Board {
            squares,
            name_to_index,
            go,
            jail,
            chance,
            community_chest,
            nearest_station,
            max_card_draws: spec.max_card_draws,
        })
    }

    /// Build the standard 40-square London board.
    pub fn reference() -> Result<Board> {
        Board::new(&REFERENCE_BOARD)
    }

    /// Return a copy of this board that allows `max_card_draws` draws per landing.
    pub fn with_max_card_draws(mut self, max_card_draws: u32) -> Result<Board> {
        check_card_draws(max_card_draws)?;
        self.max_card_draws = max_card_draws;
        Ok(self)
    }

    /// For every square, find the first station strictly ahead of it.
    fn nearest_stations(squares: &[Square]) -> Vec<Option<usize>> {
        let n = squares.len();

        (0..n)
            .map(|from| {
                (1..=n)
                    .map(|distance| (from + distance) % n)
                    .find(|&i| squares[i].is_station)
            })
            .collect()
    }

    /*********        GETTERS        *********/

    /// The number of squares on the board.
    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }

    pub fn squares(&self) -> &[Square] {
        &self.squares
    }

    pub fn square(&self, index: usize) -> &Square {
        &self.squares[index]
    }

    pub fn names(&self) -> Vec<&str> {
        self.squares.iter().map(|s| s.name.as_str()).collect()
    }

    /// The index of the square called `name`.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownSquare(name.to_owned()))
    }

    pub fn go(&self) -> usize {
        self.go
    }

    pub fn jail(&self) -> usize {
        self.jail
    }

    pub fn max_card_draws(&self) -> u32 {
        self.max_card_draws
    }

    /// The deck drawn from by squares of the given kind.
    pub fn deck(&self, kind: DeckKind) -> &Deck {
        match kind {
            DeckKind::Chance => &self.chance,
            DeckKind::CommunityChest => &self.community_chest,
        }
    }

    /*********        MOVEMENT        *********/

    /// The square reached by moving `steps` squares (negative is backwards) from `from`.
    pub fn offset(&self, from: usize, steps: i64) -> usize {
        (from as i64 + steps).rem_euclid(self.len() as i64) as usize
    }

    /// The first station strictly ahead of `from`, wrapping around the board.
    pub fn nearest_station_after(&self, from: usize) -> Option<usize> {
        self.nearest_station.get(from).copied().flatten()
    }

    /// Return `Ok(index)` if `index` is on the board.
    pub fn check_index(&self, index: usize) -> Result<usize> {
        if index < self.len() {
            Ok(index)
        } else {
            Err(Error::SquareOutOfRange {
                index,
                size: self.len(),
            })
        }
    }
}
