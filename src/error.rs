use thiserror::Error;

/// Everything that can go wrong while building or solving the board's Markov chain.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /*********        CONFIGURATION        *********/
    #[error("dice need at least one face")]
    NoDiceFaces,
    #[error("at least one die must be rolled")]
    NoDice,
    #[error("dice configuration has too many outcomes ({faces} faces, {count} dice)")]
    TooManyDiceOutcomes { faces: usize, count: u32 },
    #[error("board has no squares")]
    EmptyBoard,
    #[error("square name `{name}` appears at both {first} and {second}")]
    DuplicateSquare {
        name: String,
        first: usize,
        second: usize,
    },
    #[error("board has no square named `{0}`")]
    UnknownSquare(String),
    #[error("square `{0}` draws a card, so it cannot also be a station")]
    StationOnCardSquare(String),
    #[error("the {0} deck has no cards")]
    EmptyDeck(&'static str),
    #[error("the {0} deck has more cards than can be counted")]
    DeckTooLarge(&'static str),
    #[error("the {0} deck advances to the nearest station, but the board has no stations")]
    NoStations(&'static str),
    #[error("square index {index} is out of range for a board of {size} squares")]
    SquareOutOfRange { index: usize, size: usize },
    #[error("at least one card draw must be allowed per landing")]
    NoCardDraws,
    #[error("{requested} card draws per landing requested, at most {max} are allowed")]
    TooManyCardDraws { requested: u32, max: u32 },

    /*********        INVARIANT VIOLATIONS        *********/
    #[error("transition row {row} sums to {sum} instead of 1")]
    RowNotStochastic { row: usize, sum: f64 },
    #[error("transition row {row} has a negative entry {value} in column {column}")]
    NegativeProbability { row: usize, column: usize, value: f64 },
    #[error("resolved destination {index} is outside a board of {size} squares")]
    DestinationOutOfBounds { index: usize, size: usize },

    /*********        NUMERICAL        *********/
    #[error("matrix is {rows}x{columns}, expected a square matrix")]
    NotSquare { rows: usize, columns: usize },
    #[error("chain has {closed_classes} closed classes, so no unique stationary distribution exists")]
    NotUnique { closed_classes: usize },
    #[error("linear system is singular (pivot {pivot:e} in column {column})")]
    Singular { column: usize, pivot: f64 },
    #[error("solution residual {residual:e} exceeds tolerance {tolerance:e}")]
    Residual { residual: f64, tolerance: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
