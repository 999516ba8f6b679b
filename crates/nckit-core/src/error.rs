//! Error handling for NCKit
//!
//! Provides error types for every stage of program interpretation:
//! - Lex errors (unrecognized text on a line)
//! - Parse errors (malformed commands on a line)
//! - Simulation errors (commands that cannot be applied)
//! - Job errors (lifecycle, cancellation, unreadable programs)
//! - Index errors (selection lookups)
//!
//! Lex, parse and simulation errors are per-line and non-fatal; the
//! interpreter turns them into diagnostics and keeps going.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::data::{Axis, MoveId, Plane};

/// Lexical error type
///
/// Produced by the tokenizer for text it cannot turn into a token.
/// Columns are 0-based character offsets into the line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    /// Character that starts no known token
    #[error("Unexpected character '{found}' at column {column}")]
    UnexpectedCharacter {
        /// Column of the character.
        column: usize,
        /// The offending character.
        found: char,
    },

    /// Address letter not followed by a number
    #[error("Address '{letter}' at column {column} has no value")]
    MissingValue {
        /// Column of the letter.
        column: usize,
        /// The address letter.
        letter: char,
    },

    /// Number text that does not parse
    #[error("Invalid number '{text}' for address '{letter}' at column {column}")]
    InvalidNumber {
        /// Column of the letter.
        column: usize,
        /// The address letter.
        letter: char,
        /// The raw number text.
        text: String,
    },
}

/// Parse error type
///
/// Represents malformed commands within one line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// G or M code this interpreter does not know
    #[error("Unknown code {letter}{code}")]
    UnknownCode {
        /// 'G' or 'M'.
        letter: char,
        /// The code number as written.
        code: String,
    },

    /// Two codes of one modal group on a single line
    #[error("{first} and {second} of group '{group}' cannot be used together")]
    ConflictingCodes {
        /// Modal group name.
        group: &'static str,
        /// The code that was kept.
        first: String,
        /// The code that was rejected.
        second: String,
    },

    /// Same address given twice within one command
    #[error("Duplicate '{letter}' word")]
    DuplicateWord {
        /// The repeated address letter.
        letter: char,
    },

    /// Word value out of range
    #[error("Invalid value {value} for '{letter}': {reason}")]
    InvalidValue {
        /// The address letter.
        letter: char,
        /// The value as parsed.
        value: f64,
        /// Why the value is rejected.
        reason: String,
    },

    /// Code that needs a word that is missing
    #[error("{code} needs a '{letter}' word")]
    MissingWord {
        /// The code, e.g. "G4".
        code: String,
        /// The missing address letter.
        letter: char,
    },

    /// Word that has no command to belong to
    #[error("'{letter}' word is not valid here: {reason}")]
    UnexpectedWord {
        /// The address letter.
        letter: char,
        /// Why the word cannot be used.
        reason: String,
    },

    /// Lexical error surfaced through the parser
    #[error(transparent)]
    Lex(#[from] LexError),
}

/// Simulation error type
///
/// A command that parsed correctly but cannot be applied to the machine
/// state. The command is skipped and the state is left unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Arc with neither center offsets nor radius
    #[error("Arc needs center offsets or a radius")]
    ArcUnderspecified,

    /// Center offset word that does not belong to the active plane
    #[error("Arc word {word} is not allowed in the {plane}")]
    InvalidArcWord {
        /// The offending word letter (I, J or K).
        word: char,
        /// The active plane.
        plane: Plane,
    },

    /// Start and end points are not equidistant from the center
    #[error("Arc radius mismatch: start radius {start_radius:.4}, end radius {end_radius:.4}")]
    ArcRadiusMismatch {
        /// Distance from center to start.
        start_radius: f64,
        /// Distance from center to end.
        end_radius: f64,
    },

    /// Radius-form arc whose radius cannot reach the end point
    #[error("Arc radius {radius:.4} is too small for chord length {chord:.4}")]
    ArcRadiusTooSmall {
        /// Requested radius.
        radius: f64,
        /// Chord between start and end.
        chord: f64,
    },

    /// Radius-form arc that ends where it starts
    #[error("Radius-form arc cannot describe a full circle")]
    ArcFullCircleRadius,

    /// Arc with a zero radius
    #[error("Arc has zero radius")]
    ArcZeroRadius,

    /// Non-finite coordinate produced by a command
    #[error("Axis {axis} would move to a non-finite position")]
    NonFinitePosition {
        /// The axis that overflowed.
        axis: Axis,
    },
}

/// Job lifecycle error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
    /// The processing run was cancelled before publishing
    #[error("Processing of '{identity}' was cancelled")]
    Cancelled {
        /// Identity of the cancelled program.
        identity: String,
    },

    /// The processing run was replaced by a newer load
    #[error("Processing run {generation} was superseded")]
    Superseded {
        /// Generation of the discarded run.
        generation: u64,
    },

    /// The program source could not be read
    #[error("Cannot read program '{identity}': {reason}")]
    Unreadable {
        /// File identity.
        identity: String,
        /// The reason reading failed.
        reason: String,
    },

    /// Reload requested with no program bound
    #[error("No program loaded")]
    NoProgram,

    /// Background processing requested outside an async runtime
    #[error("No async runtime available for background processing")]
    NoRuntime,
}

/// Selection index error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Lookup through an index whose move list has been replaced
    #[error(
        "Selection index for generation {index_generation} is stale \
         (current generation {current_generation})"
    )]
    Stale {
        /// Generation the index was built for.
        index_generation: u64,
        /// Generation currently published.
        current_generation: u64,
    },

    /// Move index past the end of the move list
    #[error("Move index {index} out of range (move count {len})")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Number of moves.
        len: usize,
    },

    /// Identifier not present in the move list
    #[error("Unknown move {id}")]
    UnknownMove {
        /// Requested identifier.
        id: MoveId,
    },

    /// No move list has been published yet
    #[error("No processed program available")]
    NotReady,
}
