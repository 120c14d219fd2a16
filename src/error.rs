//! Error types shared by the parser, compiler, matcher and engine facade.

use serde::Serialize;
use thiserror::Error;

/// Category of a pattern syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    /// `[` without a closing `]`.
    UnterminatedCharClass,
    /// `(` without a closing `)`, or a `)` with no matching `(`.
    UnterminatedGroup,
    /// Quantifier with nothing to repeat, `{m,n}` with `m > n`, or a count too large.
    InvalidQuantifier,
    /// Metacharacter with no operand, e.g. a trailing `\`.
    DanglingMetacharacter,
    /// Two named groups share a name.
    DuplicateGroupName,
    /// Backreference to a group not opened before it.
    UnknownGroupReference,
    /// Unrecognized `(?...)` construct.
    InvalidGroup,
    /// Group name that is empty or not an identifier.
    InvalidGroupName,
    /// Class range whose start is greater than its end.
    InvalidCharRange,
    /// Malformed `\x`, `\u` or `\k` escape.
    InvalidEscape,
    /// Groups nested deeper than the parser accepts.
    NestingTooDeep,
}

impl ParseErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedCharClass => "unterminated character class",
            ParseErrorKind::UnterminatedGroup => "unterminated group",
            ParseErrorKind::InvalidQuantifier => "invalid quantifier",
            ParseErrorKind::DanglingMetacharacter => "dangling metacharacter",
            ParseErrorKind::DuplicateGroupName => "duplicate group name",
            ParseErrorKind::UnknownGroupReference => "reference to unknown group",
            ParseErrorKind::InvalidGroup => "invalid group syntax",
            ParseErrorKind::InvalidGroupName => "invalid group name",
            ParseErrorKind::InvalidCharRange => "character class range out of order",
            ParseErrorKind::InvalidEscape => "invalid escape sequence",
            ParseErrorKind::NestingTooDeep => "groups nested too deeply",
        }
    }
}

/// A syntax error with the char offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{} at position {position}: {detail}", .kind.describe())]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: usize,
    pub detail: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, position: usize, detail: impl Into<String>) -> Self {
        ParseError {
            kind,
            position,
            detail: detail.into(),
        }
    }
}

/// Internal compiler invariant breach. Never expected for a parsed AST.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal compiler error: {0}")]
pub struct CompileError(pub String);

/// The matcher exhausted its backtracking budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error("match aborted after exceeding {budget} backtracking steps")]
pub struct MatchTimeout {
    pub budget: u64,
}

/// Errors surfaced by the engine facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid flag '{0}'")]
    InvalidFlag(char),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    MatchTimeout(#[from] MatchTimeout),
}

impl EngineError {
    /// Short machine-readable name for reports.
    pub fn kind_name(&self) -> &'static str {
        match self {
            EngineError::InvalidFlag(_) => "InvalidFlag",
            EngineError::Parse(e) => match e.kind {
                ParseErrorKind::UnterminatedCharClass => "UnterminatedCharClass",
                ParseErrorKind::UnterminatedGroup => "UnterminatedGroup",
                ParseErrorKind::InvalidQuantifier => "InvalidQuantifier",
                ParseErrorKind::DanglingMetacharacter => "DanglingMetacharacter",
                ParseErrorKind::DuplicateGroupName => "DuplicateGroupName",
                ParseErrorKind::UnknownGroupReference => "UnknownGroupReference",
                ParseErrorKind::InvalidGroup => "InvalidGroup",
                ParseErrorKind::InvalidGroupName => "InvalidGroupName",
                ParseErrorKind::InvalidCharRange => "InvalidCharRange",
                ParseErrorKind::InvalidEscape => "InvalidEscape",
                ParseErrorKind::NestingTooDeep => "NestingTooDeep",
            },
            EngineError::Compile(_) => "CompileError",
            EngineError::MatchTimeout(_) => "MatchTimeout",
        }
    }
}
