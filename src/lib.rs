//! A backtracking regular expression engine and the pattern workbench
//! built on top of it: templates, a preset library, builder helpers and a
//! static checker.
//!
//! ```no_run
//! use regex_workbench::{Engine, Flags, SearchOptions};
//!
//! let engine = Engine::default();
//! let report = engine
//!     .find_all((r"(\d+)-(\d+)", Flags::global()), "12-34 56-78", SearchOptions::default())
//!     .unwrap();
//! assert_eq!(report.count, 2);
//! ```

pub mod ast;
pub mod builder;
pub mod charset;
pub mod checker;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod flags;
pub mod library;
pub mod parser;
pub mod templates;
pub mod vm;

pub use engine::{
    Engine, EngineConfig, EngineStats, Pattern, PatternRef, SearchOptions, SearchReport, TestReport,
    ValidationResult,
};
pub use error::{CompileError, EngineError, MatchTimeout, ParseError, ParseErrorKind};
pub use flags::Flags;
pub use vm::{Capture, Match};
