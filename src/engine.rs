//! Engine facade: the operations the workbench UI calls.
//!
//! - `validate` parses only and reports the first syntax error.
//! - `compile_pattern` parses and compiles, caching handles by
//!   `(pattern, flags)` in a bounded LRU cache. The `g` flag only affects
//!   searching, so it is left out of both the key and the handle.
//! - `find_all` runs a pattern over a subject text and returns every match
//!   up to a ceiling, with timing.
//! - `test` is the tester's one-shot call: errors are folded into the report.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::compiler::{Program, compile};
use crate::error::{EngineError, MatchTimeout, ParseError};
use crate::flags::Flags;
use crate::parser::parse;
use crate::vm::{self, DEFAULT_STEP_BUDGET, FindAll, Match};

/// Default number of compiled patterns kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

/// Default ceiling on the matches returned by one search.
pub const DEFAULT_MATCH_LIMIT: usize = 1000;

/// Engine-wide settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    pub step_budget: u64,
    pub match_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            step_budget: DEFAULT_STEP_BUDGET,
            match_limit: DEFAULT_MATCH_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_step_budget(mut self, budget: u64) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn with_match_limit(mut self, limit: usize) -> Self {
        self.match_limit = limit;
        self
    }
}

/// Per-call overrides of the engine configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub match_limit: Option<usize>,
    pub step_budget: Option<u64>,
}

/// A compiled pattern. Immutable, so one handle can serve many threads.
///
/// `flags` are the compile-time flags; `global` is always off.
#[derive(Debug)]
pub struct Pattern {
    source: String,
    flags: Flags,
    program: Program,
}

impl Pattern {
    /// Parse and compile without going through an engine cache.
    pub fn new(source: &str, flags: Flags) -> Result<Self, EngineError> {
        let flags = flags.with_global(false);
        let ast = parse(source)?;
        let program = compile(&ast, flags)?;
        Ok(Pattern {
            source: source.to_string(),
            flags,
            program,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn group_count(&self) -> usize {
        self.program.group_count
    }

    /// First match at or after char offset `start`.
    pub fn match_at(&self, text: &str, start: usize, budget: u64) -> Result<Option<Match>, MatchTimeout> {
        vm::match_at(&self.program, text, start, budget)
    }

    pub fn find_iter(&self, text: &str, budget: u64) -> FindAll<'_> {
        vm::find_all(&self.program, text, budget)
    }

    /// Whether `text` contains a match, with the given step budget per attempt.
    pub fn is_match_within(&self, text: &str, budget: u64) -> Result<bool, MatchTimeout> {
        Ok(self.match_at(text, 0, budget)?.is_some())
    }

    /// [`Pattern::is_match_within`] with [`DEFAULT_STEP_BUDGET`]. A handle
    /// does not know which engine compiled it, so `EngineConfig::step_budget`
    /// does not apply; use [`Engine::is_match`] for that.
    pub fn is_match(&self, text: &str) -> Result<bool, MatchTimeout> {
        self.is_match_within(text, DEFAULT_STEP_BUDGET)
    }
}

/// Either a pattern string to compile (through the cache) or a handle.
#[derive(Debug, Clone, Copy)]
pub enum PatternRef<'a> {
    Source(&'a str, Flags),
    Compiled(&'a Pattern),
}

impl<'a> From<(&'a str, Flags)> for PatternRef<'a> {
    fn from((source, flags): (&'a str, Flags)) -> Self {
        PatternRef::Source(source, flags)
    }
}

impl<'a> From<&'a Pattern> for PatternRef<'a> {
    fn from(pattern: &'a Pattern) -> Self {
        PatternRef::Compiled(pattern)
    }
}

impl<'a> From<&'a Arc<Pattern>> for PatternRef<'a> {
    fn from(pattern: &'a Arc<Pattern>) -> Self {
        PatternRef::Compiled(pattern.as_ref())
    }
}

/// Outcome of `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
}

/// Outcome of `find_all`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub pattern: String,
    pub flags: String,
    pub matches: Vec<Match>,
    pub count: usize,
    /// True when more matches existed than the ceiling allowed.
    pub truncated: bool,
    pub elapsed: Duration,
}

/// An error as reported to the tester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportedError {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl From<&EngineError> for ReportedError {
    fn from(err: &EngineError) -> Self {
        ReportedError {
            kind: err.kind_name(),
            message: err.to_string(),
            position: match err {
                EngineError::Parse(e) => Some(e.position),
                _ => None,
            },
        }
    }
}

/// Outcome of `test`: never an `Err`, failures are described inside.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub success: bool,
    pub pattern: String,
    pub flags: String,
    pub matches: Vec<Match>,
    pub count: usize,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReportedError>,
    pub elapsed: Duration,
}

/// Counters exposed for instrumentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub parses: u64,
    pub compiles: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cached_patterns: usize,
}

type CacheKey = (String, Flags);

/// The regex engine facade. Cheap to share behind an `Arc`.
pub struct Engine {
    config: EngineConfig,
    cache: Mutex<LruCache<CacheKey, Arc<Pattern>>>,
    parses: AtomicU64,
    compiles: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Engine {
            config,
            cache: Mutex::new(LruCache::new(capacity)),
            parses: AtomicU64::new(0),
            compiles: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check pattern syntax without compiling.
    pub fn validate(&self, pattern: &str, flags: Flags) -> ValidationResult {
        self.parses.fetch_add(1, Ordering::Relaxed);
        match parse(pattern) {
            Ok(_) => ValidationResult {
                valid: true,
                error: None,
            },
            Err(error) => {
                debug!("pattern {pattern:?} (flags '{flags}') rejected: {error}");
                ValidationResult {
                    valid: false,
                    error: Some(error),
                }
            }
        }
    }

    /// Parse and compile, reusing a cached handle for the same `(pattern, flags)`.
    /// The `g` flag is ignored here.
    pub fn compile_pattern(&self, pattern: &str, flags: Flags) -> Result<Arc<Pattern>, EngineError> {
        let flags = flags.with_global(false);
        let key = (pattern.to_string(), flags);
        if let Some(hit) = self.cache.lock().get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            trace!("pattern cache hit for {pattern:?}");
            return Ok(Arc::clone(hit));
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        // Compile outside the lock; racing callers may both compile, only one entry is kept.
        self.parses.fetch_add(1, Ordering::Relaxed);
        let ast = parse(pattern)?;
        self.compiles.fetch_add(1, Ordering::Relaxed);
        let program = compile(&ast, flags)?;
        debug!(
            "compiled {pattern:?} (flags '{flags}'): {} instructions, {} groups",
            program.insts.len(),
            program.group_count
        );
        let compiled = Arc::new(Pattern {
            source: pattern.to_string(),
            flags,
            program,
        });

        let mut cache = self.cache.lock();
        if let Some(existing) = cache.get(&key) {
            return Ok(Arc::clone(existing));
        }
        if let Some((evicted, _)) = cache.push(key, Arc::clone(&compiled)) {
            trace!("evicted {:?} from pattern cache", evicted.0);
        }
        Ok(compiled)
    }

    /// Every match of `pattern` in `text`, up to the match ceiling.
    pub fn find_all<'a>(
        &self,
        pattern: impl Into<PatternRef<'a>>,
        text: &str,
        options: SearchOptions,
    ) -> Result<SearchReport, EngineError> {
        let started = Instant::now();
        let handle;
        let (pattern, flags) = match pattern.into() {
            PatternRef::Compiled(pattern) => (pattern, pattern.flags()),
            PatternRef::Source(source, flags) => {
                handle = self.compile_pattern(source, flags)?;
                (handle.as_ref(), flags)
            }
        };
        let limit = options.match_limit.unwrap_or(self.config.match_limit);
        let budget = options.step_budget.unwrap_or(self.config.step_budget);
        let (matches, truncated) = self.collect(pattern, text, limit, budget)?;
        Ok(SearchReport {
            pattern: pattern.source().to_string(),
            flags: flags.to_string(),
            count: matches.len(),
            matches,
            truncated,
            elapsed: started.elapsed(),
        })
    }

    fn collect(
        &self,
        pattern: &Pattern,
        text: &str,
        limit: usize,
        budget: u64,
    ) -> Result<(Vec<Match>, bool), EngineError> {
        let mut matches = Vec::new();
        for found in pattern.find_iter(text, budget) {
            let m = found.inspect_err(|timeout| {
                warn!("search for {:?} aborted: {timeout}", pattern.source());
            })?;
            if matches.len() == limit {
                return Ok((matches, true));
            }
            matches.push(m);
        }
        Ok((matches, false))
    }

    /// Run `pattern` against `text` the way the tester does: with the `g`
    /// flag every match is reported, otherwise only the first one.
    pub fn test(&self, pattern: &str, text: &str, flags: &str) -> TestReport {
        let started = Instant::now();
        let outcome = flags
            .parse::<Flags>()
            .and_then(|parsed| self.run_test(pattern, text, parsed));
        let (matches, truncated, error) = match outcome {
            Ok((matches, truncated)) => (matches, truncated, None),
            Err(err) => (Vec::new(), false, Some(ReportedError::from(&err))),
        };
        TestReport {
            success: error.is_none(),
            pattern: pattern.to_string(),
            flags: flags.to_string(),
            count: matches.len(),
            matches,
            truncated,
            error,
            elapsed: started.elapsed(),
        }
    }

    fn run_test(&self, pattern: &str, text: &str, flags: Flags) -> Result<(Vec<Match>, bool), EngineError> {
        let compiled = self.compile_pattern(pattern, flags)?;
        let budget = self.config.step_budget;
        if !flags.global {
            let first = compiled.match_at(text, 0, budget)?;
            return Ok((first.into_iter().collect(), false));
        }
        self.collect(&compiled, text, self.config.match_limit, budget)
    }

    /// Whether `pattern` matches anywhere in `text`, under the configured budget.
    pub fn is_match<'a>(&self, pattern: impl Into<PatternRef<'a>>, text: &str) -> Result<bool, EngineError> {
        let found = match pattern.into() {
            PatternRef::Compiled(pattern) => pattern.is_match_within(text, self.config.step_budget)?,
            PatternRef::Source(source, flags) => self
                .compile_pattern(source, flags)?
                .is_match_within(text, self.config.step_budget)?,
        };
        Ok(found)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            parses: self.parses.load(Ordering::Relaxed),
            compiles: self.compiles.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cached_patterns: self.cache.lock().len(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    #[test]
    fn test_validate_reports_error() {
        let engine = Engine::default();
        let result = engine.validate("(ab", Flags::default());
        assert!(!result.valid);
        assert_eq!(result.error.unwrap().kind, ParseErrorKind::UnterminatedGroup);
        assert!(engine.validate("ab", Flags::default()).valid);
    }

    #[test]
    fn test_cache_eviction_is_lru() {
        let engine = Engine::new(EngineConfig::default().with_cache_capacity(2));
        let a = engine.compile_pattern("a", Flags::default()).unwrap();
        engine.compile_pattern("b", Flags::default()).unwrap();
        // Touch "a" so "b" becomes least recently used.
        engine.compile_pattern("a", Flags::default()).unwrap();
        engine.compile_pattern("c", Flags::default()).unwrap();
        assert_eq!(engine.stats().cached_patterns, 2);
        let again = engine.compile_pattern("a", Flags::default()).unwrap();
        assert!(Arc::ptr_eq(&a, &again));
        let before = engine.stats().parses;
        engine.compile_pattern("b", Flags::default()).unwrap();
        assert_eq!(engine.stats().parses, before + 1);
    }

    #[test]
    fn test_flags_are_part_of_cache_key() {
        let engine = Engine::default();
        let plain = engine.compile_pattern("a", Flags::default()).unwrap();
        let folded = engine.compile_pattern("a", Flags::default().with_case_insensitive(true)).unwrap();
        assert!(!Arc::ptr_eq(&plain, &folded));
        assert!(folded.is_match("A").unwrap());
        assert!(!plain.is_match("A").unwrap());
    }

    #[test]
    fn test_global_flag_shares_cache_entry() {
        let engine = Engine::default();
        let plain = engine.compile_pattern("a", Flags::default()).unwrap();
        let global = engine.compile_pattern("a", Flags::global()).unwrap();
        assert!(Arc::ptr_eq(&plain, &global));
        assert!(!global.flags().global);
        let stats = engine.stats();
        assert_eq!((stats.compiles, stats.cached_patterns), (1, 1));
        let report = engine.find_all(("a", Flags::global()), "aa", SearchOptions::default()).unwrap();
        assert_eq!(report.flags, "g");
        assert_eq!(engine.stats().compiles, 1);
    }

    #[test]
    fn test_is_match_uses_configured_budget() {
        let engine = Engine::new(EngineConfig::default().with_step_budget(1_000));
        let text = "a".repeat(30);
        assert!(matches!(
            engine.is_match(("(a+)+b", Flags::default()), &text),
            Err(EngineError::MatchTimeout(_))
        ));
        assert!(engine.is_match(("a+$", Flags::default()), &text).unwrap());
        let handle = engine.compile_pattern("(a+)+b", Flags::default()).unwrap();
        assert!(handle.is_match_within(&text, 1_000).is_err());
    }

    #[test]
    fn test_match_limit_truncates() {
        let engine = Engine::default();
        let options = SearchOptions {
            match_limit: Some(2),
            ..SearchOptions::default()
        };
        let report = engine.find_all(("a", Flags::global()), "aaaa", options).unwrap();
        assert_eq!(report.count, 2);
        assert!(report.truncated);
        let report = engine.find_all(("a", Flags::global()), "aa", options).unwrap();
        assert_eq!(report.count, 2);
        assert!(!report.truncated);
    }

    #[test]
    fn test_test_respects_global_flag() {
        let engine = Engine::default();
        let report = engine.test(r"\d", "1 2 3", "g");
        assert!(report.success);
        assert_eq!(report.count, 3);
        let report = engine.test(r"\d", "1 2 3", "");
        assert_eq!(report.count, 1);
        assert!(!report.truncated);
    }

    #[test]
    fn test_test_reports_errors_as_values() {
        let engine = Engine::default();
        let report = engine.test("a(", "a", "g");
        assert!(!report.success);
        assert_eq!(report.error.as_ref().unwrap().kind, "UnterminatedGroup");
        assert_eq!(report.error.unwrap().position, Some(1));
        let report = engine.test("a", "a", "gq");
        assert_eq!(report.error.unwrap().kind, "InvalidFlag");
    }
}
