//! VM executor: runs compiled bytecode against an input string.
//!
//! Backtracking uses an explicit stack of choice points instead of
//! recursion. Capture slots are restored through an undo log, so a choice
//! point only records the log length rather than copying every slot.
//! Every backtrack, and every start a lookbehind tries, counts against a
//! step budget that is reset for each start position of a search; running
//! out aborts the call with `MatchTimeout`.

use serde::Serialize;

use crate::ast::{LookDirection, is_word_char};
use crate::charset::fold;
use crate::compiler::{Inst, Program};
use crate::error::MatchTimeout;

/// Default number of backtracking steps allowed per match attempt.
pub const DEFAULT_STEP_BUDGET: u64 = 1_000_000;

/// Text and char offsets of one capture group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A named group's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCapture {
    pub name: String,
    pub index: usize,
    pub capture: Option<Capture>,
}

/// Result of a successful match. Offsets count chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub text: String,
    pub start: usize,
    pub end: usize,
    /// Groups 1..=n in order; `None` when the group did not participate.
    pub captures: Vec<Option<Capture>>,
    /// Named groups in group order.
    pub named: Vec<NamedCapture>,
}

impl Match {
    /// Group `index`, where 0 is the whole match.
    pub fn group(&self, index: usize) -> Option<Capture> {
        if index == 0 {
            return Some(Capture {
                text: self.text.clone(),
                start: self.start,
                end: self.end,
            });
        }
        self.captures.get(index - 1).cloned().flatten()
    }

    pub fn name(&self, name: &str) -> Option<&Capture> {
        self.named
            .iter()
            .find(|n| n.name == name)
            .and_then(|n| n.capture.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A saved alternative: resume at `pc` with input position `pos`, after
/// rolling the undo log back to `undo_mark`.
struct ChoicePoint {
    pc: usize,
    pos: usize,
    undo_mark: usize,
}

/// An entry in the undo log: (slot_index, old_value).
type UndoEntry = (usize, Option<usize>);

/// Matcher state for one attempt; `reset` before each start position.
struct Matcher<'a> {
    program: &'a Program,
    chars: &'a [char],
    slots: Vec<Option<usize>>,
    undo_log: Vec<UndoEntry>,
    stack: Vec<ChoicePoint>,
    steps: u64,
    budget: u64,
}

/// Search `text` for the first match starting at or after char offset `start`.
pub fn match_at(
    program: &Program,
    text: &str,
    start: usize,
    budget: u64,
) -> Result<Option<Match>, MatchTimeout> {
    let chars: Vec<char> = text.chars().collect();
    search(program, &chars, start, budget)
}

/// Lazily enumerate all non-overlapping matches in `text`.
pub fn find_all<'p>(program: &'p Program, text: &str, budget: u64) -> FindAll<'p> {
    FindAll {
        program,
        chars: text.chars().collect(),
        budget,
        next_start: 0,
        done: false,
    }
}

/// Iterator returned by [`find_all`]. Yields `Err` once and stops if an
/// attempt runs out of budget.
pub struct FindAll<'p> {
    program: &'p Program,
    chars: Vec<char>,
    budget: u64,
    next_start: usize,
    done: bool,
}

impl Iterator for FindAll<'_> {
    type Item = Result<Match, MatchTimeout>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_start > self.chars.len() {
            return None;
        }
        match search(self.program, &self.chars, self.next_start, self.budget) {
            Ok(Some(m)) => {
                // An empty match must not be found again at the same place.
                self.next_start = if m.end > m.start { m.end } else { m.start + 1 };
                Some(Ok(m))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(timeout) => {
                self.done = true;
                Some(Err(timeout))
            }
        }
    }
}

fn search(
    program: &Program,
    chars: &[char],
    start: usize,
    budget: u64,
) -> Result<Option<Match>, MatchTimeout> {
    let mut matcher = Matcher::new(program, chars, budget);
    for begin in start..=chars.len() {
        if program.anchored_start && begin > 0 {
            break;
        }
        if let Some(fc) = program.first_char {
            if chars.get(begin) != Some(&fc) {
                continue;
            }
        }
        matcher.reset();
        if let Some(end) = matcher.run(0, begin, None)? {
            return Ok(Some(matcher.build_match(begin, end)));
        }
    }
    Ok(None)
}

impl<'a> Matcher<'a> {
    fn new(program: &'a Program, chars: &'a [char], budget: u64) -> Self {
        Matcher {
            program,
            chars,
            slots: vec![None; program.state_size()],
            undo_log: Vec::new(),
            stack: Vec::new(),
            steps: 0,
            budget,
        }
    }

    fn reset(&mut self) {
        self.slots.fill(None);
        self.undo_log.clear();
        self.stack.clear();
        self.steps = 0;
    }

    fn charge_step(&mut self) -> Result<(), MatchTimeout> {
        self.steps += 1;
        if self.steps > self.budget {
            return Err(MatchTimeout {
                budget: self.budget,
            });
        }
        Ok(())
    }

    fn set_slot(&mut self, slot: usize, value: Option<usize>) {
        self.undo_log.push((slot, self.slots[slot]));
        self.slots[slot] = value;
    }

    fn rollback(&mut self, mark: usize) {
        while self.undo_log.len() > mark {
            if let Some((slot, old_val)) = self.undo_log.pop() {
                self.slots[slot] = old_val;
            }
        }
    }

    /// Execute from `pc` at `pos` until a `Match` is reached or every
    /// alternative pushed by this call is exhausted. With `must_end_at`,
    /// a `Match` only counts at that position (lookbehind bodies).
    ///
    /// On success the choice points pushed by this call are dropped; the
    /// slot writes stay in the undo log so outer backtracking can undo them.
    fn run(
        &mut self,
        pc: usize,
        pos: usize,
        must_end_at: Option<usize>,
    ) -> Result<Option<usize>, MatchTimeout> {
        let program = self.program;
        let chars = self.chars;
        let base = self.stack.len();
        let mut pc = pc;
        let mut pos = pos;

        loop {
            let proceed = match &program.insts[pc] {
                Inst::Match => {
                    if must_end_at.is_none_or(|end| end == pos) {
                        self.stack.truncate(base);
                        return Ok(Some(pos));
                    }
                    false
                }
                Inst::Char(expected) => {
                    if chars.get(pos) == Some(expected) {
                        pos += 1;
                        pc += 1;
                        true
                    } else {
                        false
                    }
                }
                Inst::AnyChar { dot_all } => match chars.get(pos) {
                    Some(&ch) if *dot_all || ch != '\n' => {
                        pos += 1;
                        pc += 1;
                        true
                    }
                    _ => false,
                },
                Inst::Set(set) => match chars.get(pos) {
                    Some(&ch) if set.matches(ch) => {
                        pos += 1;
                        pc += 1;
                        true
                    }
                    _ => false,
                },
                Inst::Jump(target) => {
                    pc = *target;
                    true
                }
                Inst::Split(first, second) => {
                    self.stack.push(ChoicePoint {
                        pc: *second,
                        pos,
                        undo_mark: self.undo_log.len(),
                    });
                    pc = *first;
                    true
                }
                Inst::Save(slot) | Inst::MarkProgress(slot) => {
                    self.set_slot(*slot, Some(pos));
                    pc += 1;
                    true
                }
                Inst::CheckProgress(reg) => {
                    if self.slots[*reg] == Some(pos) {
                        false
                    } else {
                        pc += 1;
                        true
                    }
                }
                Inst::AssertStart { multiline } => {
                    let at_start = pos == 0 || (*multiline && chars[pos - 1] == '\n');
                    pc += 1;
                    at_start
                }
                Inst::AssertEnd { multiline } => {
                    let at_end = pos == chars.len() || (*multiline && chars[pos] == '\n');
                    pc += 1;
                    at_end
                }
                Inst::AssertWordBoundary => {
                    pc += 1;
                    is_word_boundary(chars, pos)
                }
                Inst::AssertNonWordBoundary => {
                    pc += 1;
                    !is_word_boundary(chars, pos)
                }
                Inst::Backref {
                    group,
                    case_insensitive,
                } => match self.backref_len(*group, pos, *case_insensitive) {
                    Some(len) => {
                        pos += len;
                        pc += 1;
                        true
                    }
                    None => false,
                },
                Inst::Look {
                    direction,
                    negated,
                    max_width,
                    next,
                } => {
                    let holds = self.lookaround(pc + 1, pos, *direction, *negated, *max_width)?;
                    pc = *next;
                    holds
                }
                Inst::Nop => {
                    pc += 1;
                    true
                }
            };
            if proceed {
                continue;
            }

            // Backtrack to the most recent choice point owned by this call.
            if self.stack.len() <= base {
                return Ok(None);
            }
            let Some(choice) = self.stack.pop() else {
                return Ok(None);
            };
            self.charge_step()?;
            self.rollback(choice.undo_mark);
            pc = choice.pc;
            pos = choice.pos;
        }
    }

    /// Length of input consumed by a backreference at `pos`, if it matches.
    /// An unset group fails.
    fn backref_len(&self, group: usize, pos: usize, case_insensitive: bool) -> Option<usize> {
        let (Some(gs), Some(ge)) = (self.slots[group * 2], self.slots[group * 2 + 1]) else {
            return None;
        };
        if ge < gs {
            return None;
        }
        let len = ge - gs;
        let captured = &self.chars[gs..ge];
        let upcoming = self.chars.get(pos..pos + len)?;
        let equal = if case_insensitive {
            captured
                .iter()
                .zip(upcoming)
                .all(|(a, b)| a == b || fold(*a) == fold(*b))
        } else {
            captured == upcoming
        };
        equal.then_some(len)
    }

    /// Run a lookaround body as an isolated sub-attempt. The outer position
    /// never moves; captures survive only from a successful positive assertion.
    ///
    /// A lookbehind body must end exactly at `pos`. Starts are tried from the
    /// farthest one the body could reach (`pos - max_width`, or 0 when the
    /// body is unbounded) towards `pos`, so greedy captures take the longest
    /// text. Each start tried costs one step.
    fn lookaround(
        &mut self,
        body: usize,
        pos: usize,
        direction: LookDirection,
        negated: bool,
        max_width: Option<usize>,
    ) -> Result<bool, MatchTimeout> {
        let mark = self.undo_log.len();
        let matched = match direction {
            LookDirection::Ahead => self.run(body, pos, None)?.is_some(),
            LookDirection::Behind => {
                let farthest = max_width.map_or(0, |width| pos.saturating_sub(width));
                let mut found = false;
                for begin in farthest..=pos {
                    self.charge_step()?;
                    if self.run(body, begin, Some(pos))?.is_some() {
                        found = true;
                        break;
                    }
                    self.rollback(mark);
                }
                found
            }
        };
        if !matched || negated {
            self.rollback(mark);
        }
        Ok(matched != negated)
    }

    fn build_match(&self, start: usize, end: usize) -> Match {
        let program = self.program;
        let captures: Vec<Option<Capture>> = (1..=program.group_count)
            .map(|group| self.capture(group))
            .collect();
        let named = program
            .group_names
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let name = name.as_ref()?;
                Some(NamedCapture {
                    name: name.clone(),
                    index,
                    capture: captures.get(index.checked_sub(1)?).cloned().flatten(),
                })
            })
            .collect();
        Match {
            text: self.chars[start..end].iter().collect(),
            start,
            end,
            captures,
            named,
        }
    }

    fn capture(&self, group: usize) -> Option<Capture> {
        let start = self.slots[group * 2]?;
        let end = self.slots[group * 2 + 1]?;
        if end < start {
            return None;
        }
        Some(Capture {
            text: self.chars[start..end].iter().collect(),
            start,
            end,
        })
    }
}

/// Check if `pos` is at a word boundary.
fn is_word_boundary(chars: &[char], pos: usize) -> bool {
    let before = pos > 0 && is_word_char(chars[pos - 1]);
    let after = pos < chars.len() && is_word_char(chars[pos]);
    before != after
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::flags::Flags;
    use crate::parser::parse;

    fn program(pattern: &str, flags: Flags) -> Program {
        compile(&parse(pattern).unwrap(), flags).unwrap()
    }

    fn first(pattern: &str, text: &str) -> Option<Match> {
        match_at(&program(pattern, Flags::default()), text, 0, DEFAULT_STEP_BUDGET).unwrap()
    }

    fn all(pattern: &str, flags: Flags, text: &str) -> Vec<(String, usize)> {
        let program = program(pattern, flags);
        find_all(&program, text, DEFAULT_STEP_BUDGET)
            .map(|m| m.map(|m| (m.text, m.start)))
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_greedy_and_lazy() {
        assert_eq!(first("a+", "baaa").unwrap().text, "aaa");
        assert_eq!(first("a+?", "baaa").unwrap().text, "a");
        assert_eq!(first("<.*>", "<a><b>").unwrap().text, "<a><b>");
        assert_eq!(first("<.*?>", "<a><b>").unwrap().text, "<a>");
    }

    #[test]
    fn test_alternation_first_wins() {
        assert_eq!(first("a|ab", "ab").unwrap().text, "a");
        assert_eq!(first("ab|a", "ab").unwrap().text, "ab");
    }

    #[test]
    fn test_match_at_offset() {
        let program = program(r"\d+", Flags::default());
        let m = match_at(&program, "12 345", 2, DEFAULT_STEP_BUDGET).unwrap().unwrap();
        assert_eq!((m.text.as_str(), m.start, m.end), ("345", 3, 6));
        assert!(match_at(&program, "12", 3, DEFAULT_STEP_BUDGET).unwrap().is_none());
    }

    #[test]
    fn test_captures_keep_last_iteration() {
        let m = first("(?:(a)|(b))+", "ab").unwrap();
        assert_eq!(m.group(2).unwrap().text, "b");
        assert_eq!(m.group(1).unwrap().text, "a");
        let m = first(r"(\w)+", "xyz").unwrap();
        assert_eq!(m.group(1).unwrap().text, "z");
    }

    #[test]
    fn test_unset_group() {
        let m = first("(a)|(b)", "b").unwrap();
        assert_eq!(m.captures[0], None);
        assert_eq!(m.captures[1].as_ref().unwrap().text, "b");
    }

    #[test]
    fn test_backtracking_restores_captures() {
        let m = first("(a+)(a)", "aaa").unwrap();
        assert_eq!(m.group(1).unwrap().text, "aa");
        assert_eq!(m.group(2).unwrap().text, "a");
    }

    #[test]
    fn test_zero_width_loop_terminates() {
        assert_eq!(first("(a*)*b", "aab").unwrap().text, "aab");
        assert_eq!(first("(?:)*x", "x").unwrap().text, "x");
        assert_eq!(first("(a|)+b", "ab").unwrap().text, "ab");
    }

    #[test]
    fn test_lookahead() {
        assert_eq!(first(r"\w+(?=!)", "hi there!").unwrap().text, "there");
        assert_eq!(first(r"foo(?!bar)", "foobar foobaz").unwrap().start, 7);
        // Captures from a positive lookahead are visible afterwards.
        let m = first(r"(?=(\w+))\w", "abc").unwrap();
        assert_eq!(m.group(1).unwrap().text, "abc");
        // Captures from a negative lookahead are discarded.
        let m = first(r"(?!(x))a", "a").unwrap();
        assert_eq!(m.group(1), None);
    }

    #[test]
    fn test_lookbehind() {
        assert_eq!(first(r"(?<=\$)\d+", "cost: $42").unwrap().text, "42");
        assert_eq!(first(r"(?<!\$)\b\d+", "$42 17").unwrap().text, "17");
        let m = first(r"(?<=(ab+))c", "abbc").unwrap();
        assert_eq!(m.group(1).unwrap().text, "abb");
    }

    #[test]
    fn test_anchors() {
        assert!(first("^b", "ab").is_none());
        assert!(first("a$", "ab").is_none());
        assert_eq!(all("^x", Flags::default().with_multiline(true), "x\nx\ny"), vec![
            ("x".to_string(), 0),
            ("x".to_string(), 2),
        ]);
        assert_eq!(all("x$", Flags::default().with_multiline(true), "x\nax"), vec![
            ("x".to_string(), 0),
            ("x".to_string(), 3),
        ]);
    }

    #[test]
    fn test_word_boundary() {
        assert_eq!(all(r"\bcat\b", Flags::default(), "cat concat cat_ cat."), vec![
            ("cat".to_string(), 0),
            ("cat".to_string(), 16),
        ]);
        assert_eq!(first(r"\Bcat", "concat").unwrap().start, 3);
    }

    #[test]
    fn test_dot_and_dot_all() {
        assert!(first("a.b", "a\nb").is_none());
        let program = program("a.b", Flags::default().with_dot_all(true));
        assert!(match_at(&program, "a\nb", 0, DEFAULT_STEP_BUDGET).unwrap().is_some());
    }

    #[test]
    fn test_backreference_case_insensitive() {
        let program = program(r"(\w+) \1", Flags::default().with_case_insensitive(true));
        let m = match_at(&program, "Hello HELLO", 0, DEFAULT_STEP_BUDGET).unwrap().unwrap();
        assert_eq!(m.text, "Hello HELLO");
        assert!(first(r"(\w+) \1", "Hello HELLO").is_none());
    }

    #[test]
    fn test_backreference_to_unset_group_fails() {
        assert!(first(r"(a)?\1b", "b").is_none());
        assert!(first(r"(a\1)", "aa").is_none());
    }

    #[test]
    fn test_named_groups() {
        let m = first(r"(?<year>\d{4})-(?<month>\d{2})", "on 2024-05").unwrap();
        assert_eq!(m.name("year").unwrap().text, "2024");
        assert_eq!(m.name("month").unwrap().text, "05");
        assert_eq!(m.named[1].index, 2);
    }

    #[test]
    fn test_empty_matches_advance() {
        assert_eq!(all("a*", Flags::default(), "ab"), vec![
            ("a".to_string(), 0),
            (String::new(), 1),
            (String::new(), 2),
        ]);
    }

    #[test]
    fn test_budget_exhaustion() {
        let program = program("(a+)+b", Flags::default());
        let text = "a".repeat(30);
        assert_eq!(
            match_at(&program, &text, 0, 10_000),
            Err(MatchTimeout { budget: 10_000 })
        );
        let mut iter = find_all(&program, &text, 10_000);
        assert!(matches!(iter.next(), Some(Err(_))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_budget_is_per_start_position() {
        // Each start alone stays far below the budget even though the whole
        // scan backtracks over a million times.
        let program = program(r"\w+x", Flags::default());
        let text = "a".repeat(1500);
        assert_eq!(match_at(&program, &text, 0, DEFAULT_STEP_BUDGET), Ok(None));
        assert_eq!(find_all(&program, &text, DEFAULT_STEP_BUDGET).count(), 0);
    }

    #[test]
    fn test_lookbehind_only_scans_its_width() {
        let text = "y".repeat(40_000);
        let program = program("(?<!x)z", Flags::default());
        assert_eq!(match_at(&program, &text, 0, 1_000), Ok(None));
        let program = self::program("(?<=yy)z", Flags::default());
        let m = match_at(&program, &format!("{text}z"), 0, 1_000).unwrap().unwrap();
        assert_eq!(m.start, 40_000);
    }

    #[test]
    fn test_unbounded_lookbehind_is_charged() {
        let program = program("(?<!x.*)z", Flags::default());
        let text = "y".repeat(2_000);
        assert_eq!(
            match_at(&program, &text, 0, 1_000),
            Err(MatchTimeout { budget: 1_000 })
        );
        assert_eq!(match_at(&program, "yyz", 0, 1_000).unwrap().unwrap().start, 2);
        assert!(match_at(&program, "xyz", 0, 1_000).unwrap().is_none());
    }

    #[test]
    fn test_lookbehind_captures_longest() {
        let m = first(r"(?<=(\d+))x", "123x").unwrap();
        assert_eq!(m.group(1).unwrap().text, "123");
        let m = first(r"(?<=(\d{1,2}))x", "123x").unwrap();
        assert_eq!(m.group(1).unwrap().text, "23");
    }

    #[test]
    fn test_offsets_are_chars() {
        let m = first("é+", "caféé!").unwrap();
        assert_eq!((m.start, m.end), (3, 5));
    }
}
