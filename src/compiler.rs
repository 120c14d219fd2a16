//! Compiler: converts AST into bytecode instructions for the VM.
//!
//! Flags are resolved here. Case folding turns literals and classes into
//! their folded sets, and dot-all/multiline are baked into the emitted
//! instructions, so the VM never consults flags.

use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::charset::{CharSet, case_variants};
use crate::error::CompileError;
use crate::flags::Flags;

/// VM instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Inst {
    /// Match a specific character.
    Char(char),
    /// Match any character; newline only when `dot_all`.
    AnyChar { dot_all: bool },
    /// Match a character set (classes, shorthands, folded literals).
    Set(CharSet),
    /// Successful match (of the whole program or of a lookaround body).
    Match,
    /// Jump to target instruction.
    Jump(usize),
    /// Try the first target, backtrack into the second.
    Split(usize, usize),
    /// Save position into capture slot.
    Save(usize),
    /// Record the position at the start of a loop iteration.
    MarkProgress(usize),
    /// Fail if the iteration started at the mark consumed nothing.
    CheckProgress(usize),
    /// Assert start of input (or of a line, when `multiline`).
    AssertStart { multiline: bool },
    /// Assert end of input (or of a line, when `multiline`).
    AssertEnd { multiline: bool },
    /// Assert word boundary.
    AssertWordBoundary,
    /// Assert non-word boundary.
    AssertNonWordBoundary,
    /// Match the same text as capture group N.
    Backref { group: usize, case_insensitive: bool },
    /// Lookaround whose body starts at the next instruction and ends with
    /// `Match`; execution resumes at `next`. `max_width` is the longest
    /// text the body can consume (`None` when unbounded).
    Look {
        direction: LookDirection,
        negated: bool,
        max_width: Option<usize>,
        next: usize,
    },
    /// Placeholder, patched before compilation finishes.
    Nop,
}

/// Compiled program.
#[derive(Debug)]
pub struct Program {
    pub insts: Vec<Inst>,
    pub group_count: usize,
    /// `2 * (group_count + 1)`: start and end slot per group, group 0 first.
    pub slot_count: usize,
    /// Loop progress registers, stored after the capture slots.
    pub register_count: usize,
    /// Group names indexed by group number.
    pub group_names: Vec<Option<String>>,
    pub name_to_index: FxHashMap<String, usize>,
    /// If the pattern must start with a specific literal character, store it here.
    /// Used by the VM to skip starting positions that can't possibly match.
    pub first_char: Option<char>,
    /// Whether the pattern is anchored at the start of input.
    pub anchored_start: bool,
}

impl Program {
    /// Capture slots plus loop registers.
    pub fn state_size(&self) -> usize {
        self.slot_count + self.register_count
    }

    pub fn group_index(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }
}

/// Compile a parsed pattern into a bytecode program.
pub fn compile(ast: &Ast, flags: Flags) -> Result<Program, CompileError> {
    let slot_count = 2 * (ast.group_count + 1);
    let mut compiler = Compiler {
        insts: Vec::with_capacity(ast.root.expanded_size() + 1),
        group_count: ast.group_count,
        next_register: slot_count,
    };
    compiler.emit(&ast.root, flags)?;
    compiler.insts.push(Inst::Match);

    if let Some(pc) = compiler.insts.iter().position(|inst| *inst == Inst::Nop) {
        return Err(CompileError(format!("unpatched placeholder at {pc}")));
    }

    let mut name_to_index = FxHashMap::default();
    for (index, name) in ast.group_names.iter().enumerate() {
        if let Some(name) = name {
            name_to_index.insert(name.clone(), index);
        }
    }
    if ast.group_names.len() != ast.group_count + 1 {
        return Err(CompileError(format!(
            "{} group names for {} groups",
            ast.group_names.len(),
            ast.group_count + 1
        )));
    }

    let insts = compiler.insts;
    let first_char = extract_first_char(&insts);
    let anchored_start = matches!(insts.first(), Some(Inst::AssertStart { multiline: false }));
    Ok(Program {
        insts,
        group_count: ast.group_count,
        slot_count,
        register_count: compiler.next_register - slot_count,
        group_names: ast.group_names.clone(),
        name_to_index,
        first_char,
        anchored_start,
    })
}

/// Extract the first required literal character from the instruction stream, if any.
fn extract_first_char(insts: &[Inst]) -> Option<char> {
    match insts.first()? {
        Inst::Char(ch) => Some(*ch),
        // If the first instruction is AssertStart, check the next one
        Inst::AssertStart { .. } => match insts.get(1)? {
            Inst::Char(ch) => Some(*ch),
            _ => None,
        },
        _ => None,
    }
}

struct Compiler {
    insts: Vec<Inst>,
    group_count: usize,
    next_register: usize,
}

impl Compiler {
    fn alloc_register(&mut self) -> usize {
        let reg = self.next_register;
        self.next_register += 1;
        reg
    }

    fn emit(&mut self, node: &AstNode, flags: Flags) -> Result<(), CompileError> {
        match node {
            AstNode::Empty => {}
            AstNode::Literal(ch) => {
                let variants = if flags.case_insensitive {
                    case_variants(*ch)
                } else {
                    vec![*ch]
                };
                if variants.len() == 1 {
                    self.insts.push(Inst::Char(*ch));
                } else {
                    self.insts.push(Inst::Set(CharSet::from_chars(&variants)));
                }
            }
            AstNode::Dot => {
                self.insts.push(Inst::AnyChar {
                    dot_all: flags.dot_all,
                });
            }
            AstNode::Concat(nodes) => {
                for n in nodes {
                    self.emit(n, flags)?;
                }
            }
            AstNode::Alternation(branches) => self.emit_alternation(branches, flags)?,
            AstNode::Quantifier {
                node: sub,
                min,
                max,
                greedy,
            } => self.emit_quantifier(sub, *min, *max, *greedy, flags)?,
            AstNode::CharClass { items, negated } => {
                self.insts.push(Inst::Set(CharSet::from_items(
                    items,
                    *negated,
                    flags.case_insensitive,
                )));
            }
            AstNode::ShorthandClass(kind) => {
                self.insts.push(Inst::Set(CharSet::from_items(
                    &[ClassItem::Shorthand(*kind)],
                    false,
                    false,
                )));
            }
            AstNode::Anchor(AnchorKind::Start) => {
                self.insts.push(Inst::AssertStart {
                    multiline: flags.multiline,
                });
            }
            AstNode::Anchor(AnchorKind::End) => {
                self.insts.push(Inst::AssertEnd {
                    multiline: flags.multiline,
                });
            }
            AstNode::Anchor(AnchorKind::WordBoundary) => {
                self.insts.push(Inst::AssertWordBoundary);
            }
            AstNode::Anchor(AnchorKind::NonWordBoundary) => {
                self.insts.push(Inst::AssertNonWordBoundary);
            }
            AstNode::Group { kind, node: sub } => match kind.index() {
                Some(index) => {
                    self.check_group(index)?;
                    self.insts.push(Inst::Save(index * 2));
                    self.emit(sub, flags)?;
                    self.insts.push(Inst::Save(index * 2 + 1));
                }
                None => self.emit(sub, flags)?,
            },
            AstNode::Backreference(group) => {
                self.check_group(*group)?;
                self.insts.push(Inst::Backref {
                    group: *group,
                    case_insensitive: flags.case_insensitive,
                });
            }
            AstNode::Lookaround {
                node: sub,
                direction,
                negated,
            } => {
                let look_pc = self.insts.len();
                self.insts.push(Inst::Nop);
                self.emit(sub, flags)?;
                self.insts.push(Inst::Match); // end of sub-program
                self.insts[look_pc] = Inst::Look {
                    direction: *direction,
                    negated: *negated,
                    max_width: sub.max_width(),
                    next: self.insts.len(),
                };
            }
            AstNode::InlineFlags { node: sub, flags: overrides } => {
                self.emit(sub, overrides.apply(flags))?;
            }
        }
        Ok(())
    }

    fn check_group(&self, index: usize) -> Result<(), CompileError> {
        if index == 0 || index > self.group_count {
            return Err(CompileError(format!(
                "group {index} outside 1..={}",
                self.group_count
            )));
        }
        Ok(())
    }

    fn emit_alternation(&mut self, branches: &[AstNode], flags: Flags) -> Result<(), CompileError> {
        // a|b|c compiles to:
        //   split L1, L2
        //   L1: <a> jump END
        //   L2: split L3, L4
        //   L3: <b> jump END
        //   L4: <c>
        //   END:
        let Some((last, init)) = branches.split_last() else {
            return Ok(());
        };
        let mut fixup_jumps = Vec::with_capacity(init.len());
        for branch in init {
            let split_pc = self.insts.len();
            self.insts.push(Inst::Nop); // placeholder for split
            self.emit(branch, flags)?;
            fixup_jumps.push(self.insts.len());
            self.insts.push(Inst::Nop); // placeholder for jump to end
            let next_branch = self.insts.len();
            self.insts[split_pc] = Inst::Split(split_pc + 1, next_branch);
        }
        self.emit(last, flags)?;
        let end = self.insts.len();
        for jpc in fixup_jumps {
            self.insts[jpc] = Inst::Jump(end);
        }
        Ok(())
    }

    fn split(greedy: bool, body: usize, exit: usize) -> Inst {
        if greedy {
            Inst::Split(body, exit)
        } else {
            Inst::Split(exit, body)
        }
    }

    fn emit_quantifier(
        &mut self,
        sub: &AstNode,
        min: u32,
        max: Option<u32>,
        greedy: bool,
        flags: Flags,
    ) -> Result<(), CompileError> {
        let nullable = sub.can_match_empty();
        match max {
            None if min > 0 && !nullable => {
                // L1: <sub>
                //     split L1, L2  (greedy: prefer L1)
                // L2:
                for _ in 1..min {
                    self.emit(sub, flags)?;
                }
                let l1 = self.insts.len();
                self.emit(sub, flags)?;
                let l2 = self.insts.len() + 1;
                self.insts.push(Self::split(greedy, l1, l2));
            }
            None => {
                for _ in 0..min {
                    self.emit(sub, flags)?;
                }
                self.emit_star(sub, greedy, nullable, flags)?;
            }
            Some(max) => {
                for _ in 0..min {
                    self.emit(sub, flags)?;
                }
                self.emit_optional_chain(sub, max.saturating_sub(min), greedy, flags)?;
            }
        }
        Ok(())
    }

    /// `sub*`. A body that can match empty gets a progress check so an
    /// iteration that consumes nothing fails instead of looping.
    fn emit_star(
        &mut self,
        sub: &AstNode,
        greedy: bool,
        nullable: bool,
        flags: Flags,
    ) -> Result<(), CompileError> {
        // L1: split L2, L3  (greedy: prefer L2)
        // L2: [mark r] <sub> [check r] jump L1
        // L3:
        let l1 = self.insts.len();
        self.insts.push(Inst::Nop); // placeholder
        let l2 = self.insts.len();
        let register = nullable.then(|| self.alloc_register());
        if let Some(reg) = register {
            self.insts.push(Inst::MarkProgress(reg));
        }
        self.emit(sub, flags)?;
        if let Some(reg) = register {
            self.insts.push(Inst::CheckProgress(reg));
        }
        self.insts.push(Inst::Jump(l1));
        let l3 = self.insts.len();
        self.insts[l1] = Self::split(greedy, l2, l3);
        Ok(())
    }

    /// Up to `count` optional copies, nested so that skipping one copy
    /// skips all that follow: `(sub(sub(sub)?)?)?`.
    fn emit_optional_chain(
        &mut self,
        sub: &AstNode,
        count: u32,
        greedy: bool,
        flags: Flags,
    ) -> Result<(), CompileError> {
        let mut splits = Vec::with_capacity(count as usize);
        for _ in 0..count {
            splits.push(self.insts.len());
            self.insts.push(Inst::Nop);
            self.emit(sub, flags)?;
        }
        let end = self.insts.len();
        for pc in splits {
            self.insts[pc] = Self::split(greedy, pc + 1, end);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn compile_str(pattern: &str, flags: Flags) -> Program {
        compile(&parse(pattern).unwrap(), flags).unwrap()
    }

    #[test]
    fn test_slot_count() {
        let program = compile_str("(a)(?:b)(?<c>c)", Flags::default());
        assert_eq!(program.group_count, 2);
        assert_eq!(program.slot_count, 6);
        assert_eq!(program.group_index("c"), Some(2));
    }

    #[test]
    fn test_alternation_layout() {
        let program = compile_str("a|b", Flags::default());
        assert_eq!(
            program.insts,
            vec![
                Inst::Split(1, 3),
                Inst::Char('a'),
                Inst::Jump(4),
                Inst::Char('b'),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn test_plus_layout() {
        let greedy = compile_str("a+", Flags::default());
        assert_eq!(greedy.insts, vec![Inst::Char('a'), Inst::Split(0, 2), Inst::Match]);
        let lazy = compile_str("a+?", Flags::default());
        assert_eq!(lazy.insts, vec![Inst::Char('a'), Inst::Split(2, 0), Inst::Match]);
    }

    #[test]
    fn test_bounded_repeat_is_nested() {
        let program = compile_str("a{1,3}", Flags::default());
        assert_eq!(
            program.insts,
            vec![
                Inst::Char('a'),
                Inst::Split(2, 5),
                Inst::Char('a'),
                Inst::Split(4, 5),
                Inst::Char('a'),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn test_nullable_loop_gets_progress_register() {
        let program = compile_str("(a*)*", Flags::default());
        assert_eq!(program.register_count, 1);
        assert!(program.insts.contains(&Inst::MarkProgress(4)));
        assert!(program.insts.contains(&Inst::CheckProgress(4)));
        assert_eq!(program.state_size(), 5);
    }

    #[test]
    fn test_case_folding_at_compile_time() {
        let program = compile_str("k", Flags::default().with_case_insensitive(true));
        assert_eq!(program.insts[0], Inst::Set(CharSet::from_chars(&['k', 'K'])));
        let program = compile_str("(?i:k)1", Flags::default());
        assert!(matches!(program.insts[0], Inst::Set(_)));
        assert_eq!(program.insts[1], Inst::Char('1'));
    }

    #[test]
    fn test_flags_baked_into_instructions() {
        let program = compile_str("^.$", Flags::default().with_multiline(true).with_dot_all(true));
        assert_eq!(
            program.insts,
            vec![
                Inst::AssertStart { multiline: true },
                Inst::AnyChar { dot_all: true },
                Inst::AssertEnd { multiline: true },
                Inst::Match,
            ]
        );
        assert!(!program.anchored_start);
        assert!(compile_str("^a", Flags::default()).anchored_start);
    }

    #[test]
    fn test_first_char_hint() {
        assert_eq!(compile_str("abc", Flags::default()).first_char, Some('a'));
        assert_eq!(compile_str("^x", Flags::default()).first_char, Some('x'));
        assert_eq!(compile_str("a|b", Flags::default()).first_char, None);
    }

    #[test]
    fn test_lookaround_layout() {
        let program = compile_str("(?=a)b", Flags::default());
        assert_eq!(
            program.insts,
            vec![
                Inst::Look {
                    direction: LookDirection::Ahead,
                    negated: false,
                    max_width: Some(1),
                    next: 3,
                },
                Inst::Char('a'),
                Inst::Match,
                Inst::Char('b'),
                Inst::Match,
            ]
        );
    }

    #[test]
    fn test_bad_backreference_is_compile_error() {
        let ast = Ast {
            root: AstNode::Backreference(3),
            group_count: 1,
            group_names: vec![None, None],
        };
        assert!(compile(&ast, Flags::default()).is_err());
    }
}
