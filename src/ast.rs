//! AST types for the regex engine.

use crate::flags::Flags;

/// A parsed pattern: the root node plus group metadata.
#[derive(Debug, Clone)]
pub struct Ast {
    pub root: AstNode,
    /// Number of capturing groups (named groups included).
    pub group_count: usize,
    /// Name of each group, indexed by group number. Index 0 is always `None`.
    pub group_names: Vec<Option<String>>,
}

/// A single node in the regex AST.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    /// Matches the empty string, e.g. an empty alternative in `a|`.
    Empty,
    /// Matches a single literal character.
    Literal(char),
    /// Matches any character (except newline unless dot-all).
    Dot,
    /// Concatenation of nodes (implicit in `ab`).
    Concat(Vec<AstNode>),
    /// Alternation (`a|b`); the leftmost successful branch wins.
    Alternation(Vec<AstNode>),
    /// Quantifier applied to a sub-expression. `max` is `None` when unbounded.
    Quantifier {
        node: Box<AstNode>,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    },
    /// Character class like `[abc]`, `[a-z]`, `[^abc]`.
    CharClass {
        items: Vec<ClassItem>,
        negated: bool,
    },
    /// Shorthand class: `\d`, `\w`, `\s` and their negations.
    ShorthandClass(ShorthandKind),
    /// Anchor: `^`, `$`, `\b`, `\B`.
    Anchor(AnchorKind),
    /// Parenthesized group.
    Group {
        kind: GroupKind,
        node: Box<AstNode>,
    },
    /// Backreference `\1` or `\k<name>`, resolved to a group index.
    Backreference(usize),
    /// Lookahead or lookbehind assertion.
    Lookaround {
        node: Box<AstNode>,
        direction: LookDirection,
        negated: bool,
    },
    /// Inline flags wrapper `(?i:...)`, `(?-i:...)`: contents match with the flags adjusted.
    InlineFlags {
        node: Box<AstNode>,
        flags: FlagOverrides,
    },
}

/// How a group participates in capturing.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    Capturing(usize),
    Named(usize, String),
    NonCapturing,
}

impl GroupKind {
    pub fn index(&self) -> Option<usize> {
        match self {
            GroupKind::Capturing(index) | GroupKind::Named(index, _) => Some(*index),
            GroupKind::NonCapturing => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookDirection {
    Ahead,
    Behind,
}

/// Item within a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    /// Single character.
    Literal(char),
    /// Character range `a-z`.
    Range(char, char),
    /// Shorthand within a class, e.g. `[\d]`.
    Shorthand(ShorthandKind),
}

/// Shorthand character class kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShorthandKind {
    /// `\d`: digits.
    Digit,
    /// `\D`: non-digits.
    NonDigit,
    /// `\w`: word characters.
    Word,
    /// `\W`: non-word characters.
    NonWord,
    /// `\s`: whitespace.
    Space,
    /// `\S`: non-whitespace.
    NonSpace,
}

impl ShorthandKind {
    pub fn matches(self, ch: char) -> bool {
        match self {
            ShorthandKind::Digit => ch.is_ascii_digit(),
            ShorthandKind::NonDigit => !ch.is_ascii_digit(),
            ShorthandKind::Word => is_word_char(ch),
            ShorthandKind::NonWord => !is_word_char(ch),
            ShorthandKind::Space => ch.is_whitespace(),
            ShorthandKind::NonSpace => !ch.is_whitespace(),
        }
    }
}

/// `[A-Za-z0-9_]`, shared by `\w` and the word-boundary assertions.
pub fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Flag changes requested by an inline group. `None` leaves the flag untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub case_insensitive: Option<bool>,
    pub dot_all: Option<bool>,
    pub multiline: Option<bool>,
}

impl FlagOverrides {
    pub fn apply(self, mut flags: Flags) -> Flags {
        if let Some(on) = self.case_insensitive {
            flags.case_insensitive = on;
        }
        if let Some(on) = self.dot_all {
            flags.dot_all = on;
        }
        if let Some(on) = self.multiline {
            flags.multiline = on;
        }
        flags
    }
}

/// Anchor kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorKind {
    /// `^`: start of string (or line, in multiline mode).
    Start,
    /// `$`: end of string (or line, in multiline mode).
    End,
    /// `\b`: word boundary.
    WordBoundary,
    /// `\B`: non-word boundary.
    NonWordBoundary,
}

impl AstNode {
    /// Whether the node can match without consuming input.
    pub fn can_match_empty(&self) -> bool {
        match self {
            AstNode::Empty
            | AstNode::Anchor(_)
            | AstNode::Lookaround { .. }
            | AstNode::Backreference(_) => true,
            AstNode::Literal(_)
            | AstNode::Dot
            | AstNode::CharClass { .. }
            | AstNode::ShorthandClass(_) => false,
            AstNode::Concat(nodes) => nodes.iter().all(AstNode::can_match_empty),
            AstNode::Alternation(nodes) => nodes.iter().any(AstNode::can_match_empty),
            AstNode::Quantifier { node, min, .. } => *min == 0 || node.can_match_empty(),
            AstNode::Group { node, .. } | AstNode::InlineFlags { node, .. } => {
                node.can_match_empty()
            }
        }
    }

    /// Longest input the node can consume, or `None` when unbounded.
    /// Backreferences count as unbounded.
    pub fn max_width(&self) -> Option<usize> {
        match self {
            AstNode::Empty | AstNode::Anchor(_) | AstNode::Lookaround { .. } => Some(0),
            AstNode::Literal(_)
            | AstNode::Dot
            | AstNode::CharClass { .. }
            | AstNode::ShorthandClass(_) => Some(1),
            AstNode::Backreference(_) => None,
            AstNode::Concat(nodes) => nodes
                .iter()
                .try_fold(0usize, |acc, n| acc.checked_add(n.max_width()?)),
            AstNode::Alternation(nodes) => nodes
                .iter()
                .try_fold(0usize, |acc, n| Some(acc.max(n.max_width()?))),
            AstNode::Quantifier { node, max, .. } => {
                let width = node.max_width()?;
                match max {
                    _ if width == 0 => Some(0),
                    None => None,
                    Some(max) => width.checked_mul(*max as usize),
                }
            }
            AstNode::Group { node, .. } | AstNode::InlineFlags { node, .. } => node.max_width(),
        }
    }

    /// Upper bound on the number of instructions the compiler emits for this node.
    pub fn expanded_size(&self) -> usize {
        match self {
            AstNode::Empty => 0,
            AstNode::Literal(_)
            | AstNode::Dot
            | AstNode::CharClass { .. }
            | AstNode::ShorthandClass(_)
            | AstNode::Anchor(_)
            | AstNode::Backreference(_) => 1,
            AstNode::Concat(nodes) => nodes
                .iter()
                .fold(0usize, |acc, n| acc.saturating_add(n.expanded_size())),
            AstNode::Alternation(nodes) => nodes.iter().fold(0usize, |acc, n| {
                acc.saturating_add(n.expanded_size()).saturating_add(2)
            }),
            AstNode::Quantifier { node, min, max, .. } => {
                // Body plus a possible progress mark and check.
                let body = node.expanded_size().saturating_add(2);
                let required = body.saturating_mul(*min as usize);
                let optional = match max {
                    None => body.saturating_add(2),
                    Some(max) => body
                        .saturating_add(1)
                        .saturating_mul(max.saturating_sub(*min) as usize),
                };
                required.saturating_add(optional)
            }
            AstNode::Group { node, .. } | AstNode::Lookaround { node, .. } => {
                node.expanded_size().saturating_add(2)
            }
            AstNode::InlineFlags { node, .. } => node.expanded_size(),
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a AstNode)) {
        visit(self);
        match self {
            AstNode::Concat(nodes) | AstNode::Alternation(nodes) => {
                for node in nodes {
                    node.walk(visit);
                }
            }
            AstNode::Quantifier { node, .. }
            | AstNode::Group { node, .. }
            | AstNode::Lookaround { node, .. }
            | AstNode::InlineFlags { node, .. } => node.walk(visit),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_match_empty() {
        let star = AstNode::Quantifier {
            node: Box::new(AstNode::Literal('a')),
            min: 0,
            max: None,
            greedy: true,
        };
        assert!(star.can_match_empty());
        assert!(!AstNode::Concat(vec![AstNode::Literal('b'), star.clone()]).can_match_empty());
        assert!(AstNode::Alternation(vec![AstNode::Literal('b'), AstNode::Empty]).can_match_empty());
    }

    #[test]
    fn test_max_width() {
        let width = |p: &str| crate::parser::parse(p).unwrap().root.max_width();
        assert_eq!(width("abc"), Some(3));
        assert_eq!(width(r"\$|ab"), Some(2));
        assert_eq!(width("a{2,5}b?"), Some(6));
        assert_eq!(width("(?:^|x)(?=yyy)"), Some(1));
        assert_eq!(width("a+"), None);
        assert_eq!(width(r"(a)\1"), None);
        assert_eq!(width("(?:)*"), Some(0));
    }

    #[test]
    fn test_flag_overrides_apply() {
        let overrides = FlagOverrides {
            case_insensitive: Some(false),
            dot_all: Some(true),
            multiline: None,
        };
        let flags = overrides.apply(Flags::default().with_case_insensitive(true).with_multiline(true));
        assert!(!flags.case_insensitive);
        assert!(flags.dot_all);
        assert!(flags.multiline);
    }
}
