//! Regex parser: converts a pattern string into an AST.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};

/// Largest count accepted in `{m,n}`.
pub const MAX_REPEAT: u32 = 1000;

/// Deepest group nesting accepted.
const MAX_NESTING: usize = 256;

/// Largest program, in instructions, a pattern may expand to.
pub const MAX_PROGRAM_SIZE: usize = 200_000;

/// Parse a pattern string.
pub fn parse(pattern: &str) -> Result<Ast, ParseError> {
    Parser::new(pattern).parse()
}

pub struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
    group_count: usize,
    group_names: Vec<Option<String>>,
}

/// One element of a character class before range assembly.
enum ClassAtom {
    Char(char),
    Shorthand(ShorthandKind),
}

impl Parser {
    pub fn new(pattern: &str) -> Self {
        Parser {
            chars: pattern.chars().collect(),
            pos: 0,
            depth: 0,
            group_count: 0,
            group_names: vec![None],
        }
    }

    /// Parse the full pattern.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let root = self.parse_alternation()?;
        if let Some(ch) = self.peek() {
            // parse_concat only stops early on ')'
            return Err(self.error_at(
                ParseErrorKind::UnterminatedGroup,
                self.pos,
                format!("unmatched '{ch}'"),
            ));
        }
        let size = root.expanded_size();
        if size > MAX_PROGRAM_SIZE {
            return Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                0,
                format!("repetitions expand to {size} instructions, limit is {MAX_PROGRAM_SIZE}"),
            ));
        }
        Ok(Ast {
            root,
            group_count: self.group_count,
            group_names: self.group_names,
        })
    }

    fn error_at(&self, kind: ParseErrorKind, position: usize, detail: impl Into<String>) -> ParseError {
        ParseError::new(kind, position, detail)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parse alternation: `a|b|c`
    fn parse_alternation(&mut self) -> Result<AstNode, ParseError> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            Ok(branches.swap_remove(0))
        } else {
            Ok(AstNode::Alternation(branches))
        }
    }

    /// Parse concatenation: `abc`
    fn parse_concat(&mut self) -> Result<AstNode, ParseError> {
        let mut nodes = Vec::new();
        while let Some(ch) = self.peek() {
            if ch == ')' || ch == '|' {
                break;
            }
            nodes.push(self.parse_quantified()?);
        }
        match nodes.len() {
            0 => Ok(AstNode::Empty),
            1 => Ok(nodes.swap_remove(0)),
            _ => Ok(AstNode::Concat(nodes)),
        }
    }

    /// Parse an atom possibly followed by a quantifier.
    fn parse_quantified(&mut self) -> Result<AstNode, ParseError> {
        let atom_pos = self.pos;
        let node = self.parse_atom()?;
        let quant_pos = self.pos;
        let Some((min, max)) = self.parse_quantifier()? else {
            return Ok(node);
        };
        if matches!(node, AstNode::Anchor(_) | AstNode::Lookaround { .. }) {
            return Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                quant_pos,
                format!("'{}' cannot be repeated", self.slice(atom_pos, quant_pos)),
            ));
        }
        let greedy = !self.eat('?');
        if self.at_quantifier() {
            return Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                self.pos,
                "nothing to repeat",
            ));
        }
        Ok(AstNode::Quantifier {
            node: Box::new(node),
            min,
            max,
            greedy,
        })
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Whether the next token is a quantifier.
    fn at_quantifier(&self) -> bool {
        match self.peek() {
            Some('*' | '+' | '?') => true,
            Some('{') => self.scan_brace().is_some(),
            _ => false,
        }
    }

    /// Consume a quantifier if one follows, returning `(min, max)`.
    fn parse_quantifier(&mut self) -> Result<Option<(u32, Option<u32>)>, ParseError> {
        let start = self.pos;
        let bounds = match self.peek() {
            Some('*') => (0, None),
            Some('+') => (1, None),
            Some('?') => (0, Some(1)),
            Some('{') => {
                let Some((min, max, end)) = self.scan_brace() else {
                    // Not a quantifier, the '{' is a literal.
                    return Ok(None);
                };
                self.pos = end;
                return self.check_brace_bounds(start, min, max).map(Some);
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(bounds))
    }

    fn check_brace_bounds(
        &self,
        start: usize,
        min: u64,
        max: Option<u64>,
    ) -> Result<(u32, Option<u32>), ParseError> {
        if let Some(max) = max {
            if min > max {
                return Err(self.error_at(
                    ParseErrorKind::InvalidQuantifier,
                    start,
                    format!("numbers out of order in {{{min},{max}}}"),
                ));
            }
        }
        let limit = u64::from(MAX_REPEAT);
        if min > limit || max.is_some_and(|m| m > limit) {
            return Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                start,
                format!("repetition count exceeds {MAX_REPEAT}"),
            ));
        }
        // Both bounds were just checked against MAX_REPEAT.
        Ok((min as u32, max.map(|m| m as u32)))
    }

    /// Look ahead for `{n}`, `{n,}` or `{n,m}` at the current position
    /// without consuming. Returns the bounds and the position after `}`.
    fn scan_brace(&self) -> Option<(u64, Option<u64>, usize)> {
        let mut pos = self.pos;
        if self.chars.get(pos) != Some(&'{') {
            return None;
        }
        pos += 1;
        let (min, after_min) = self.scan_number(pos)?;
        pos = after_min;
        let max = if self.chars.get(pos) == Some(&',') {
            pos += 1;
            match self.scan_number(pos) {
                Some((max, after_max)) => {
                    pos = after_max;
                    Some(max)
                }
                None => None,
            }
        } else {
            Some(min)
        };
        if self.chars.get(pos) != Some(&'}') {
            return None;
        }
        Some((min, max, pos + 1))
    }

    fn scan_number(&self, start: usize) -> Option<(u64, usize)> {
        let mut pos = start;
        let mut value: u64 = 0;
        while let Some(digit) = self.chars.get(pos).and_then(|c| c.to_digit(10)) {
            value = value.saturating_mul(10).saturating_add(u64::from(digit));
            pos += 1;
        }
        (pos > start).then_some((value, pos))
    }

    /// Parse a single atom (literal, class, group, anchor, etc.)
    fn parse_atom(&mut self) -> Result<AstNode, ParseError> {
        let start = self.pos;
        match self.peek() {
            None => Err(self.error_at(
                ParseErrorKind::DanglingMetacharacter,
                start,
                "unexpected end of pattern",
            )),
            Some('(') => self.parse_group(),
            Some('[') => self.parse_char_class(),
            Some('\\') => self.parse_escape(),
            Some('*' | '+' | '?') => Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                start,
                "nothing to repeat",
            )),
            Some('{') if self.scan_brace().is_some() => Err(self.error_at(
                ParseErrorKind::InvalidQuantifier,
                start,
                "nothing to repeat",
            )),
            Some(ch) => {
                self.advance();
                Ok(match ch {
                    '.' => AstNode::Dot,
                    '^' => AstNode::Anchor(AnchorKind::Start),
                    '$' => AstNode::Anchor(AnchorKind::End),
                    _ => AstNode::Literal(ch),
                })
            }
        }
    }

    /// Parse an escape sequence outside a character class.
    fn parse_escape(&mut self) -> Result<AstNode, ParseError> {
        let start = self.pos;
        self.advance(); // consume '\\'
        let Some(ch) = self.advance() else {
            return Err(self.error_at(
                ParseErrorKind::DanglingMetacharacter,
                start,
                "'\\' at end of pattern",
            ));
        };
        match ch {
            'd' => Ok(AstNode::ShorthandClass(ShorthandKind::Digit)),
            'D' => Ok(AstNode::ShorthandClass(ShorthandKind::NonDigit)),
            'w' => Ok(AstNode::ShorthandClass(ShorthandKind::Word)),
            'W' => Ok(AstNode::ShorthandClass(ShorthandKind::NonWord)),
            's' => Ok(AstNode::ShorthandClass(ShorthandKind::Space)),
            'S' => Ok(AstNode::ShorthandClass(ShorthandKind::NonSpace)),
            'b' => Ok(AstNode::Anchor(AnchorKind::WordBoundary)),
            'B' => Ok(AstNode::Anchor(AnchorKind::NonWordBoundary)),
            '1'..='9' => self.parse_numbered_backref(start),
            'k' => self.parse_named_backref(start),
            _ => Ok(AstNode::Literal(self.parse_char_escape(start, ch)?)),
        }
    }

    /// Escapes that denote one character, valid inside and outside classes.
    fn parse_char_escape(&mut self, start: usize, ch: char) -> Result<char, ParseError> {
        match ch {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'f' => Ok('\u{0C}'),
            'v' => Ok('\u{0B}'),
            '0' => Ok('\0'),
            'x' => self.parse_hex_escape(start, 2),
            'u' => self.parse_hex_escape(start, 4),
            // Escaped literal: \., \*, \\, etc.
            other => Ok(other),
        }
    }

    fn parse_hex_escape(&mut self, start: usize, len: usize) -> Result<char, ParseError> {
        let mut value = 0u32;
        for _ in 0..len {
            let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                self.error_at(
                    ParseErrorKind::InvalidEscape,
                    start,
                    format!("expected {len} hex digits"),
                )
            })?;
            self.advance();
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or_else(|| {
            self.error_at(
                ParseErrorKind::InvalidEscape,
                start,
                format!("U+{value:04X} is not a valid character"),
            )
        })
    }

    /// `\N`: the longest digit run that still names an opened group.
    fn parse_numbered_backref(&mut self, start: usize) -> Result<AstNode, ParseError> {
        let mut index = self.chars[self.pos - 1].to_digit(10).unwrap_or(0) as usize;
        if index > self.group_count {
            return Err(self.error_at(
                ParseErrorKind::UnknownGroupReference,
                start,
                format!("group {index} is not defined before this reference"),
            ));
        }
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            let longer = index * 10 + digit as usize;
            if longer > self.group_count {
                break;
            }
            index = longer;
            self.advance();
        }
        Ok(AstNode::Backreference(index))
    }

    /// `\k<name>`
    fn parse_named_backref(&mut self, start: usize) -> Result<AstNode, ParseError> {
        if !self.eat('<') {
            return Err(self.error_at(
                ParseErrorKind::InvalidEscape,
                start,
                "expected '<' after \\k",
            ));
        }
        let name = self.parse_group_name(start)?;
        let index = self
            .group_names
            .iter()
            .position(|n| n.as_deref() == Some(name.as_str()))
            .ok_or_else(|| {
                self.error_at(
                    ParseErrorKind::UnknownGroupReference,
                    start,
                    format!("no group named '{name}' before this reference"),
                )
            })?;
        Ok(AstNode::Backreference(index))
    }

    /// Read an identifier up to and including the closing `>`.
    fn parse_group_name(&mut self, start: usize) -> Result<String, ParseError> {
        let mut name = String::new();
        loop {
            match self.advance() {
                Some('>') => break,
                Some(ch) if ch.is_alphanumeric() || ch == '_' || ch == '$' => name.push(ch),
                Some(ch) => {
                    return Err(self.error_at(
                        ParseErrorKind::InvalidGroupName,
                        start,
                        format!("unexpected '{ch}' in group name"),
                    ));
                }
                None => {
                    return Err(self.error_at(
                        ParseErrorKind::InvalidGroupName,
                        start,
                        "unterminated group name",
                    ));
                }
            }
        }
        match name.chars().next() {
            None => Err(self.error_at(ParseErrorKind::InvalidGroupName, start, "empty group name")),
            Some(first) if first.is_ascii_digit() => Err(self.error_at(
                ParseErrorKind::InvalidGroupName,
                start,
                format!("group name '{name}' starts with a digit"),
            )),
            Some(_) => Ok(name),
        }
    }

    /// Parse a group: `(...)`, `(?:...)`, `(?<name>...)`, lookaround and inline flags.
    fn parse_group(&mut self) -> Result<AstNode, ParseError> {
        let open = self.pos;
        self.advance(); // consume '('
        if self.depth >= MAX_NESTING {
            return Err(self.error_at(
                ParseErrorKind::NestingTooDeep,
                open,
                format!("more than {MAX_NESTING} nested groups"),
            ));
        }

        if !self.eat('?') {
            self.group_count += 1;
            self.group_names.push(None);
            let index = self.group_count;
            let node = self.parse_group_body(open)?;
            return Ok(AstNode::Group {
                kind: GroupKind::Capturing(index),
                node: Box::new(node),
            });
        }

        match self.peek() {
            Some(':') => {
                self.advance();
                let node = self.parse_group_body(open)?;
                Ok(AstNode::Group {
                    kind: GroupKind::NonCapturing,
                    node: Box::new(node),
                })
            }
            Some(c @ ('=' | '!')) => {
                self.advance();
                self.parse_lookaround(open, LookDirection::Ahead, c == '!')
            }
            Some('<') if matches!(self.peek_at(1), Some('=' | '!')) => {
                self.advance();
                let negated = self.advance() == Some('!');
                self.parse_lookaround(open, LookDirection::Behind, negated)
            }
            Some('<') => {
                self.advance();
                let name = self.parse_group_name(open)?;
                if self.group_names.iter().any(|n| n.as_deref() == Some(name.as_str())) {
                    return Err(self.error_at(
                        ParseErrorKind::DuplicateGroupName,
                        open,
                        format!("group name '{name}' is already defined"),
                    ));
                }
                self.group_count += 1;
                self.group_names.push(Some(name.clone()));
                let index = self.group_count;
                let node = self.parse_group_body(open)?;
                Ok(AstNode::Group {
                    kind: GroupKind::Named(index, name),
                    node: Box::new(node),
                })
            }
            Some('i' | 'm' | 's' | '-') => {
                let flags = self.parse_inline_flags(open)?;
                let node = self.parse_group_body(open)?;
                Ok(AstNode::InlineFlags {
                    node: Box::new(node),
                    flags,
                })
            }
            _ => Err(self.error_at(
                ParseErrorKind::InvalidGroup,
                open,
                "invalid group syntax after '(?'",
            )),
        }
    }

    fn parse_lookaround(
        &mut self,
        open: usize,
        direction: LookDirection,
        negated: bool,
    ) -> Result<AstNode, ParseError> {
        let node = self.parse_group_body(open)?;
        Ok(AstNode::Lookaround {
            node: Box::new(node),
            direction,
            negated,
        })
    }

    /// Parse `ims-ims:` after `(?`.
    fn parse_inline_flags(&mut self, open: usize) -> Result<FlagOverrides, ParseError> {
        let mut flags = FlagOverrides::default();
        let mut enable = true;
        loop {
            let Some(ch) = self.advance() else {
                return Err(self.error_at(
                    ParseErrorKind::UnterminatedGroup,
                    open,
                    "missing ')'",
                ));
            };
            let slot = match ch {
                ':' => return Ok(flags),
                '-' if enable => {
                    enable = false;
                    continue;
                }
                'i' => &mut flags.case_insensitive,
                'm' => &mut flags.multiline,
                's' => &mut flags.dot_all,
                _ => {
                    return Err(self.error_at(
                        ParseErrorKind::InvalidGroup,
                        open,
                        format!("unexpected '{ch}' in inline flags"),
                    ));
                }
            };
            if slot.is_some() {
                return Err(self.error_at(
                    ParseErrorKind::InvalidGroup,
                    open,
                    format!("flag '{ch}' repeated"),
                ));
            }
            *slot = Some(enable);
        }
    }

    /// Parse the contents of a group and its closing `)`.
    fn parse_group_body(&mut self, open: usize) -> Result<AstNode, ParseError> {
        self.depth += 1;
        let node = self.parse_alternation()?;
        self.depth -= 1;
        if !self.eat(')') {
            return Err(self.error_at(
                ParseErrorKind::UnterminatedGroup,
                open,
                "missing ')'",
            ));
        }
        Ok(node)
    }

    /// Parse a character class: `[abc]`, `[a-z]`, `[^abc]`.
    fn parse_char_class(&mut self) -> Result<AstNode, ParseError> {
        let open = self.pos;
        self.advance(); // consume '['
        let negated = self.eat('^');

        let mut items = Vec::new();
        loop {
            let atom = match self.peek() {
                None => {
                    return Err(self.error_at(
                        ParseErrorKind::UnterminatedCharClass,
                        open,
                        "missing ']'",
                    ));
                }
                Some(']') => {
                    self.advance();
                    break;
                }
                Some(_) => self.parse_class_atom(open)?,
            };
            let lo = match atom {
                ClassAtom::Char(ch) => ch,
                ClassAtom::Shorthand(kind) => {
                    items.push(ClassItem::Shorthand(kind));
                    continue;
                }
            };
            // A '-' forms a range unless it is the last character before ']'.
            let is_range = self.peek() == Some('-') && !matches!(self.peek_at(1), None | Some(']'));
            if !is_range {
                items.push(ClassItem::Literal(lo));
                continue;
            }
            let dash = self.pos;
            self.advance(); // consume '-'
            match self.parse_class_atom(open)? {
                ClassAtom::Char(hi) if lo <= hi => items.push(ClassItem::Range(lo, hi)),
                ClassAtom::Char(hi) => {
                    return Err(self.error_at(
                        ParseErrorKind::InvalidCharRange,
                        dash,
                        format!("range {lo:?}-{hi:?} is out of order"),
                    ));
                }
                ClassAtom::Shorthand(kind) => {
                    // `[a-\d]`: the dash is literal.
                    items.push(ClassItem::Literal(lo));
                    items.push(ClassItem::Literal('-'));
                    items.push(ClassItem::Shorthand(kind));
                }
            }
        }
        Ok(AstNode::CharClass { items, negated })
    }

    fn parse_class_atom(&mut self, open: usize) -> Result<ClassAtom, ParseError> {
        let start = self.pos;
        match self.advance() {
            None => Err(self.error_at(
                ParseErrorKind::UnterminatedCharClass,
                open,
                "missing ']'",
            )),
            Some('\\') => {
                let Some(ch) = self.advance() else {
                    return Err(self.error_at(
                        ParseErrorKind::UnterminatedCharClass,
                        open,
                        "missing ']'",
                    ));
                };
                Ok(match ch {
                    'd' => ClassAtom::Shorthand(ShorthandKind::Digit),
                    'D' => ClassAtom::Shorthand(ShorthandKind::NonDigit),
                    'w' => ClassAtom::Shorthand(ShorthandKind::Word),
                    'W' => ClassAtom::Shorthand(ShorthandKind::NonWord),
                    's' => ClassAtom::Shorthand(ShorthandKind::Space),
                    'S' => ClassAtom::Shorthand(ShorthandKind::NonSpace),
                    // Backspace inside a class.
                    'b' => ClassAtom::Char('\u{08}'),
                    _ => ClassAtom::Char(self.parse_char_escape(start, ch)?),
                })
            }
            Some(ch) => Ok(ClassAtom::Char(ch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_err(pattern: &str) -> ParseErrorKind {
        match parse(pattern) {
            Ok(ast) => panic!("expected error for {pattern:?}, got {:?}", ast.root),
            Err(e) => e.kind,
        }
    }

    #[test]
    fn test_precedence() {
        let ast = parse("ab|c*").unwrap();
        assert_eq!(
            ast.root,
            AstNode::Alternation(vec![
                AstNode::Concat(vec![AstNode::Literal('a'), AstNode::Literal('b')]),
                AstNode::Quantifier {
                    node: Box::new(AstNode::Literal('c')),
                    min: 0,
                    max: None,
                    greedy: true,
                },
            ])
        );
    }

    #[test]
    fn test_group_indices_left_to_right() {
        let ast = parse("((a)(?<year>b))(?:c)(d)").unwrap();
        assert_eq!(ast.group_count, 4);
        assert_eq!(
            ast.group_names,
            vec![None, None, None, Some("year".to_string()), None]
        );
    }

    #[test]
    fn test_brace_quantifiers() {
        let ast = parse("a{2,5}?").unwrap();
        assert_eq!(
            ast.root,
            AstNode::Quantifier {
                node: Box::new(AstNode::Literal('a')),
                min: 2,
                max: Some(5),
                greedy: false,
            }
        );
        // Not a quantifier: literal braces.
        assert_eq!(
            parse("a{,5}").unwrap().root,
            AstNode::Concat("a{,5}".chars().map(AstNode::Literal).collect())
        );
    }

    #[test]
    fn test_class_items() {
        let ast = parse(r"[^a-z\d_-]").unwrap();
        assert_eq!(
            ast.root,
            AstNode::CharClass {
                items: vec![
                    ClassItem::Range('a', 'z'),
                    ClassItem::Shorthand(ShorthandKind::Digit),
                    ClassItem::Literal('_'),
                    ClassItem::Literal('-'),
                ],
                negated: true,
            }
        );
    }

    #[test]
    fn test_unicode_escape_range() {
        let ast = parse(r"[\u4e00-\u9fa5]").unwrap();
        assert_eq!(
            ast.root,
            AstNode::CharClass {
                items: vec![ClassItem::Range('\u{4e00}', '\u{9fa5}')],
                negated: false,
            }
        );
    }

    #[test]
    fn test_backreferences() {
        assert_eq!(
            parse(r"(a)\1").unwrap().root,
            AstNode::Concat(vec![
                AstNode::Group {
                    kind: GroupKind::Capturing(1),
                    node: Box::new(AstNode::Literal('a')),
                },
                AstNode::Backreference(1),
            ])
        );
        let ast = parse(r"(?<q>['])\w*\k<q>").unwrap();
        let AstNode::Concat(nodes) = ast.root else { panic!() };
        assert_eq!(nodes[2], AstNode::Backreference(1));
        // Reference inside the group it names is allowed.
        assert!(parse(r"(a\1)").is_ok());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_err("[abc"), ParseErrorKind::UnterminatedCharClass);
        assert_eq!(parse_err("(abc"), ParseErrorKind::UnterminatedGroup);
        assert_eq!(parse_err("abc)"), ParseErrorKind::UnterminatedGroup);
        assert_eq!(parse_err("a{5,2}"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("*a"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("a|+"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("(?:+)"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("a**"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("^*"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("a{1001}"), ParseErrorKind::InvalidQuantifier);
        assert_eq!(parse_err("abc\\"), ParseErrorKind::DanglingMetacharacter);
        assert_eq!(parse_err("(?<n>a)(?<n>b)"), ParseErrorKind::DuplicateGroupName);
        assert_eq!(parse_err(r"\1(a)"), ParseErrorKind::UnknownGroupReference);
        assert_eq!(parse_err(r"\k<x>(?<x>a)"), ParseErrorKind::UnknownGroupReference);
        assert_eq!(parse_err("(?P<x>a)"), ParseErrorKind::InvalidGroup);
        assert_eq!(parse_err("(?<1a>a)"), ParseErrorKind::InvalidGroupName);
        assert_eq!(parse_err("[z-a]"), ParseErrorKind::InvalidCharRange);
        assert_eq!(parse_err(r"\x4"), ParseErrorKind::InvalidEscape);
    }

    #[test]
    fn test_error_position() {
        let err = parse("ab(cd").unwrap_err();
        assert_eq!(err.position, 2);
        let err = parse("ab[cd").unwrap_err();
        assert_eq!(err.position, 2);
    }

    #[test]
    fn test_lazy_then_quantifier_is_error() {
        assert!(parse("a??").is_ok());
        assert_eq!(parse_err("a???"), ParseErrorKind::InvalidQuantifier);
    }

    #[test]
    fn test_inline_flags() {
        let ast = parse("(?i-s:ab)").unwrap();
        let AstNode::InlineFlags { flags, .. } = ast.root else { panic!() };
        assert_eq!(flags.case_insensitive, Some(true));
        assert_eq!(flags.dot_all, Some(false));
        assert_eq!(flags.multiline, None);
    }

    #[test]
    fn test_empty_alternatives() {
        assert_eq!(
            parse("a|").unwrap().root,
            AstNode::Alternation(vec![AstNode::Literal('a'), AstNode::Empty])
        );
        assert_eq!(parse("").unwrap().root, AstNode::Empty);
    }

    #[test]
    fn test_expansion_limit() {
        assert!(parse("(a{100}){100}").is_ok());
        assert_eq!(parse_err("((a{1000}){1000}){1000}"), ParseErrorKind::InvalidQuantifier);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "(".repeat(300) + &")".repeat(300);
        assert_eq!(parse_err(&deep), ParseErrorKind::NestingTooDeep);
    }
}
