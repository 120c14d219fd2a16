//! Helpers for assembling patterns piece by piece.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Characters that carry meaning outside a class.
const META: &[char] = &['.', '*', '+', '?', '^', '$', '{', '}', '(', ')', '|', '[', ']', '\\'];

/// Escape every metacharacter in `text` so it matches literally.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if META.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// A class matching any of `chars` (or none of them when `negate`).
pub fn char_class(chars: &[&str], negate: bool) -> String {
    let mut out = String::from("[");
    if negate {
        out.push('^');
    }
    for piece in chars {
        for ch in escape(piece).chars() {
            // A bare '-' would form a range with its neighbours.
            if ch == '-' {
                out.push('\\');
            }
            out.push(ch);
        }
    }
    out.push(']');
    out
}

/// The shortest quantifier for `min..=max` repetitions (`None` is unbounded).
pub fn quantifier(min: u32, max: Option<u32>) -> String {
    match (min, max) {
        (0, Some(1)) => "?".to_string(),
        (0, None) => "*".to_string(),
        (1, None) => "+".to_string(),
        (min, None) => format!("{{{min},}}"),
        (min, Some(max)) if min == max => format!("{{{min}}}"),
        (min, Some(max)) => format!("{{{min},{max}}}"),
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
    #[error("component index {index} out of range (have {len})")]
    OutOfRange { index: usize, len: usize },
}

/// The palette of components a pattern can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentKind {
    Word,
    Digit,
    Space,
    Any,
    ZeroOrMore,
    OneOrMore,
    ZeroOrOne,
    Exact,
    Group,
    NonCapture,
    Lookahead,
    StartAnchor,
    EndAnchor,
    WordBoundary,
    CharacterClass,
    Alternation,
    /// Free text supplied by the caller, used as-is.
    Literal,
}

impl ComponentKind {
    pub const PALETTE: [ComponentKind; 16] = [
        ComponentKind::Word,
        ComponentKind::Digit,
        ComponentKind::Space,
        ComponentKind::Any,
        ComponentKind::ZeroOrMore,
        ComponentKind::OneOrMore,
        ComponentKind::ZeroOrOne,
        ComponentKind::Exact,
        ComponentKind::Group,
        ComponentKind::NonCapture,
        ComponentKind::Lookahead,
        ComponentKind::StartAnchor,
        ComponentKind::EndAnchor,
        ComponentKind::WordBoundary,
        ComponentKind::CharacterClass,
        ComponentKind::Alternation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Word => "word",
            ComponentKind::Digit => "digit",
            ComponentKind::Space => "space",
            ComponentKind::Any => "any",
            ComponentKind::ZeroOrMore => "zero-or-more",
            ComponentKind::OneOrMore => "one-or-more",
            ComponentKind::ZeroOrOne => "zero-or-one",
            ComponentKind::Exact => "exact",
            ComponentKind::Group => "group",
            ComponentKind::NonCapture => "non-capture",
            ComponentKind::Lookahead => "lookahead",
            ComponentKind::StartAnchor => "start-anchor",
            ComponentKind::EndAnchor => "end-anchor",
            ComponentKind::WordBoundary => "word-boundary",
            ComponentKind::CharacterClass => "character-class",
            ComponentKind::Alternation => "alternation",
            ComponentKind::Literal => "literal",
        }
    }

    /// Default fragment and description for a palette component.
    pub fn fragment(self) -> (&'static str, &'static str) {
        match self {
            ComponentKind::Word => (r"\w+", "Word"),
            ComponentKind::Digit => (r"\d", "Digit (0-9)"),
            ComponentKind::Space => (r"\s", "Whitespace"),
            ComponentKind::Any => (".", "Any character"),
            ComponentKind::ZeroOrMore => ("*", "Zero or more"),
            ComponentKind::OneOrMore => ("+", "One or more"),
            ComponentKind::ZeroOrOne => ("?", "Zero or one"),
            ComponentKind::Exact => ("{1}", "Exact count"),
            ComponentKind::Group => ("()", "Group"),
            ComponentKind::NonCapture => ("(?:)", "Non-capture group"),
            ComponentKind::Lookahead => ("(?=)", "Positive lookahead"),
            ComponentKind::StartAnchor => ("^", "Start of string"),
            ComponentKind::EndAnchor => ("$", "End of string"),
            ComponentKind::WordBoundary => (r"\b", "Word boundary"),
            ComponentKind::CharacterClass => ("[]", "Character class"),
            ComponentKind::Alternation => ("|", "Alternation (OR)"),
            ComponentKind::Literal => ("", "Literal text"),
        }
    }
}

impl FromStr for ComponentKind {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::PALETTE
            .into_iter()
            .chain([ComponentKind::Literal])
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BuilderError::UnknownComponent(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub pattern: String,
    pub description: String,
}

impl Component {
    pub fn new(kind: ComponentKind) -> Self {
        let (pattern, description) = kind.fragment();
        Component {
            kind,
            pattern: pattern.to_string(),
            description: description.to_string(),
        }
    }

    /// A component with a fragment other than its kind's default.
    pub fn custom(kind: ComponentKind, pattern: &str, description: &str) -> Self {
        Component {
            kind,
            pattern: pattern.to_string(),
            description: description.to_string(),
        }
    }

    /// Text matched literally; metacharacters are escaped.
    pub fn literal(text: &str) -> Self {
        Component::custom(ComponentKind::Literal, &escape(text), "Literal text")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderPreset {
    Email,
    Phone,
    Url,
    Date,
}

impl FromStr for BuilderPreset {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(BuilderPreset::Email),
            "phone" => Ok(BuilderPreset::Phone),
            "url" => Ok(BuilderPreset::Url),
            "date" => Ok(BuilderPreset::Date),
            _ => Err(BuilderError::UnknownPreset(s.to_string())),
        }
    }
}

impl BuilderPreset {
    pub fn components(self) -> Vec<Component> {
        use ComponentKind::*;
        let parts: &[(ComponentKind, &str, &str)] = match self {
            BuilderPreset::Email => &[
                (StartAnchor, "^", "Start of string"),
                (Word, "[a-zA-Z0-9._%+-]+", "Username"),
                (Literal, "@", "At symbol"),
                (Word, "[a-zA-Z0-9.-]+", "Domain name"),
                (Literal, r"\.", "Dot"),
                (Word, "[a-zA-Z]{2,}", "Top-level domain"),
                (EndAnchor, "$", "End of string"),
            ],
            BuilderPreset::Phone => &[
                (StartAnchor, "^", "Start of string"),
                (Literal, "1", "Country code"),
                (Digit, "[3-9]", "First digit"),
                (Digit, r"\d{9}", "Remaining digits"),
                (EndAnchor, "$", "End of string"),
            ],
            BuilderPreset::Url => &[
                (StartAnchor, "^", "Start of string"),
                (Literal, "https?://", "Protocol"),
                (Word, "[a-zA-Z0-9.-]+", "Domain"),
                (Literal, r"\.[a-zA-Z]{2,}", "TLD"),
                (Any, ".*", "Path"),
                (EndAnchor, "$", "End of string"),
            ],
            BuilderPreset::Date => &[
                (StartAnchor, "^", "Start of string"),
                (Digit, r"\d{4}", "Year"),
                (Literal, "-", "Separator"),
                (Digit, r"\d{2}", "Month"),
                (Literal, "-", "Separator"),
                (Digit, r"\d{2}", "Day"),
                (EndAnchor, "$", "End of string"),
            ],
        };
        parts
            .iter()
            .map(|&(kind, pattern, description)| Component::custom(kind, pattern, description))
            .collect()
    }
}

/// Concatenate component fragments into a pattern.
pub fn join(components: &[Component]) -> String {
    components.iter().map(|c| c.pattern.as_str()).collect()
}

/// An ordered list of components being edited.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Builder {
    components: Vec<Component>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_preset(preset: BuilderPreset) -> Self {
        Builder {
            components: preset.components(),
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn push(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn remove(&mut self, index: usize) -> Result<Component, BuilderError> {
        self.check(index)?;
        Ok(self.components.remove(index))
    }

    /// Move the component at `from` so that it ends up at `to`.
    pub fn move_component(&mut self, from: usize, to: usize) -> Result<(), BuilderError> {
        self.check(from)?;
        self.check(to)?;
        let component = self.components.remove(from);
        self.components.insert(to, component);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }

    pub fn pattern(&self) -> String {
        join(&self.components)
    }

    fn check(&self, index: usize) -> Result<(), BuilderError> {
        if index < self.components.len() {
            Ok(())
        } else {
            Err(BuilderError::OutOfRange {
                index,
                len: self.components.len(),
            })
        }
    }
}

impl fmt::Display for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("a.b*c"), r"a\.b\*c");
        assert_eq!(escape("(x)[y]{z}|^$?+\\"), r"\(x\)\[y\]\{z\}\|\^\$\?\+\\");
        assert_eq!(escape("a-b/c"), "a-b/c");
    }

    #[test]
    fn test_char_class() {
        assert_eq!(char_class(&["a", "b", "."], false), r"[ab\.]");
        assert_eq!(char_class(&["a", "-", "z"], true), r"[^a\-z]");
    }

    #[test]
    fn test_quantifier() {
        assert_eq!(quantifier(0, Some(1)), "?");
        assert_eq!(quantifier(0, None), "*");
        assert_eq!(quantifier(1, None), "+");
        assert_eq!(quantifier(3, Some(3)), "{3}");
        assert_eq!(quantifier(2, None), "{2,}");
        assert_eq!(quantifier(2, Some(5)), "{2,5}");
    }

    #[test]
    fn test_presets_join() {
        assert_eq!(
            Builder::from_preset(BuilderPreset::Email).pattern(),
            r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$"
        );
        assert_eq!(Builder::from_preset(BuilderPreset::Date).pattern(), r"^\d{4}-\d{2}-\d{2}$");
    }

    #[test]
    fn test_edit_components() {
        let mut builder = Builder::new();
        builder
            .push(Component::new(ComponentKind::Digit))
            .push(Component::new(ComponentKind::OneOrMore))
            .push(Component::new(ComponentKind::StartAnchor));
        builder.move_component(2, 0).unwrap();
        assert_eq!(builder.pattern(), r"^\d+");
        builder.remove(0).unwrap();
        assert_eq!(builder.to_string(), r"\d+");
        assert_eq!(
            builder.remove(5),
            Err(BuilderError::OutOfRange { index: 5, len: 2 })
        );
        assert_eq!("word-boundary".parse::<ComponentKind>().unwrap(), ComponentKind::WordBoundary);
    }
}
