//! Static pattern analysis: what a pattern uses, how complex it is, and
//! what might make it slow or hard to read.

use serde::Serialize;

use crate::ast::{AnchorKind, AstNode, ShorthandKind};
use crate::error::ParseError;
use crate::parser::parse;

const LONG_PATTERN: usize = 100;
const VERBOSE_PATTERN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Constructs found in the pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Features {
    pub anchors: bool,
    pub quantifiers: bool,
    pub char_classes: bool,
    pub groups: bool,
    pub alternation: bool,
    pub lookaround: bool,
    pub backreferences: bool,
}

impl Features {
    fn collect(root: &AstNode) -> Self {
        let mut features = Features::default();
        root.walk(&mut |node| match node {
            AstNode::Anchor(_) => features.anchors = true,
            AstNode::Quantifier { .. } => features.quantifiers = true,
            AstNode::CharClass { .. } | AstNode::ShorthandClass(_) => features.char_classes = true,
            AstNode::Group { .. } => features.groups = true,
            AstNode::Alternation(_) => features.alternation = true,
            AstNode::Lookaround { .. } => features.lookaround = true,
            AstNode::Backreference(_) => features.backreferences = true,
            _ => {}
        });
        features
    }

    fn complexity(&self) -> Complexity {
        let score = [
            self.quantifiers,
            self.groups,
            self.alternation,
            self.char_classes,
            self.lookaround,
            self.backreferences,
        ]
        .into_iter()
        .filter(|&on| on)
        .count();
        match score {
            0..=1 => Complexity::Simple,
            2..=3 => Complexity::Medium,
            _ => Complexity::Complex,
        }
    }
}

/// Constructs likely to hurt matching performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    DotStar,
    GreedyCapture,
    NestedUnboundedQuantifier,
    LongPattern,
}

impl Issue {
    pub fn message(self) -> &'static str {
        match self {
            Issue::DotStar => "`.*` can be inefficient; prefer a more specific pattern",
            Issue::GreedyCapture => "`(.*)` may backtrack heavily; consider the lazy `(.*?)`",
            Issue::NestedUnboundedQuantifier => {
                "an unbounded quantifier inside another can backtrack exponentially"
            }
            Issue::LongPattern => "very long pattern; consider splitting it up",
        }
    }
}

/// Suggestions that make a pattern tighter or easier to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tip {
    LeadingDotStar,
    TrailingDotStar,
    SingleCharAlternation,
    AdjacentDigitRuns,
    RepeatedDigits,
    Verbose,
    NoAnchors,
}

impl Tip {
    pub fn message(self) -> &'static str {
        match self {
            Tip::LeadingDotStar => "starts with `.*`; use `^` if matching from the start",
            Tip::TrailingDotStar => "ends with `.*`; use `$` if matching to the end",
            Tip::SingleCharAlternation => "alternation of single characters; use a class like `[abc]`",
            Tip::AdjacentDigitRuns => r"`\d+\d+` can be written `\d{2,}`",
            Tip::RepeatedDigits => r"repeated `\d\d\d\d`; use a counted repeat like `\d{4}`",
            Tip::Verbose => "long pattern; consider breaking it into smaller parts",
            Tip::NoAnchors => "no anchors; add `^` and `$` for exact matching",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub pattern: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParseError>,
    /// Length in chars.
    pub length: usize,
    pub features: Features,
    pub complexity: Complexity,
    pub issues: Vec<Issue>,
    pub tips: Vec<Tip>,
}

/// Analyze `pattern`. Invalid patterns get only the length-based findings.
pub fn analyze(pattern: &str) -> Analysis {
    let length = pattern.chars().count();
    let mut issues = Vec::new();
    let mut tips = Vec::new();
    if length > LONG_PATTERN {
        issues.push(Issue::LongPattern);
    }
    if length > VERBOSE_PATTERN {
        tips.push(Tip::Verbose);
    }

    let ast = match parse(pattern) {
        Ok(ast) => ast,
        Err(error) => {
            return Analysis {
                pattern: pattern.to_string(),
                valid: false,
                error: Some(error),
                length,
                features: Features::default(),
                complexity: Complexity::Simple,
                issues,
                tips,
            };
        }
    };

    let features = Features::collect(&ast.root);
    let mut dot_star = false;
    let mut greedy_capture = false;
    let mut nested = false;
    let mut single_char_alt = false;
    let mut digit_runs = false;
    let mut repeated_digits = false;
    ast.root.walk(&mut |node| match node {
        AstNode::Quantifier { node: body, max: None, .. } => {
            dot_star |= is_dot_star(node);
            nested |= contains_unbounded(body);
        }
        AstNode::Group { kind, node: body } => {
            greedy_capture |= kind.index().is_some() && is_greedy_dot_star(body);
        }
        AstNode::Alternation(branches) => {
            single_char_alt |= branches.len() > 1 && branches.iter().all(|b| matches!(b, AstNode::Literal(_)));
        }
        AstNode::Concat(nodes) => {
            digit_runs |= nodes.windows(2).any(|w| is_digit_plus(&w[0]) && is_digit_plus(&w[1]));
            repeated_digits |= nodes.windows(4).any(|w| w.iter().all(is_digit));
        }
        _ => {}
    });

    if dot_star {
        issues.push(Issue::DotStar);
    }
    if greedy_capture {
        issues.push(Issue::GreedyCapture);
    }
    if nested {
        issues.push(Issue::NestedUnboundedQuantifier);
    }

    let (first, last) = edges(&ast.root);
    if first.is_some_and(is_dot_star) {
        tips.push(Tip::LeadingDotStar);
    }
    if last.is_some_and(is_dot_star) {
        tips.push(Tip::TrailingDotStar);
    }
    if single_char_alt {
        tips.push(Tip::SingleCharAlternation);
    }
    if digit_runs {
        tips.push(Tip::AdjacentDigitRuns);
    }
    if repeated_digits {
        tips.push(Tip::RepeatedDigits);
    }
    if !has_line_anchor(&ast.root) {
        tips.push(Tip::NoAnchors);
    }

    Analysis {
        pattern: pattern.to_string(),
        valid: true,
        error: None,
        length,
        complexity: features.complexity(),
        features,
        issues,
        tips,
    }
}

/// Sample subjects worth trying against `pattern`, chosen by what it looks for.
pub fn sample_inputs(pattern: &str) -> Vec<&'static str> {
    let mut samples = Vec::new();
    if pattern.contains('@') {
        samples.extend(["test@example.com", "user.name@domain.co.uk", "invalid@", "@domain.com"]);
    }
    if pattern.contains(r"\d") {
        samples.extend(["123", "12345", "abc123", "123abc"]);
    }
    if pattern.contains("[a-zA-Z]") {
        samples.extend(["hello", "Hello", "HELLO", "123"]);
    }
    samples
}

fn is_dot_star(node: &AstNode) -> bool {
    matches!(node, AstNode::Quantifier { node, min: 0, max: None, .. } if **node == AstNode::Dot)
}

fn is_greedy_dot_star(node: &AstNode) -> bool {
    matches!(node, AstNode::Quantifier { greedy: true, .. }) && is_dot_star(node)
}

fn is_digit(node: &AstNode) -> bool {
    *node == AstNode::ShorthandClass(ShorthandKind::Digit)
}

fn is_digit_plus(node: &AstNode) -> bool {
    matches!(node, AstNode::Quantifier { node, min: 1, max: None, .. } if is_digit(node))
}

fn contains_unbounded(node: &AstNode) -> bool {
    let mut found = false;
    node.walk(&mut |n| found |= matches!(n, AstNode::Quantifier { max: None, .. }));
    found
}

/// First and last top-level items of the pattern.
fn edges(root: &AstNode) -> (Option<&AstNode>, Option<&AstNode>) {
    match root {
        AstNode::Concat(nodes) => (nodes.first(), nodes.last()),
        AstNode::Empty => (None, None),
        other => (Some(other), Some(other)),
    }
}

fn has_line_anchor(root: &AstNode) -> bool {
    let mut found = false;
    root.walk(&mut |node| {
        found |= matches!(node, AstNode::Anchor(AnchorKind::Start | AnchorKind::End));
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_anchored() {
        let analysis = analyze(r"^\d{4}$");
        assert!(analysis.valid);
        assert!(analysis.features.anchors);
        assert_eq!(analysis.complexity, Complexity::Medium);
        assert!(analysis.issues.is_empty());
        assert!(analysis.tips.is_empty());
    }

    #[test]
    fn test_dot_star_findings() {
        let analysis = analyze("(.*)foo.*");
        assert!(analysis.issues.contains(&Issue::DotStar));
        assert!(analysis.issues.contains(&Issue::GreedyCapture));
        assert!(analysis.tips.contains(&Tip::TrailingDotStar));
        assert!(analysis.tips.contains(&Tip::NoAnchors));
        assert!(!analysis.tips.contains(&Tip::LeadingDotStar));
        assert!(analyze(".*x").tips.contains(&Tip::LeadingDotStar));
        assert!(!analyze("(.*?)").issues.contains(&Issue::GreedyCapture));
    }

    #[test]
    fn test_nested_quantifier() {
        assert!(analyze("(a+)+b").issues.contains(&Issue::NestedUnboundedQuantifier));
        assert!(!analyze("(ab)+").issues.contains(&Issue::NestedUnboundedQuantifier));
    }

    #[test]
    fn test_tips() {
        assert!(analyze("^(a|b|c)$").tips.contains(&Tip::SingleCharAlternation));
        assert!(analyze(r"^\d+\d+$").tips.contains(&Tip::AdjacentDigitRuns));
        assert!(analyze(r"^\d\d\d\d$").tips.contains(&Tip::RepeatedDigits));
        assert!(!analyze(r"^\d\d\d$").tips.contains(&Tip::RepeatedDigits));
    }

    #[test]
    fn test_complexity_levels() {
        assert_eq!(analyze("abc").complexity, Complexity::Simple);
        assert_eq!(analyze(r"^(\w+)@(\w+)|[a-z]+(?=x)$").complexity, Complexity::Complex);
    }

    #[test]
    fn test_invalid_pattern() {
        let analysis = analyze("[abc");
        assert!(!analysis.valid);
        assert!(analysis.error.is_some());
        assert_eq!(analysis.features, Features::default());
    }

    #[test]
    fn test_sample_inputs() {
        assert!(sample_inputs(r"^\d+@x$").contains(&"test@example.com"));
        assert!(sample_inputs("abc").is_empty());
    }
}
