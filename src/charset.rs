//! Compiled character sets and the case folding applied to them.

use crate::ast::{ClassItem, ShorthandKind};

/// Ranges wider than this are only folded over their ASCII letters.
const FOLD_SPAN_LIMIT: u32 = 0x4000;

/// A character class after compilation: sorted, merged ranges plus any
/// shorthand classes that could not be expressed as ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<(char, char)>,
    shorthands: Vec<ShorthandKind>,
    negated: bool,
}

impl CharSet {
    /// Build a set from class items, folding case when asked.
    pub fn from_items(items: &[ClassItem], negated: bool, case_insensitive: bool) -> Self {
        let mut ranges = Vec::new();
        let mut shorthands = Vec::new();
        for item in items {
            match *item {
                ClassItem::Literal(ch) => ranges.push((ch, ch)),
                ClassItem::Range(lo, hi) => ranges.push((lo, hi)),
                ClassItem::Shorthand(ShorthandKind::Digit) => ranges.push(('0', '9')),
                ClassItem::Shorthand(ShorthandKind::Word) => {
                    ranges.extend([('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')])
                }
                ClassItem::Shorthand(kind) => shorthands.push(kind),
            }
        }
        if case_insensitive {
            let folded: Vec<(char, char)> = ranges.iter().flat_map(|&(lo, hi)| fold_range(lo, hi)).collect();
            ranges.extend(folded);
        }
        let mut set = CharSet {
            ranges,
            shorthands,
            negated,
        };
        set.normalize();
        set
    }

    /// A set holding exactly the given characters.
    pub fn from_chars(chars: &[char]) -> Self {
        let mut set = CharSet {
            ranges: chars.iter().map(|&c| (c, c)).collect(),
            shorthands: Vec::new(),
            negated: false,
        };
        set.normalize();
        set
    }

    pub fn matches(&self, ch: char) -> bool {
        let in_ranges = self
            .ranges
            .binary_search_by(|&(lo, hi)| {
                if hi < ch {
                    std::cmp::Ordering::Less
                } else if lo > ch {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        let matched = in_ranges || self.shorthands.iter().any(|kind| kind.matches(ch));
        matched != self.negated
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    /// Sort ranges and merge overlapping or adjacent ones.
    fn normalize(&mut self) {
        self.ranges.sort_unstable();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(self.ranges.len());
        for &(lo, hi) in &self.ranges {
            if let Some(last) = merged.last_mut() {
                if (lo as u32) <= (last.1 as u32).saturating_add(1) {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                    continue;
                }
            }
            merged.push((lo, hi));
        }
        self.ranges = merged;
        self.shorthands.dedup();
    }
}

/// The simple (single-character) lowercase mapping of `ch`.
pub fn fold(ch: char) -> char {
    let mut lower = ch.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => ch,
    }
}

/// `ch` together with its single-character case counterparts.
pub fn case_variants(ch: char) -> Vec<char> {
    let mut variants = vec![ch];
    for mapped in [single(ch.to_lowercase()), single(ch.to_uppercase())].into_iter().flatten() {
        if !variants.contains(&mapped) {
            variants.push(mapped);
        }
    }
    variants
}

fn single(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    match (mapping.next(), mapping.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Case counterparts of every character in `lo..=hi`, as ranges.
fn fold_range(lo: char, hi: char) -> Vec<(char, char)> {
    let span = (hi as u32).saturating_sub(lo as u32);
    let mut out = Vec::new();
    if span <= FOLD_SPAN_LIMIT {
        for ch in lo..=hi {
            for variant in case_variants(ch).into_iter().skip(1) {
                out.push((variant, variant));
            }
        }
        return out;
    }
    for (ascii_lo, ascii_hi, offset) in [('A', 'Z', 32i32), ('a', 'z', -32i32)] {
        let start = lo.max(ascii_lo);
        let end = hi.min(ascii_hi);
        if start <= end {
            let shift = |c: char| char::from_u32((c as i32 + offset) as u32).unwrap_or(c);
            out.push((shift(start), shift(end)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_merge() {
        let set = CharSet::from_items(
            &[
                ClassItem::Range('a', 'f'),
                ClassItem::Range('d', 'k'),
                ClassItem::Literal('l'),
            ],
            false,
            false,
        );
        assert_eq!(set.ranges(), &[('a', 'l')]);
        assert!(set.matches('h'));
        assert!(!set.matches('m'));
    }

    #[test]
    fn test_negated_with_shorthand() {
        let set = CharSet::from_items(&[ClassItem::Shorthand(ShorthandKind::Space)], true, false);
        assert!(!set.matches(' '));
        assert!(!set.matches('\u{a0}'));
        assert!(set.matches('x'));
    }

    #[test]
    fn test_case_insensitive_fold() {
        let set = CharSet::from_items(&[ClassItem::Range('a', 'c')], true, true);
        assert!(!set.matches('B'));
        assert!(!set.matches('b'));
        assert!(set.matches('D'));
        assert!(set.matches('é'));
    }

    #[test]
    fn test_wide_range_folds_ascii_part() {
        let set = CharSet::from_items(&[ClassItem::Range('\0', '\u{ffff}')], false, true);
        assert!(set.matches('A'));
        let set = CharSet::from_items(&[ClassItem::Range('a', '\u{9000}')], false, true);
        assert!(set.matches('Q'));
    }

    #[test]
    fn test_case_variants() {
        assert_eq!(case_variants('k'), vec!['k', 'K']);
        assert_eq!(case_variants('7'), vec!['7']);
        assert_eq!(fold('Σ'), 'σ');
    }
}
