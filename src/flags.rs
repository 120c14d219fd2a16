use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::EngineError;

/// Pattern flags, written as the letters `g`, `i`, `m` and `s`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Flags {
    /// `i`: letters match regardless of case.
    pub case_insensitive: bool,
    /// `m`: `^` and `$` also match at line boundaries.
    pub multiline: bool,
    /// `s`: `.` also matches `\n`.
    pub dot_all: bool,
    /// `g`: report every match rather than the first one.
    pub global: bool,
}

impl Flags {
    pub fn global() -> Self {
        Flags {
            global: true,
            ..Flags::default()
        }
    }

    pub fn with_case_insensitive(mut self, on: bool) -> Self {
        self.case_insensitive = on;
        self
    }

    pub fn with_multiline(mut self, on: bool) -> Self {
        self.multiline = on;
        self
    }

    pub fn with_dot_all(mut self, on: bool) -> Self {
        self.dot_all = on;
        self
    }

    pub fn with_global(mut self, on: bool) -> Self {
        self.global = on;
        self
    }
}

impl FromStr for Flags {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = Flags::default();
        for ch in s.chars() {
            match ch {
                'g' => flags.global = true,
                'i' => flags.case_insensitive = true,
                'm' => flags.multiline = true,
                's' => flags.dot_all = true,
                other => return Err(EngineError::InvalidFlag(other)),
            }
        }
        Ok(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, letter) in [
            (self.global, 'g'),
            (self.case_insensitive, 'i'),
            (self.multiline, 'm'),
            (self.dot_all, 's'),
        ] {
            if on {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letters() {
        let flags: Flags = "gim".parse().unwrap();
        assert!(flags.global && flags.case_insensitive && flags.multiline);
        assert!(!flags.dot_all);
        assert_eq!(flags.to_string(), "gim");
    }

    #[test]
    fn test_reject_unknown_letter() {
        assert_eq!("gx".parse::<Flags>(), Err(EngineError::InvalidFlag('x')));
    }
}
