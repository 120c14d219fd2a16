//! Catalogue of ready-made patterns, grouped by category.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("unknown category '{0}'")]
    UnknownCategory(String),
    #[error("unknown category group '{0}'")]
    UnknownGroup(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Email,
    Phone,
    IdCard,
    Url,
    Ip,
    Date,
    Time,
    Number,
    Text,
    Password,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Email,
        Category::Phone,
        Category::IdCard,
        Category::Url,
        Category::Ip,
        Category::Date,
        Category::Time,
        Category::Number,
        Category::Text,
        Category::Password,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Email => "email",
            Category::Phone => "phone",
            Category::IdCard => "id_card",
            Category::Url => "url",
            Category::Ip => "ip",
            Category::Date => "date",
            Category::Time => "time",
            Category::Number => "number",
            Category::Text => "text",
            Category::Password => "password",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.name() == wanted || (wanted == "idcard" && *c == Category::IdCard))
            .ok_or_else(|| LibraryError::UnknownCategory(s.to_string()))
    }
}

/// Coarser grouping of categories, as shown in the library sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryGroup {
    Contact,
    Identity,
    Network,
    Format,
    Text,
}

impl CategoryGroup {
    pub fn categories(self) -> &'static [Category] {
        match self {
            CategoryGroup::Contact => &[Category::Email, Category::Phone],
            CategoryGroup::Identity => &[Category::IdCard],
            CategoryGroup::Network => &[Category::Url, Category::Ip],
            CategoryGroup::Format => &[Category::Date, Category::Time, Category::Number],
            CategoryGroup::Text => &[Category::Text, Category::Password],
        }
    }
}

impl FromStr for CategoryGroup {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "contact" => Ok(CategoryGroup::Contact),
            "identity" => Ok(CategoryGroup::Identity),
            "network" => Ok(CategoryGroup::Network),
            "format" => Ok(CategoryGroup::Format),
            "text" => Ok(CategoryGroup::Text),
            _ => Err(LibraryError::UnknownGroup(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub category: Category,
    pub key: &'static str,
    pub pattern: &'static str,
    pub description: &'static str,
}

const fn preset(
    category: Category,
    key: &'static str,
    pattern: &'static str,
    description: &'static str,
) -> Preset {
    Preset {
        category,
        key,
        pattern,
        description,
    }
}

static PRESETS: &[Preset] = &[
    preset(
        Category::Email,
        "basic",
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
        "Basic email address",
    ),
    preset(
        Category::Email,
        "strict",
        r"^[a-zA-Z0-9]([a-zA-Z0-9._-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$",
        "Strict email address",
    ),
    preset(
        Category::Email,
        "international",
        r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$",
        "International email address",
    ),
    preset(Category::Phone, "china", r"^1[3-9]\d{9}$", "Mainland China mobile number"),
    preset(
        Category::Phone,
        "china_with_spaces",
        r"^1[3-9]\d{2}\s?\d{4}\s?\d{4}$",
        "Mobile number with optional spaces",
    ),
    preset(
        Category::Phone,
        "us",
        r"^\(?\d{3}\)?[-\s]?\d{3}[-\s]?\d{4}$",
        "US phone number",
    ),
    preset(
        Category::Phone,
        "international",
        r"^\+?[1-9]\d{1,14}$",
        "International phone number",
    ),
    preset(Category::IdCard, "china", r"^\d{17}[\dXx]$", "China resident ID number"),
    preset(
        Category::IdCard,
        "china_strict",
        r"^[1-9]\d{5}(18|19|20)\d{2}((0[1-9])|(1[0-2]))(([0-2][1-9])|10|20|30|31)\d{3}[\dXx]$",
        "China resident ID number with date checks",
    ),
    preset(
        Category::Url,
        "basic",
        r"^https?://[\w\-]+(\.[\w\-]+)+([\w\-\.,@?^=%&:/~\+#]*[\w\-\@?^=%&/~\+#])?$",
        "Basic URL",
    ),
    preset(
        Category::Url,
        "strict",
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_\+.~#?&//=]*)$",
        "Strict URL",
    ),
    preset(
        Category::Ip,
        "v4",
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
        "IPv4 address",
    ),
    preset(
        Category::Ip,
        "v6",
        "^([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}$",
        "IPv6 address",
    ),
    preset(
        Category::Ip,
        "both",
        r"^(?:(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)|([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4})$",
        "IPv4 or IPv6 address",
    ),
    preset(Category::Date, "yyyy_mm_dd", r"^\d{4}-\d{2}-\d{2}$", "YYYY-MM-DD date"),
    preset(Category::Date, "mm_dd_yyyy", r"^\d{2}/\d{2}/\d{4}$", "MM/DD/YYYY date"),
    preset(Category::Date, "dd_mm_yyyy", r"^\d{2}/\d{2}/\d{4}$", "DD/MM/YYYY date"),
    preset(
        Category::Date,
        "flexible",
        r"^\d{4}[-/]\d{2}[-/]\d{2}$",
        "Year-first date with - or / separators",
    ),
    preset(
        Category::Time,
        "hh_mm_ss",
        "^([01]?[0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]$",
        "HH:MM:SS time",
    ),
    preset(Category::Time, "hh_mm", "^([01]?[0-9]|2[0-3]):[0-5][0-9]$", "HH:MM time"),
    preset(Category::Number, "integer", r"^-?\d+$", "Integer"),
    preset(Category::Number, "positive", r"^\d+$", "Positive integer"),
    preset(Category::Number, "decimal", r"^-?\d+(\.\d+)?$", "Decimal number"),
    preset(Category::Number, "currency", r"^\$?\d+(\.\d{2})?$", "Currency amount"),
    preset(Category::Text, "chinese", r"[\u4e00-\u9fa5]", "Chinese characters"),
    preset(Category::Text, "alphanumeric", "^[a-zA-Z0-9]+$", "Letters and digits"),
    preset(
        Category::Text,
        "alphanumeric_with_spaces",
        r"^[a-zA-Z0-9\s]+$",
        "Letters, digits and spaces",
    ),
    preset(
        Category::Text,
        "no_special_chars",
        r"^[a-zA-Z0-9\u4e00-\u9fa5]+$",
        "No special characters",
    ),
    preset(Category::Password, "weak", "^.{6,}$", "Weak password, at least 6 characters"),
    preset(
        Category::Password,
        "medium",
        r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d).{8,}$",
        "Medium password: upper, lower and digit",
    ),
    preset(
        Category::Password,
        "strong",
        r"^(?=.*[a-z])(?=.*[A-Z])(?=.*\d)(?=.*[@$!%*?&]).{8,}$",
        "Strong password: upper, lower, digit and symbol",
    ),
];

pub fn presets() -> &'static [Preset] {
    PRESETS
}

pub fn by_category(category: Category) -> impl Iterator<Item = &'static Preset> {
    PRESETS.iter().filter(move |p| p.category == category)
}

pub fn by_group(group: CategoryGroup) -> impl Iterator<Item = &'static Preset> {
    PRESETS.iter().filter(move |p| group.categories().contains(&p.category))
}

pub fn get(category: Category, key: &str) -> Option<&'static Preset> {
    by_category(category).find(|p| p.key == key)
}

/// Presets whose pattern or description contains `query`, ignoring case.
pub fn search(query: &str) -> Vec<&'static Preset> {
    let query = query.to_lowercase();
    PRESETS
        .iter()
        .filter(|p| {
            p.pattern.to_lowercase().contains(&query) || p.description.to_lowercase().contains(&query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::flags::Flags;

    fn check(preset: &Preset, text: &str) -> bool {
        Engine::default()
            .compile_pattern(preset.pattern, Flags::default())
            .unwrap()
            .is_match(text)
            .unwrap()
    }

    #[test]
    fn test_every_category_has_presets() {
        for category in Category::ALL {
            assert!(by_category(category).count() > 0, "{category}");
        }
    }

    #[test]
    fn test_groups() {
        let keys: Vec<_> = by_group(CategoryGroup::Network).map(|p| p.category).collect();
        assert!(keys.iter().all(|c| matches!(c, Category::Url | Category::Ip)));
        assert_eq!(keys.len(), 5);
        assert!("nope".parse::<CategoryGroup>().is_err());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let hits = search("IPV4");
        assert_eq!(hits.len(), 2);
        assert!(search("zzzz").is_empty());
    }

    #[test]
    fn test_lookup_and_behaviour() {
        let strong = get(Category::Password, "strong").unwrap();
        assert!(check(strong, "Abcdef1!"));
        assert!(!check(strong, "abcdef1!"));
        let time = get(Category::Time, "hh_mm").unwrap();
        assert!(check(time, "23:59"));
        assert!(!check(time, "24:00"));
        let chinese = get("id-card".parse().unwrap(), "china_strict").unwrap();
        assert!(check(chinese, "11010519491231002X"));
        assert!(get(Category::Email, "missing").is_none());
    }

    #[test]
    fn test_ip_either_version_is_anchored_at_both_ends() {
        let both = get(Category::Ip, "both").unwrap();
        assert!(check(both, "192.168.1.1"));
        assert!(check(both, "2001:0db8:85a3:0000:0000:8a2e:0370:7334"));
        assert!(!check(both, "1.2.3.4garbage"));
        assert!(!check(both, "x2001:0db8:85a3:0000:0000:8a2e:0370:7334"));
    }
}
