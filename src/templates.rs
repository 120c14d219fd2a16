//! Pattern templates: small option records turned into pattern strings.
//!
//! Each template renders to a fixed pattern family. [`generate`] renders and
//! then validates the result through an [`Engine`], so a caller never gets
//! back a pattern that would fail to compile.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::builder::escape;
use crate::engine::Engine;
use crate::error::ParseError;
use crate::flags::Flags;

const EMAIL_LOCAL: &str = "[a-zA-Z0-9._%+-]+";
const EMAIL_DOMAIN: &str = r"[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const URL_HOST: &str = r"[-a-zA-Z0-9@:%._\+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}";
const URL_PATH: &str = r"\b([-a-zA-Z0-9()@:%_\+.~#?&//=]*)";
const IPV4_BODY: &str =
    r"(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";
const IPV6_BODY: &str = "([0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown {kind} '{value}'")]
    UnknownOption { kind: &'static str, value: String },
    #[error("template produced an invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: ParseError,
    },
}

fn unknown(kind: &'static str, value: &str) -> TemplateError {
    TemplateError::UnknownOption {
        kind,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Country {
    Cn,
    Us,
    Other,
}

impl FromStr for Country {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cn" | "china" => Ok(Country::Cn),
            "us" | "usa" => Ok(Country::Us),
            "other" | "uk" => Ok(Country::Other),
            _ => Err(unknown("country", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Protocol {
    Http,
    Https,
    Any,
}

impl FromStr for Protocol {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            "any" | "both" => Ok(Protocol::Any),
            _ => Err(unknown("protocol", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IpVersion {
    V4,
    V6,
    Both,
}

impl FromStr for IpVersion {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4" | "ipv4" => Ok(IpVersion::V4),
            "v6" | "ipv6" => Ok(IpVersion::V6),
            "both" => Ok(IpVersion::Both),
            _ => Err(unknown("IP version", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateFormat {
    YyyyMmDd,
    MmDdYyyy,
    DdMmYyyy,
    /// Year first, `-` or `/` as separator; ignores the configured separator.
    Flexible,
}

impl FromStr for DateFormat {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "YYYY-MM-DD" | "YYYYMMDD" => Ok(DateFormat::YyyyMmDd),
            "MM/DD/YYYY" | "MMDDYYYY" => Ok(DateFormat::MmDdYyyy),
            "DD/MM/YYYY" | "DDMMYYYY" => Ok(DateFormat::DdMmYyyy),
            "FLEXIBLE" => Ok(DateFormat::Flexible),
            _ => Err(unknown("date format", s)),
        }
    }
}

/// A template together with its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Template {
    Email {
        allow_subdomains: bool,
    },
    Phone {
        country: Country,
        allow_spaces: bool,
    },
    IdCard {
        allow_x: bool,
        strict_length: bool,
    },
    Url {
        protocol: Protocol,
        allow_subdomains: bool,
    },
    Ip {
        version: IpVersion,
    },
    Date {
        format: DateFormat,
        separator: String,
    },
    Number {
        allow_negative: bool,
        allow_decimals: bool,
        min_length: u32,
        max_length: u32,
    },
    Custom {
        pattern: String,
    },
}

impl Template {
    /// Every template kind with its default options, in display order.
    pub fn defaults() -> Vec<Template> {
        vec![
            Template::Email {
                allow_subdomains: true,
            },
            Template::Phone {
                country: Country::Cn,
                allow_spaces: false,
            },
            Template::IdCard {
                allow_x: true,
                strict_length: true,
            },
            Template::Url {
                protocol: Protocol::Any,
                allow_subdomains: true,
            },
            Template::Ip { version: IpVersion::V4 },
            Template::Date {
                format: DateFormat::YyyyMmDd,
                separator: "-".to_string(),
            },
            Template::Number {
                allow_negative: false,
                allow_decimals: true,
                min_length: 1,
                max_length: 10,
            },
            Template::Custom {
                pattern: String::new(),
            },
        ]
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Template::Email { .. } => "email",
            Template::Phone { .. } => "phone",
            Template::IdCard { .. } => "id_card",
            Template::Url { .. } => "url",
            Template::Ip { .. } => "ip",
            Template::Date { .. } => "date",
            Template::Number { .. } => "number",
            Template::Custom { .. } => "custom",
        }
    }

    /// Render the pattern string without validating it.
    pub fn render(&self) -> String {
        match self {
            // Subdomains are already accepted by the domain part.
            Template::Email { .. } => format!("^{EMAIL_LOCAL}@{EMAIL_DOMAIN}$"),
            Template::Phone {
                country,
                allow_spaces,
            } => phone(*country, *allow_spaces).to_string(),
            Template::IdCard {
                allow_x,
                strict_length,
            } => {
                let last = if *allow_x { r"[\dXx]" } else { r"\d" };
                if *strict_length {
                    format!(r"^\d{{17}}{last}$")
                } else {
                    format!(r"^\d{{17,18}}{last}$")
                }
            }
            Template::Url {
                protocol,
                allow_subdomains,
            } => {
                let scheme = match protocol {
                    Protocol::Https => "https://",
                    Protocol::Http => "http://",
                    Protocol::Any => "https?://",
                };
                let www = if *allow_subdomains { r"(www\.)?" } else { "" };
                format!("^{scheme}{www}{URL_HOST}{URL_PATH}$")
            }
            Template::Ip { version } => match version {
                IpVersion::V4 => format!("^{IPV4_BODY}$"),
                IpVersion::V6 => format!("^{IPV6_BODY}$"),
                IpVersion::Both => format!("^(?:{IPV4_BODY}|{IPV6_BODY})$"),
            },
            Template::Date { format, separator } => {
                let sep = escape(separator);
                match format {
                    DateFormat::YyyyMmDd => format!(r"^\d{{4}}{sep}\d{{2}}{sep}\d{{2}}$"),
                    DateFormat::MmDdYyyy | DateFormat::DdMmYyyy => {
                        format!(r"^\d{{2}}{sep}\d{{2}}{sep}\d{{4}}$")
                    }
                    DateFormat::Flexible => r"^\d{4}[-/]\d{2}[-/]\d{2}$".to_string(),
                }
            }
            Template::Number {
                allow_negative,
                allow_decimals,
                min_length,
                max_length,
            } => {
                let min = (*min_length).max(1);
                let max = (*max_length).max(min);
                let mut pattern = String::from("^");
                if *allow_negative {
                    pattern.push_str("-?");
                }
                pattern.push_str(r"\d");
                if min == max {
                    pattern.push_str(&format!("{{{min}}}"));
                } else {
                    pattern.push_str(&format!("{{{min},{max}}}"));
                }
                if *allow_decimals {
                    pattern.push_str(r"(\.\d+)?");
                }
                pattern.push('$');
                pattern
            }
            Template::Custom { pattern } => pattern.clone(),
        }
    }
}

fn phone(country: Country, allow_spaces: bool) -> &'static str {
    match (country, allow_spaces) {
        (Country::Cn, true) => r"^1[3-9]\d{2}\s?\d{4}\s?\d{4}$",
        (Country::Cn, false) => r"^1[3-9]\d{9}$",
        (Country::Us, true) => r"^\(?\d{3}\)?[-\s]?\d{3}[-\s]?\d{4}$",
        (Country::Us, false) => r"^\(?\d{3}\)?\d{3}\d{4}$",
        (Country::Other, _) => r"^\d{10,15}$",
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Render `template` and check that the engine accepts the result.
pub fn generate(engine: &Engine, template: &Template) -> Result<String, TemplateError> {
    let pattern = template.render();
    let validation = engine.validate(&pattern, Flags::default());
    match validation.error {
        None => Ok(pattern),
        Some(source) => Err(TemplateError::InvalidPattern { pattern, source }),
    }
}
