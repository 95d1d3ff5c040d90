//! Locale-aware coercion of formatted numeric text.
//!
//! Statistical sheets store numbers either as native cells (exported with a
//! decimal point) or as text formatted for a locale, e.g. `1 234,5`. The
//! expected format is configured per source; nothing is auto-detected.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Whitespace characters accepted as thousands separators in every format.
const SPACE_SEPARATORS: [char; 3] = [' ', '\u{a0}', '\u{202f}'];

/// Why a piece of text could not be coerced to a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberError {
    /// Nothing but whitespace
    #[error("value is empty")]
    Empty,

    /// A character that cannot appear in a number of this format
    #[error("unexpected character {0:?}")]
    InvalidCharacter(char),

    /// More than one decimal separator
    #[error("more than one decimal separator {0:?}")]
    MultipleDecimalSeparators(char),

    /// Digit groups that do not follow the thousands pattern
    #[error("digit grouping {0:?} is not in groups of three")]
    MisplacedGrouping(String),

    /// No digits on one side of the decimal separator where some are required
    #[error("missing digits")]
    MissingDigits,
}

/// Decimal notation of a source's numeric cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// `1,234.5` or `1 234.5`
    #[default]
    Point,

    /// `1.234,5` or `1 234,5`
    Comma,
}

impl NumberFormat {
    /// Character separating the integer and fractional parts.
    pub const fn decimal_separator(&self) -> char {
        match self {
            Self::Point => '.',
            Self::Comma => ',',
        }
    }

    /// Punctuation used to group thousands, besides whitespace.
    pub const fn grouping_separator(&self) -> char {
        match self {
            Self::Point => ',',
            Self::Comma => '.',
        }
    }

    /// Parse formatted text into a canonical `f64`.
    ///
    /// Grouping separators are only accepted between groups of exactly three
    /// digits, so text written in the other locale fails instead of being
    /// read at the wrong magnitude.
    pub fn parse(&self, raw: &str) -> Result<f64, NumberError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(NumberError::Empty);
        }

        let (negative, body) = match text.chars().next() {
            Some(c @ ('-' | '\u{2212}')) => (true, &text[c.len_utf8()..]),
            Some('+') => (false, &text[1..]),
            _ => (false, text),
        };

        let decimal = self.decimal_separator();
        let grouping = self.grouping_separator();
        if let Some(c) = body
            .chars()
            .find(|&c| !c.is_ascii_digit() && c != decimal && c != grouping && !SPACE_SEPARATORS.contains(&c))
        {
            return Err(NumberError::InvalidCharacter(c));
        }

        let mut parts = body.split(decimal);
        let integer = parts.next().unwrap_or_default();
        let fraction = parts.next();
        if parts.next().is_some() {
            return Err(NumberError::MultipleDecimalSeparators(decimal));
        }

        let integer = ungroup(integer, grouping)?;
        let fraction = match fraction {
            Some(f) if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) => {
                return Err(NumberError::MissingDigits);
            }
            Some(f) => f,
            None => "",
        };
        if integer.is_empty() && fraction.is_empty() {
            return Err(NumberError::MissingDigits);
        }

        let mut canonical = String::with_capacity(integer.len() + fraction.len() + 3);
        if negative {
            canonical.push('-');
        }
        canonical.push_str(if integer.is_empty() { "0" } else { &integer });
        if !fraction.is_empty() {
            canonical.push('.');
            canonical.push_str(fraction);
        }

        canonical
            .parse::<f64>()
            .map_err(|_| NumberError::MissingDigits)
    }
}

/// Strip thousands separators from the integer part, validating group sizes.
fn ungroup(integer: &str, grouping: char) -> Result<String, NumberError> {
    let groups: Vec<&str> = integer
        .split(|c: char| c == grouping || SPACE_SEPARATORS.contains(&c))
        .collect();

    if groups.len() == 1 {
        return Ok(groups[0].to_string());
    }

    let (first, rest) = groups.split_first().ok_or(NumberError::MissingDigits)?;
    let valid = (1..=3).contains(&first.len()) && rest.iter().all(|g| g.len() == 3);
    if !valid {
        return Err(NumberError::MisplacedGrouping(integer.to_string()));
    }
    Ok(groups.concat())
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => f.write_str("point"),
            Self::Comma => f.write_str("comma"),
        }
    }
}

impl FromStr for NumberFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "comma" => Ok(Self::Comma),
            other => Err(ConfigError::UnknownNumberFormat(other.to_string())),
        }
    }
}

/// Whether a cell holds something shaped like a number in any format.
///
/// Statistical sheets mark missing data with placeholders such as `-`, `x`,
/// `.` or `#`; those are rejected. Whether the text actually parses is
/// decided later, against the source's configured format.
pub fn looks_numeric(raw: &str) -> bool {
    let text = raw.trim();
    let body = text
        .strip_prefix(['-', '+', '\u{2212}'])
        .unwrap_or(text);

    body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == ',' || SPACE_SEPARATORS.contains(&c))
}
