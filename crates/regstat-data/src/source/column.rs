//! Spreadsheet column references.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A zero-based column position, written as a spreadsheet letter label.
///
/// Configuration accepts either the letter label (`"A"`, `"H"`, `"AB"`) or a
/// zero-based integer index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnRef(usize);

impl ColumnRef {
    /// Largest accepted index, column `ZZZ`.
    pub const MAX_INDEX: usize = 18_277;

    /// Column at a zero-based index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Zero-based index of the column.
    pub const fn index(&self) -> usize {
        self.0
    }

    /// Spreadsheet letter label of the column (`0` is `A`, `26` is `AA`).
    pub fn label(&self) -> String {
        let mut n = self.0;
        let mut letters = Vec::new();
        loop {
            letters.push(char::from(b'A' + (n % 26) as u8));
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        letters.iter().rev().collect()
    }

    fn bounded(index: usize) -> Result<Self, ConfigError> {
        if index > Self::MAX_INDEX {
            return Err(ConfigError::InvalidColumn(index.to_string()));
        }
        Ok(Self(index))
    }
}

impl FromStr for ColumnRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidColumn(s.to_string()))
                .and_then(Self::bounded);
        }
        if s.is_empty() || s.len() > 3 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidColumn(s.to_string()));
        }

        let n = s
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
        Ok(Self(n - 1))
    }
}

impl<'de> Deserialize<'de> for ColumnRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Spec {
            Index(usize),
            Label(String),
        }

        match Spec::deserialize(deserializer)? {
            Spec::Index(index) => Self::bounded(index).map_err(serde::de::Error::custom),
            Spec::Label(label) => label.parse().map_err(serde::de::Error::custom),
        }
    }
}

impl Serialize for ColumnRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
