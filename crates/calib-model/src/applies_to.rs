//! Applicability expressions: which runs a versioned artifact may be used for.
//!
//! Grammar: comma-separated conditionals, each an optional comparison
//! (`>=`, `<=`, `<`, `>`) followed by a decimal run number. A bare number
//! means equality. All conditionals of one expression must hold.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Equal,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
}

impl Comparison {
    /// Two-character symbols first so `>=` is never read as `>` plus `=`.
    const PREFIXES: [(&'static str, Comparison); 4] = [
        (">=", Comparison::GreaterEqual),
        ("<=", Comparison::LessEqual),
        ("<", Comparison::Less),
        (">", Comparison::Greater),
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::Equal => "",
            Comparison::Greater => ">",
            Comparison::Less => "<",
            Comparison::GreaterEqual => ">=",
            Comparison::LessEqual => "<=",
        }
    }

    /// Evaluate `lhs <self> rhs`.
    pub fn holds(&self, lhs: u64, rhs: u64) -> bool {
        match self {
            Comparison::Equal => lhs == rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::Less => lhs < rhs,
            Comparison::GreaterEqual => lhs >= rhs,
            Comparison::LessEqual => lhs <= rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conditional {
    pub comparison: Comparison,
    pub run_number: u64,
}

impl Conditional {
    pub fn new(comparison: Comparison, run_number: u64) -> Self {
        Self {
            comparison,
            run_number,
        }
    }

    pub fn exact(run_number: u64) -> Self {
        Self::new(Comparison::Equal, run_number)
    }

    pub fn matches(&self, run_number: u64) -> bool {
        self.comparison.holds(run_number, self.run_number)
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparison.symbol(), self.run_number)
    }
}

/// Parse an applicability expression into its conditionals.
pub fn parse_applies_to(text: &str) -> Result<Vec<Conditional>> {
    text.split(',')
        .map(|raw| parse_conditional(text, raw))
        .collect()
}

fn parse_conditional(input: &str, raw: &str) -> Result<Conditional> {
    let trimmed = raw.trim();
    let (comparison, rest) = Comparison::PREFIXES
        .iter()
        .find_map(|(prefix, comparison)| {
            trimmed
                .strip_prefix(*prefix)
                .map(|rest| (*comparison, rest))
        })
        .unwrap_or((Comparison::Equal, trimmed));
    let digits = rest.trim();
    // `u64::from_str` accepts a leading '+', run numbers never carry one.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed(input, raw));
    }
    let run_number = digits.parse().map_err(|_| malformed(input, raw))?;
    Ok(Conditional::new(comparison, run_number))
}

fn malformed(input: &str, raw: &str) -> ModelError {
    ModelError::MalformedApplicabilityExpression {
        field: "appliesTo",
        input: input.to_string(),
        conditional: raw.trim().to_string(),
    }
}

/// A parsed, non-empty applicability expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppliesTo(Vec<Conditional>);

impl AppliesTo {
    pub fn new(conditionals: Vec<Conditional>) -> Self {
        Self(conditionals)
    }

    pub fn conditionals(&self) -> &[Conditional] {
        &self.0
    }

    /// True when every conditional holds for `run_number`.
    pub fn matches(&self, run_number: u64) -> bool {
        self.0.iter().all(|c| c.matches(run_number))
    }
}

impl FromStr for AppliesTo {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        parse_applies_to(s).map(Self)
    }
}

impl fmt::Display for AppliesTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, conditional) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{conditional}")?;
        }
        Ok(())
    }
}

impl Serialize for AppliesTo {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AppliesTo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
