//! Target filter language
//!
//! Filters are predicates over a property dictionary written in the prefix
//! syntax used by service registries:
//!
//! ```text
//! (&(fipro.connectivity=online)(!(region=eu*))(service.ranking>=5))
//! ```
//!
//! Supported forms:
//!
//! | Form | Meaning |
//! |------|---------|
//! | `(k=v)` | equality, typed by the property value |
//! | `(k!=v)` | negated equality |
//! | `(k=*)` | presence |
//! | `(k=a*b*)` | wildcard match on strings |
//! | `(k>=v)`, `(k<=v)` | ordered comparison |
//! | `(k~=v)` | case and whitespace insensitive equality |
//! | `(&…)`, `(\|…)`, `(!…)` | composition |
//!
//! Filters are parsed once into a [`Filter`] tree and evaluated many times.

mod parser;

use crate::error::{Error, Result};
use crate::value_objects::{Properties, PropertyValue};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a simple filter item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Equal,
    /// `>=`
    GreaterEq,
    /// `<=`
    LessEq,
    /// `~=`
    Approx,
}

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// All operands match
    And(Vec<Filter>),
    /// At least one operand matches
    Or(Vec<Filter>),
    /// The operand does not match
    Not(Box<Filter>),
    /// The key is present
    Present(String),
    /// Typed comparison against a literal
    Compare {
        /// Property key
        key: String,
        /// Operator
        op: Comparison,
        /// Literal as written (escapes removed)
        value: String,
    },
    /// Wildcard match; `parts` are the literal segments between `*`
    Substring {
        /// Property key
        key: String,
        /// Literal segments
        parts: Vec<String>,
    },
}

impl Filter {
    /// Parse a filter string
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilterSyntax`] with the offending position when the
    /// string is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        parser::parse(input)
    }

    /// Equality filter `(key=value)` with the value escaped
    pub fn equals(key: &str, value: &str) -> Self {
        Self::Compare {
            key: key.to_string(),
            op: Comparison::Equal,
            value: value.to_string(),
        }
    }

    /// Evaluate against a property dictionary
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Self::And(operands) => operands.iter().all(|f| f.matches(properties)),
            Self::Or(operands) => operands.iter().any(|f| f.matches(properties)),
            Self::Not(operand) => !operand.matches(properties),
            Self::Present(key) => properties.contains_key(key),
            Self::Compare { key, op, value } => properties
                .get(key)
                .is_some_and(|actual| compare_value(actual, *op, value)),
            Self::Substring { key, parts } => properties
                .get(key)
                .is_some_and(|actual| substring_value(actual, parts)),
        }
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn compare_value(actual: &PropertyValue, op: Comparison, literal: &str) -> bool {
    match actual {
        PropertyValue::String(s) => compare_str(s, op, literal),
        PropertyValue::StringList(list) => list.iter().any(|s| compare_str(s, op, literal)),
        PropertyValue::Integer(i) => compare_integer(*i, op, literal),
        PropertyValue::IntegerList(list) => list.iter().any(|i| compare_integer(*i, op, literal)),
        PropertyValue::Float(x) => literal
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|lit| x.partial_cmp(&lit))
            .is_some_and(|ordering| ordering_matches(ordering, op)),
        PropertyValue::Boolean(b) => match literal.trim().to_ascii_lowercase().as_str() {
            "true" => matches!(op, Comparison::Equal | Comparison::Approx) && *b,
            "false" => matches!(op, Comparison::Equal | Comparison::Approx) && !*b,
            _ => false,
        },
    }
}

fn compare_str(actual: &str, op: Comparison, literal: &str) -> bool {
    match op {
        Comparison::Approx => normalize(actual) == normalize(literal),
        _ => ordering_matches(actual.cmp(literal), op),
    }
}

fn compare_integer(actual: i64, op: Comparison, literal: &str) -> bool {
    literal
        .trim()
        .parse::<i64>()
        .is_ok_and(|lit| ordering_matches(actual.cmp(&lit), op))
}

fn ordering_matches(ordering: Ordering, op: Comparison) -> bool {
    match op {
        Comparison::Equal | Comparison::Approx => ordering == Ordering::Equal,
        Comparison::GreaterEq => ordering != Ordering::Less,
        Comparison::LessEq => ordering != Ordering::Greater,
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn substring_value(actual: &PropertyValue, parts: &[String]) -> bool {
    match actual {
        PropertyValue::String(s) => wildcard_match(s, parts),
        PropertyValue::StringList(list) => list.iter().any(|s| wildcard_match(s, parts)),
        other => wildcard_match(&other.to_string(), parts),
    }
}

/// `parts` come from splitting the pattern on `*`, so the first part is an
/// anchored prefix and the last an anchored suffix.
fn wildcard_match(text: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some(mut remaining) = text.strip_prefix(first.as_str()) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last.as_str())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(operands) => {
                f.write_str("(&")?;
                for operand in operands {
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Self::Or(operands) => {
                f.write_str("(|")?;
                for operand in operands {
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
            Self::Not(operand) => write!(f, "(!{operand})"),
            Self::Present(key) => write!(f, "({key}=*)"),
            Self::Compare { key, op, value } => {
                let op = match op {
                    Comparison::Equal => "=",
                    Comparison::GreaterEq => ">=",
                    Comparison::LessEq => "<=",
                    Comparison::Approx => "~=",
                };
                write!(f, "({key}{op}{})", escape(value))
            }
            Self::Substring { key, parts } => {
                let rendered: Vec<String> = parts.iter().map(|p| escape(p)).collect();
                write!(f, "({key}={})", rendered.join("*"))
            }
        }
    }
}
