//! Recursive-descent parser for the prefix filter syntax

use super::{Comparison, Filter};
use crate::error::{Error, Result};

pub(super) fn parse(input: &str) -> Result<Filter> {
    let mut parser = Parser {
        source: input,
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.skip_whitespace();
    let filter = parser.parse_filter()?;
    parser.skip_whitespace();
    if parser.pos < parser.chars.len() {
        return Err(parser.error("unexpected trailing characters"));
    }
    Ok(filter)
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::filter_syntax(self.source, self.pos, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error(&format!("expected '{expected}'"))),
            None => Err(self.error(&format!("expected '{expected}' but input ended"))),
        }
    }

    fn parse_filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some('!') if self.peek_at(1) != Some('=') => {
                self.pos += 1;
                self.skip_whitespace();
                Filter::Not(Box::new(self.parse_filter()?))
            }
            Some(_) => self.parse_item()?,
            None => return Err(self.error("unterminated filter")),
        };
        self.skip_whitespace();
        self.expect(')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>> {
        let mut operands = Vec::new();
        self.skip_whitespace();
        while self.peek() == Some('(') {
            operands.push(self.parse_filter()?);
            self.skip_whitespace();
        }
        if operands.is_empty() {
            return Err(self.error("composite filter needs at least one operand"));
        }
        Ok(operands)
    }

    fn parse_item(&mut self) -> Result<Filter> {
        let key = self.parse_key()?;
        let operator = self.parse_operator()?;
        let (parts, raw_star_only) = self.parse_value()?;

        match operator {
            Operator::Equal | Operator::NotEqual => {
                let positive = if raw_star_only {
                    Filter::Present(key)
                } else if parts.len() == 1 {
                    Filter::Compare {
                        key,
                        op: Comparison::Equal,
                        value: parts.into_iter().next().unwrap_or_default(),
                    }
                } else {
                    Filter::Substring { key, parts }
                };
                if operator == Operator::NotEqual {
                    Ok(Filter::Not(Box::new(positive)))
                } else {
                    Ok(positive)
                }
            }
            Operator::GreaterEq | Operator::LessEq | Operator::Approx => {
                let op = match operator {
                    Operator::GreaterEq => Comparison::GreaterEq,
                    Operator::LessEq => Comparison::LessEq,
                    _ => Comparison::Approx,
                };
                Ok(Filter::Compare {
                    key,
                    op,
                    value: parts.join("*"),
                })
            }
        }
    }

    fn parse_key(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            let is_operator_start = match c {
                '=' => true,
                '<' | '>' | '~' | '!' => self.peek_at(1) == Some('='),
                _ => false,
            };
            if is_operator_start {
                break;
            }
            if c == '(' || c == ')' {
                return Err(self.error("unexpected parenthesis in attribute name"));
            }
            self.pos += 1;
        }
        let key: String = self.chars[start..self.pos].iter().collect();
        let key = key.trim();
        if key.is_empty() {
            return Err(self.error("missing attribute name"));
        }
        Ok(key.to_string())
    }

    fn parse_operator(&mut self) -> Result<Operator> {
        let operator = match (self.peek(), self.peek_at(1)) {
            (Some('='), _) => {
                self.pos += 1;
                return Ok(Operator::Equal);
            }
            (Some('!'), Some('=')) => Operator::NotEqual,
            (Some('>'), Some('=')) => Operator::GreaterEq,
            (Some('<'), Some('=')) => Operator::LessEq,
            (Some('~'), Some('=')) => Operator::Approx,
            _ => return Err(self.error("expected comparison operator")),
        };
        self.pos += 2;
        Ok(operator)
    }

    /// Reads the assertion value up to the closing parenthesis.
    ///
    /// Returns the value split on unescaped `*` and whether the raw value
    /// was exactly one unescaped `*` (presence test).
    fn parse_value(&mut self) -> Result<(Vec<String>, bool)> {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut raw_len = 0usize;
        let mut stars = 0usize;

        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c) => {
                            current.push(c);
                            self.pos += 1;
                            raw_len += 2;
                        }
                        None => return Err(self.error("dangling escape")),
                    }
                }
                Some('*') => {
                    parts.push(std::mem::take(&mut current));
                    self.pos += 1;
                    raw_len += 1;
                    stars += 1;
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                    raw_len += 1;
                }
            }
        }
        parts.push(current);
        Ok((parts, stars == 1 && raw_len == 1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    GreaterEq,
    LessEq,
    Approx,
}
