use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Operator;

/// Boolean connective joining a predicate to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl Connective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

impl FromStr for Connective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Connective::And),
            "OR" => Ok(Connective::Or),
            _ => Err(Error::InvalidConnective(s.to_string())),
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WHERE term: `column <op> value`, optionally joined to the next term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Predicate {
    pub column: String,
    pub op: Operator,
    pub value: String,
    /// How this predicate combines with the one after it.
    pub connective: Option<Connective>,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: Operator, value: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            op,
            value: value.into(),
            connective: None,
        }
    }

    /// Build from the textual pieces a statement parser produces.
    pub fn parse(column: &str, op: &str, value: &str) -> Result<Self> {
        Ok(Self::new(column, op.parse()?, value))
    }

    /// Join this predicate to the next with `connective`.
    pub fn then(mut self, connective: Connective) -> Self {
        self.connective = Some(connective);
        self
    }

    /// Test a single column value against this predicate.
    pub fn matches(&self, value: &str) -> bool {
        self.op.evaluate(value, &self.value)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op, self.value)?;
        if let Some(c) = self.connective {
            write!(f, " {c}")?;
        }
        Ok(())
    }
}
