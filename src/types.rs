use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Stable identifier of a row inside its table's row arena.
///
/// Indexes store row ids, never rows, so flipping a row's deleted flag is
/// visible through every index at once.
pub type RowId = usize;

/// Comparison operator of a WHERE predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }

    /// `=` is served by point lookup, everything else by range lookup or scan.
    pub fn is_equality(&self) -> bool {
        matches!(self, Operator::Eq)
    }

    /// Does `lhs <op> rhs` hold?
    ///
    /// `=` and `!=` compare text exactly, like an index key lookup. The
    /// ordering operators use [`compare_values`], so `"25"` and `"25.0"`
    /// sit on the same side of every bound.
    pub fn evaluate(&self, lhs: &str, rhs: &str) -> bool {
        match self {
            Operator::Eq => lhs == rhs,
            Operator::Ne => lhs != rhs,
            _ => self.accepts(compare_values(lhs, rhs)),
        }
    }

    /// Does an ordering of `lhs` relative to `rhs` satisfy this operator?
    pub fn accepts(&self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Lt => ord == Ordering::Less,
            Operator::Ge => ord != Ordering::Less,
            Operator::Le => ord != Ordering::Greater,
        }
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            other => Err(Error::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a value as a number if it is one.
///
/// `"inf"` and `"NaN"` parse as `f64` but are treated as text so the
/// ordering stays total.
pub fn parse_numeric(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Compare two string-encoded values the way range predicates do.
///
/// Ordering:
///   numeric < non-numeric
///   numeric vs numeric      → by number only ("25" == "25.0")
///   non-numeric vs non-num  → lexicographic (byte order)
///
/// Every range lookup and every row-level predicate goes through this
/// ordering, otherwise index answers drift from scan answers.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    compare_by_value(a, parse_numeric(a), b, parse_numeric(b))
}

fn compare_by_value(a: &str, an: Option<f64>, b: &str, bn: Option<f64>) -> Ordering {
    match (an, bn) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// An index key: the raw column value plus its cached numeric parse.
///
/// Parsing once at construction keeps comparisons cheap inside node
/// searches and map lookups.
///
/// `Ord` is the storage order: [`compare_values`] with ties between
/// numerically equal numbers broken by text, so `"25"`, `"025"` and
/// `"25.0"` are distinct keys stored next to each other. Range bounds use
/// [`SortKey::cmp_value`], which sees that whole run as one value.
#[derive(Debug, Clone)]
pub struct SortKey {
    text: String,
    numeric: Option<f64>,
}

impl SortKey {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let numeric = parse_numeric(&text);
        SortKey { text, numeric }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric.is_some()
    }

    /// Compare by value only, as [`compare_values`] does.
    ///
    /// Every key equal to `other` here forms one contiguous run in storage
    /// order, and the storage order refines this one.
    pub fn cmp_value(&self, other: &SortKey) -> Ordering {
        compare_by_value(&self.text, self.numeric, &other.text, other.numeric)
    }
}

impl From<&str> for SortKey {
    fn from(s: &str) -> Self {
        SortKey::new(s)
    }
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        SortKey::new(s)
    }
}

impl PartialEq for SortKey {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for SortKey {}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_value(other).then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
