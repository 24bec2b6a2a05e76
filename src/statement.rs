//! Requests handed to the engine by a statement parser.
//!
//! Tokenizing and parsing SQL text happens elsewhere; these are the already
//! parsed shapes the engine executes.

use crate::query::Predicate;

/// `CREATE TABLE name (columns...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Create {
    pub table: String,
    pub columns: Vec<String>,
    /// Columns to index. `None` indexes every column.
    pub indexed: Option<Vec<String>>,
}

impl Create {
    pub fn new<S: Into<String>>(table: impl Into<String>, columns: impl IntoIterator<Item = S>) -> Self {
        Create {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            indexed: None,
        }
    }

    /// Restrict indexing to the given columns.
    pub fn indexed<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.indexed = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// `INSERT INTO table VALUES (values...)`, positional in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<String>,
}

impl Insert {
    pub fn new<S: Into<String>>(table: impl Into<String>, values: impl IntoIterator<Item = S>) -> Self {
        Insert {
            table: table.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// `SELECT * FROM table [WHERE predicates]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: String,
    pub predicates: Vec<Predicate>,
}

impl Select {
    pub fn new(table: impl Into<String>, predicates: Vec<Predicate>) -> Self {
        Select {
            table: table.into(),
            predicates,
        }
    }

    /// `SELECT * FROM table` with no WHERE clause.
    pub fn all(table: impl Into<String>) -> Self {
        Self::new(table, Vec::new())
    }
}

/// `UPDATE table SET column = value [WHERE predicates]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub table: String,
    pub column: String,
    pub value: String,
    pub predicates: Vec<Predicate>,
}

impl Update {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
        predicates: Vec<Predicate>,
    ) -> Self {
        Update {
            table: table.into(),
            column: column.into(),
            value: value.into(),
            predicates,
        }
    }
}

/// `DELETE FROM table [WHERE predicates]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: String,
    pub predicates: Vec<Predicate>,
}

impl Delete {
    pub fn new(table: impl Into<String>, predicates: Vec<Predicate>) -> Self {
        Delete {
            table: table.into(),
            predicates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Create(Create),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
}

impl From<Create> for Statement {
    fn from(s: Create) -> Self {
        Statement::Create(s)
    }
}

impl From<Insert> for Statement {
    fn from(s: Insert) -> Self {
        Statement::Insert(s)
    }
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<Update> for Statement {
    fn from(s: Update) -> Self {
        Statement::Update(s)
    }
}

impl From<Delete> for Statement {
    fn from(s: Delete) -> Self {
        Statement::Delete(s)
    }
}
