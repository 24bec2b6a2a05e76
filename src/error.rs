use thiserror::Error;

/// Unified error type for the table engine.
///
/// Only schema-level problems surface here. Index lookups that find nothing
/// return empty collections, and broken structural invariants panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The named table does not exist.
    #[error("Table not found: {0}")]
    TableNotFound(String),
    /// A table with this name already exists.
    #[error("Table already exists: {0}")]
    TableExists(String),
    /// The named column does not exist in the table.
    #[error("Column not found: {table}.{column}")]
    ColumnNotFound { table: String, column: String },
    /// Positional insert with the wrong number of values.
    #[error("Column count doesn't match value count: expected {expected}, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },
    /// A create request named the same column twice.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
    /// WHERE clauses combine at most two predicates.
    #[error("Too many predicates: {0} (at most 2 supported)")]
    TooManyPredicates(usize),
    /// Operator text that is not one of `=`, `!=`, `>`, `<`, `>=`, `<=`.
    #[error("Invalid operator: {0}")]
    InvalidOperator(String),
    /// Connective text that is not `AND` or `OR`.
    #[error("Invalid connective: {0}")]
    InvalidConnective(String),
    /// Construction-time configuration rejected by `EngineConfig::validate`.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
