//! # Table Engine
//!
//! An in-memory relational storage engine for string-valued tables.
//!
//! ## Core idea
//! Every column gets a secondary index (a B+Tree or an LSM index, chosen per
//! engine) and a bloom filter. A WHERE clause of up to two predicates is
//! planned per predicate (prune with the bloom filter, look up the index, or
//! fall back to scanning), the candidate row-id sets are intersected or
//! unioned, and the result is memoized in a TTL-bounded LRU cache that every
//! write invalidates.

pub mod bloom;
pub mod btree;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod lsm;
pub mod query;
pub mod statement;
pub mod table;
pub mod types;

// Public re-exports for the top-level API
pub use config::{EngineConfig, IndexKind};
pub use engine::{Engine, Output, ResultSet};
pub use error::{Error, Result};
pub use query::{Connective, Predicate};
pub use statement::{Create, Delete, Insert, Select, Statement, Update};
pub use types::{Operator, RowId};
