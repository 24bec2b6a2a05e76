//! WHERE-clause evaluation: predicates, access-path planning and cache keys.

pub mod fingerprint;
pub mod planner;
pub mod predicate;

pub use fingerprint::fingerprint;
pub use planner::{Access, PlannedPredicate, QueryPlan, QueryPlanner};
pub use predicate::{Connective, Predicate};
