use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::table::Table;
use crate::types::RowId;

use super::predicate::{Connective, Predicate};

/// How a single predicate gets its candidate rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Point lookup in the column index.
    Equal,
    /// Range lookup (or condition scan for LSM) in the column index.
    Range,
    /// No index on the column: test rows one by one.
    Scan,
    /// The column's bloom filter rules the value out: no rows.
    Pruned,
}

/// A predicate bound to its column position and access path.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPredicate {
    pub predicate: Predicate,
    pub column: usize,
    pub access: Access,
}

impl PlannedPredicate {
    fn matches(&self, table: &Table, id: RowId) -> bool {
        table
            .row(id)
            .and_then(|row| row.get(self.column))
            .is_some_and(|value| self.predicate.matches(value))
    }
}

/// The access path chosen for each predicate and how their results combine.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub steps: Vec<PlannedPredicate>,
    pub connective: Connective,
}

impl QueryPlan {
    /// True when the bloom filters alone prove no row can match.
    pub fn is_provably_empty(&self) -> bool {
        let pruned = |s: &PlannedPredicate| s.access == Access::Pruned;
        match self.connective {
            Connective::And => self.steps.iter().any(pruned),
            Connective::Or => !self.steps.is_empty() && self.steps.iter().all(pruned),
        }
    }
}

/// Turns WHERE predicates into row ids using per-column indexes.
///
/// ```text
///   predicates ──plan──► [Equal | Range | Scan | Pruned] per predicate
///                              │
///                  index lookups → sorted row-id sets
///                              │
///            AND: merge-intersect     OR: merge-union
///                              │
///         residual Scan predicates tested row by row
///                              │
///                    drop logically deleted rows
/// ```
///
/// At most two predicates are supported. Three or more would need an
/// associativity rule for mixed AND/OR, so they are rejected.
pub struct QueryPlanner;

impl QueryPlanner {
    pub const MAX_PREDICATES: usize = 2;

    /// Resolve columns and pick an access path for every predicate.
    pub fn plan(table: &Table, predicates: &[Predicate]) -> Result<QueryPlan> {
        if predicates.len() > Self::MAX_PREDICATES {
            return Err(Error::TooManyPredicates(predicates.len()));
        }

        let connective = predicates
            .first()
            .and_then(|p| p.connective)
            .unwrap_or_default();

        let mut steps = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let column = table.column_position(&predicate.column)?;
            let pruned = predicate.op.is_equality()
                && table
                    .filter(column)
                    .is_some_and(|f| !f.might_contain(&predicate.value));

            let access = if pruned {
                trace!(table = table.name(), predicate = %predicate, "bloom filter pruned predicate");
                Access::Pruned
            } else if table.index(column).is_none() {
                Access::Scan
            } else if predicate.op.is_equality() {
                Access::Equal
            } else {
                Access::Range
            };

            steps.push(PlannedPredicate {
                predicate: predicate.clone(),
                column,
                access,
            });
        }

        Ok(QueryPlan { steps, connective })
    }

    /// Run a plan against the table. Row ids come back in insertion order.
    pub fn execute(table: &Table, plan: &QueryPlan) -> Vec<RowId> {
        if plan.steps.is_empty() {
            return table.live_row_ids();
        }
        if plan.is_provably_empty() {
            debug!(table = table.name(), "query short-circuited by bloom filter");
            return Vec::new();
        }

        let resolved: Vec<Option<Vec<RowId>>> = plan
            .steps
            .iter()
            .map(|step| Self::resolve(table, step))
            .collect();

        let mut ids = match (plan.steps.as_slice(), resolved.as_slice()) {
            ([step], [set]) => match set {
                Some(ids) => ids.clone(),
                None => Self::scan(table, table.live_row_ids(), &[step]),
            },
            ([first, second], [a, b]) => match plan.connective {
                Connective::And => match (a, b) {
                    (Some(a), Some(b)) => intersect_sorted(a, b),
                    (Some(a), None) => Self::scan(table, a.clone(), &[second]),
                    (None, Some(b)) => Self::scan(table, b.clone(), &[first]),
                    (None, None) => Self::scan(table, table.live_row_ids(), &[first, second]),
                },
                Connective::Or => {
                    let a = a.clone().unwrap_or_else(|| Self::scan(table, table.live_row_ids(), &[first]));
                    let b = b.clone().unwrap_or_else(|| Self::scan(table, table.live_row_ids(), &[second]));
                    union_sorted(&a, &b)
                }
            },
            _ => unreachable!("plan holds at most {} predicates", Self::MAX_PREDICATES),
        };

        ids.retain(|&id| table.is_live(id));
        ids
    }

    /// Plan and execute in one go.
    pub fn select(table: &Table, predicates: &[Predicate]) -> Result<Vec<RowId>> {
        let plan = Self::plan(table, predicates)?;
        Ok(Self::execute(table, &plan))
    }

    /// Index-backed candidates as a sorted, de-duplicated set, or `None` when
    /// the predicate has to be tested row by row.
    fn resolve(table: &Table, step: &PlannedPredicate) -> Option<Vec<RowId>> {
        let p = &step.predicate;
        let mut ids = match step.access {
            Access::Pruned => return Some(Vec::new()),
            Access::Scan => return None,
            Access::Equal => table.index(step.column)?.search_equal(&p.value),
            Access::Range => table.index(step.column)?.search_range(p.op, &p.value),
        };
        ids.sort_unstable();
        ids.dedup();
        Some(ids)
    }

    /// Keep the candidates that satisfy every residual predicate.
    fn scan(table: &Table, candidates: Vec<RowId>, residual: &[&PlannedPredicate]) -> Vec<RowId> {
        candidates
            .into_iter()
            .filter(|&id| residual.iter().all(|step| step.matches(table, id)))
            .collect()
    }
}

/// Merge-intersect two sorted, de-duplicated lists.
fn intersect_sorted(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    out
}

/// Merge-union two sorted, de-duplicated lists.
fn union_sorted(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
