use std::collections::HashMap;
use std::fmt;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cache::{CacheStats, ResultCache};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::query::{QueryPlanner, fingerprint};
use crate::statement::{Create, Delete, Insert, Select, Statement, Update};
use crate::table::Table;
use crate::types::RowId;

/// Rows returned by a SELECT, with a stable column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row number `row`.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let position = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(position).map(String::as_str)
    }

    /// Every value of `column`, in row order.
    pub fn column(&self, column: &str) -> Vec<&str> {
        (0..self.rows.len())
            .filter_map(|row| self.value(row, column))
            .collect()
    }
}

/// Tab-separated: one header line, then one line per row.
impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

/// Outcome of one executed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Created { table: String },
    Inserted { table: String, row: RowId },
    Rows(ResultSet),
    Updated { table: String, count: usize },
    Deleted { table: String, count: usize },
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Created { table } => write!(f, "Table {table} created"),
            Output::Inserted { table, .. } => write!(f, "Row inserted into {table}"),
            Output::Rows(rows) => write!(f, "{rows}"),
            Output::Updated { table, count } => {
                write!(f, "Table {table} updated. {count} rows affected.")
            }
            Output::Deleted { table, count } => {
                write!(f, "Rows deleted from {table}. {count} rows affected.")
            }
        }
    }
}

/// Table catalog plus the shared result cache.
///
/// Locking order is always catalog, then cache. Writers hold the catalog
/// write lock across the mutation *and* the cache invalidation, and readers
/// hold the catalog read lock until their result is cached, so a cached
/// result never predates a write that finished before it was stored.
pub struct Engine {
    config: EngineConfig,
    tables: RwLock<HashMap<String, Table>>,
    cache: Mutex<ResultCache>,
}

impl Engine {
    /// Create an engine after validating the configuration.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let cache = ResultCache::new(config.cache_capacity, config.cache_ttl);
        Engine {
            config,
            tables: RwLock::new(HashMap::new()),
            cache: Mutex::new(cache),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Dispatch a parsed statement.
    pub fn execute(&self, statement: impl Into<Statement>) -> Result<Output> {
        match statement.into() {
            Statement::Create(s) => {
                let table = s.table.clone();
                self.create(s)?;
                Ok(Output::Created { table })
            }
            Statement::Insert(s) => {
                let table = s.table.clone();
                let row = self.insert(s)?;
                Ok(Output::Inserted { table, row })
            }
            Statement::Select(s) => Ok(Output::Rows(self.select(s)?)),
            Statement::Update(s) => {
                let table = s.table.clone();
                let count = self.update(s)?;
                Ok(Output::Updated { table, count })
            }
            Statement::Delete(s) => {
                let table = s.table.clone();
                let count = self.delete(s)?;
                Ok(Output::Deleted { table, count })
            }
        }
    }

    pub fn create(&self, create: Create) -> Result<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(&create.table) {
            return Err(Error::TableExists(create.table));
        }

        let table = match &create.indexed {
            Some(indexed) => Table::with_indexes(&create.table, create.columns, indexed, &self.config)?,
            None => Table::new(&create.table, create.columns, &self.config)?,
        };
        info!(
            table = %create.table,
            columns = table.columns().len(),
            index = ?self.config.index_kind,
            "created table"
        );
        tables.insert(create.table, table);
        Ok(())
    }

    pub fn insert(&self, insert: Insert) -> Result<RowId> {
        let mut tables = self.tables.write();
        let table = Self::table_mut(&mut tables, &insert.table)?;
        let id = table.insert(insert.values)?;
        self.cache.lock().invalidate_all();
        Ok(id)
    }

    /// Bloom pruning → cache lookup → plan execution → cache store.
    pub fn select(&self, select: Select) -> Result<ResultSet> {
        let tables = self.tables.read();
        let table = Self::table(&tables, &select.table)?;

        let plan = QueryPlanner::plan(table, &select.predicates)?;
        let ids = if plan.is_provably_empty() {
            Vec::new()
        } else {
            let key = fingerprint(&select.table, &select.predicates);
            // The cache lock covers the lookup and the store, never execution.
            let cached = self.cache.lock().get(&key);
            match cached {
                Some(ids) => {
                    debug!(table = %select.table, rows = ids.len(), "result cache hit");
                    ids
                }
                None => {
                    let ids = QueryPlanner::execute(table, &plan);
                    self.cache.lock().put(key, &ids);
                    ids
                }
            }
        };

        let rows = ids
            .into_iter()
            .filter_map(|id| table.row(id))
            .map(|row| row.values().to_vec())
            .collect();
        Ok(ResultSet {
            columns: table.columns().to_vec(),
            rows,
        })
    }

    pub fn update(&self, update: Update) -> Result<usize> {
        let mut tables = self.tables.write();
        let table = Self::table_mut(&mut tables, &update.table)?;
        table.column_position(&update.column)?;

        let ids = QueryPlanner::select(table, &update.predicates)?;
        let count = table.update(&ids, &update.column, &update.value)?;
        self.cache.lock().invalidate_all();
        Ok(count)
    }

    pub fn delete(&self, delete: Delete) -> Result<usize> {
        let mut tables = self.tables.write();
        let table = Self::table_mut(&mut tables, &delete.table)?;

        let ids = QueryPlanner::select(table, &delete.predicates)?;
        let count = table.delete(&ids);
        self.cache.lock().invalidate_all();
        table.maybe_vacuum(self.config.vacuum_threshold);
        Ok(count)
    }

    /// Reclaim deleted rows of `table` now, regardless of the threshold.
    pub fn vacuum(&self, table: &str) -> Result<usize> {
        let mut tables = self.tables.write();
        Ok(Self::table_mut(&mut tables, table)?.vacuum())
    }

    pub fn table_exists(&self, table: &str) -> bool {
        self.tables.read().contains_key(table)
    }

    /// Table names, sorted.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn columns(&self, table: &str) -> Result<Vec<String>> {
        let tables = self.tables.read();
        Ok(Self::table(&tables, table)?.columns().to_vec())
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Number of live entries in the result cache.
    pub fn cached_queries(&self) -> usize {
        self.cache.lock().len()
    }

    fn table<'a>(tables: &'a HashMap<String, Table>, name: &str) -> Result<&'a Table> {
        tables
            .get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    fn table_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> Result<&'a mut Table> {
        tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::build(EngineConfig::default())
    }
}
