//! Dependency-graph resolver
//!
//! Breadth-first collection of every row transitively reachable from the
//! configured root tables across foreign-key edges. Each discovered table
//! gets one registry node whose per-column key sets grow monotonically; a
//! table is re-queued only when a visit added at least one new key, so
//! the walk terminates even on cyclic graphs.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use dbslice_catalog::{Catalog, Row};
use dbslice_core::{Direction, FkDescriptor, Registry, Settings, TableFilter};
use tracing::debug;

use crate::DumpError;

/// A queued fetch: refresh `name` using `filters`. Consumed once
/// processed; never part of the registry.
struct WorkItem {
    name: String,
    filters: Vec<TableFilter>,
}

/// BFS engine over the foreign-key graph.
pub struct Resolver<'a, C: Catalog> {
    catalog: &'a C,
    settings: &'a Settings,
    include_incoming: HashSet<&'a str>,
}

impl<'a, C: Catalog> Resolver<'a, C> {
    pub fn new(catalog: &'a C, settings: &'a Settings) -> Self {
        let include_incoming = settings
            .include_incoming_tables
            .iter()
            .map(String::as_str)
            .collect();
        Self {
            catalog,
            settings,
            include_incoming,
        }
    }

    /// Discover all reachable tables and their key sets. Any catalog
    /// failure aborts immediately; no partial registry is returned.
    pub async fn resolve(&self) -> Result<Registry, DumpError> {
        let mut registry = Registry::new();
        let mut queue = self.init_roots(&mut registry).await?;
        let mut fk_cache: HashMap<String, Vec<FkDescriptor>> = HashMap::new();

        while let Some(item) = queue.pop_front() {
            debug!(table = %item.name, "resolving");
            // FK descriptors are memoized per table name; a later visit
            // under a different direction policy reuses the first fetch.
            if !fk_cache.contains_key(&item.name) {
                let include_incoming = self.settings.direction == Direction::Incoming
                    || self.include_incoming.contains(item.name.as_str());
                let fetched = self
                    .catalog
                    .foreign_keys(&self.settings.schema_name, &item.name, include_incoming)
                    .await?;
                fk_cache.insert(item.name.clone(), fetched);
            }
            let fks = &fk_cache[&item.name];
            if fks.is_empty() {
                continue;
            }

            let fk_columns = distinct_columns(fks);
            let condition = filter_condition(&item.filters);
            let rows = self
                .catalog
                .fetch_columns(
                    &self.settings.schema_name,
                    &item.name,
                    &condition,
                    &fk_columns,
                )
                .await?;

            for fk in fks {
                let keys = key_set(&rows, &fk.column_name)?;
                if keys.is_empty() {
                    continue;
                }
                debug!(
                    table = %fk.foreign_table_name,
                    column = %fk.foreign_column_name,
                    count = keys.len(),
                    "collected keys"
                );

                let node = registry.get_or_insert(&fk.foreign_table_name);
                let touched = node.add_keys(&fk.foreign_column_name, keys.iter().cloned());

                if fk.direction == Direction::Outgoing {
                    registry.add_edge(&item.name, &fk.foreign_table_name);
                }

                if touched {
                    // Re-queue with the full accumulated set, not the
                    // delta; the downstream IN-query is idempotent.
                    queue.push_back(WorkItem {
                        name: fk.foreign_table_name.clone(),
                        filters: vec![TableFilter {
                            name: fk.foreign_column_name.clone(),
                            value: join_keys(&keys),
                        }],
                    });
                }
            }
        }
        Ok(registry)
    }

    /// Seed registry nodes and the work queue from the root specs, in
    /// caller order.
    async fn init_roots(&self, registry: &mut Registry) -> Result<VecDeque<WorkItem>, DumpError> {
        let mut queue = VecDeque::with_capacity(self.settings.tables.len());
        for spec in &self.settings.tables {
            let pk_column = self
                .catalog
                .primary_key_column(&self.settings.schema_name, &spec.name)
                .await?;
            let condition = filter_condition(&spec.filters);
            let rows = self
                .catalog
                .fetch_columns(
                    &self.settings.schema_name,
                    &spec.name,
                    &condition,
                    std::slice::from_ref(&pk_column),
                )
                .await?;
            let keys = key_set(&rows, &pk_column)?;
            debug!(table = %spec.name, column = %pk_column, count = keys.len(), "seeded root");

            registry.get_or_insert(&spec.name).add_keys(&pk_column, keys);
            queue.push_back(WorkItem {
                name: spec.name.clone(),
                filters: spec.filters.clone(),
            });
        }
        Ok(queue)
    }
}

/// Build the row-fetch condition for a work item or root spec. Filter
/// values are opaque literal fragments substituted verbatim.
fn filter_condition(filters: &[TableFilter]) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = filters
        .iter()
        .map(|f| format!("{} in ({})", f.name, f.value))
        .collect();
    format!(" where {}", clauses.join(" and "))
}

/// FK column names deduplicated in first-seen order.
fn distinct_columns(fks: &[FkDescriptor]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for fk in fks {
        if seen.insert(fk.column_name.as_str()) {
            columns.push(fk.column_name.clone());
        }
    }
    columns
}

/// Distinct non-null key literals observed in `column` across `rows`.
fn key_set(rows: &[Row], column: &str) -> Result<BTreeSet<String>, DumpError> {
    let mut keys = BTreeSet::new();
    for row in rows {
        match row.get(column) {
            None => {}
            Some(value) if value.is_null() => {}
            Some(value) => match key_literal(value) {
                Some(literal) => {
                    keys.insert(literal);
                }
                None => {
                    return Err(DumpError::UnsupportedKeyType {
                        column: column.to_string(),
                        type_name: value.type_name(),
                    })
                }
            },
        }
    }
    Ok(keys)
}

/// Encode one key value as a SQL literal: integers bare, textual values
/// single-quoted with embedded quotes doubled. Anything else is
/// unsupported as a key.
fn key_literal(value: &dbslice_core::SqlValue) -> Option<String> {
    use dbslice_core::SqlValue;

    match value {
        SqlValue::Int(v) => Some(v.to_string()),
        SqlValue::Text(s) => Some(quote_literal(s)),
        SqlValue::Bytes(b) => Some(quote_literal(&String::from_utf8_lossy(b))),
        SqlValue::Uuid(u) => Some(quote_literal(&u.to_string())),
        _ => None,
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().cloned().collect::<Vec<_>>().join(", ")
}
