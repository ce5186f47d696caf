//! Mock catalog for tests and demos
//!
//! Serves predefined tables, rows and foreign-key relationships without a
//! server. Declaring a foreign key once registers the outgoing descriptor
//! on the referencing table and the incoming one on the referenced table,
//! matching what the live introspection queries report.
//!
//! The mock understands the `IN`-list conditions the engine generates
//! (`... WHERE col in (a, b) OR other in (c)`); it is not a SQL parser.

use std::collections::HashMap;

use async_trait::async_trait;
use dbslice_core::{Direction, FkDescriptor, SqlValue};
use futures::StreamExt;

use crate::catalog::{Catalog, CatalogError, Row, TableScan};

/// An in-memory table definition.
#[derive(Debug, Clone)]
pub struct MockTable {
    name: String,
    primary_key: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl MockTable {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        assert_eq!(
            values.len(),
            self.columns.len(),
            "row width must match declared columns"
        );
        self.rows.push(values);
        self
    }
}

/// In-memory catalog implementation.
pub struct MockCatalog {
    schema: String,
    tables: HashMap<String, MockTable>,
    fks: HashMap<String, Vec<FkDescriptor>>,
}

impl MockCatalog {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            tables: HashMap::new(),
            fks: HashMap::new(),
        }
    }

    pub fn table(mut self, table: MockTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Declare `table.column -> foreign_table.foreign_column`. Registers
    /// both directions the way the live FK introspection reports them.
    pub fn foreign_key(
        mut self,
        table: &str,
        column: &str,
        foreign_table: &str,
        foreign_column: &str,
    ) -> Self {
        self.fks
            .entry(table.to_string())
            .or_default()
            .push(FkDescriptor {
                column_name: column.to_string(),
                foreign_table_schema: self.schema.clone(),
                foreign_table_name: foreign_table.to_string(),
                foreign_column_name: foreign_column.to_string(),
                direction: Direction::Outgoing,
            });
        self.fks
            .entry(foreign_table.to_string())
            .or_default()
            .push(FkDescriptor {
                column_name: foreign_column.to_string(),
                foreign_table_schema: self.schema.clone(),
                foreign_table_name: table.to_string(),
                foreign_column_name: column.to_string(),
                direction: Direction::Incoming,
            });
        self
    }

    fn table_ref(&self, table: &str) -> Result<&MockTable, CatalogError> {
        self.tables
            .get(table)
            .ok_or_else(|| CatalogError::Query(format!("relation {table} does not exist")))
    }

    fn matching_rows<'a>(
        &self,
        table: &'a MockTable,
        condition: &str,
    ) -> Result<Vec<&'a Vec<SqlValue>>, CatalogError> {
        let mut matched = Vec::new();
        for row in &table.rows {
            if condition_matches(&table.columns, row, condition)? {
                matched.push(row);
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn primary_key_column(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<String, CatalogError> {
        let found = self.table_ref(table)?;
        if found.primary_key.is_empty() {
            return Err(CatalogError::NoPrimaryKey {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }
        Ok(found.primary_key.clone())
    }

    async fn foreign_keys(
        &self,
        _schema: &str,
        table: &str,
        include_incoming: bool,
    ) -> Result<Vec<FkDescriptor>, CatalogError> {
        let all = self.fks.get(table).cloned().unwrap_or_default();
        let (outgoing, incoming): (Vec<_>, Vec<_>) = all
            .into_iter()
            .partition(|fk| fk.direction == Direction::Outgoing);
        let mut result = outgoing;
        if include_incoming {
            result.extend(incoming);
        }
        Ok(result)
    }

    async fn fetch_columns(
        &self,
        _schema: &str,
        table: &str,
        condition: &str,
        columns: &[String],
    ) -> Result<Vec<Row>, CatalogError> {
        let table = self.table_ref(table)?;
        let mut result = Vec::new();
        for row in self.matching_rows(table, condition)? {
            let mut map = Row::new();
            for column in columns {
                let idx = column_index(&table.columns, column)?;
                map.insert(column.clone(), row[idx].clone());
            }
            result.push(map);
        }
        Ok(result)
    }

    async fn fetch_all_columns(
        &self,
        _schema: &str,
        table: &str,
        condition: &str,
    ) -> Result<TableScan, CatalogError> {
        let table = self.table_ref(table)?;
        let rows: Vec<Vec<SqlValue>> = self
            .matching_rows(table, condition)?
            .into_iter()
            .cloned()
            .collect();
        Ok(TableScan {
            columns: table.columns.clone(),
            rows: futures::stream::iter(rows.into_iter().map(Ok)).boxed(),
        })
    }
}

fn column_index(columns: &[String], column: &str) -> Result<usize, CatalogError> {
    columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| CatalogError::Query(format!("column {column} does not exist")))
}

/// Evaluate an engine-generated condition against one row. An empty
/// condition matches everything.
fn condition_matches(
    columns: &[String],
    row: &[SqlValue],
    condition: &str,
) -> Result<bool, CatalogError> {
    let trimmed = condition.trim();
    if trimmed.is_empty() {
        return Ok(true);
    }
    let body = trimmed
        .strip_prefix("WHERE ")
        .or_else(|| trimmed.strip_prefix("where "))
        .ok_or_else(|| CatalogError::Query(format!("mock cannot parse condition: {condition}")))?;

    for disjunct in split_connector(body, "OR") {
        let mut all = true;
        for atom in split_connector(&disjunct, "AND") {
            if !atom_matches(columns, row, &atom)? {
                all = false;
                break;
            }
        }
        if all {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Split on ` OR ` / ` or ` (or the AND pair); values in the fixtures
/// never contain the connector words.
fn split_connector(s: &str, upper: &str) -> Vec<String> {
    let upper_sep = format!(" {upper} ");
    let lower_sep = format!(" {} ", upper.to_lowercase());
    let mut parts = Vec::new();
    let mut rest = s;
    loop {
        let next = [rest.find(&upper_sep), rest.find(&lower_sep)]
            .into_iter()
            .flatten()
            .min();
        match next {
            Some(pos) => {
                parts.push(rest[..pos].to_string());
                rest = &rest[pos + upper_sep.len()..];
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

/// Match one `column in (v1, v2, ...)` atom.
fn atom_matches(columns: &[String], row: &[SqlValue], atom: &str) -> Result<bool, CatalogError> {
    let atom = atom.trim();
    let (column, list) = atom
        .split_once(" in (")
        .or_else(|| atom.split_once(" IN ("))
        .ok_or_else(|| CatalogError::Query(format!("mock cannot parse atom: {atom}")))?;
    let list = list
        .strip_suffix(')')
        .ok_or_else(|| CatalogError::Query(format!("mock cannot parse atom: {atom}")))?;

    let idx = column_index(columns, column.trim())?;
    let Some(cell) = encode_literal(&row[idx]) else {
        return Ok(false);
    };
    Ok(list.split(',').map(str::trim).any(|item| item == cell))
}

/// Literal encoding used for comparisons; mirrors the resolver's key
/// encoding (integers bare, textual values single-quoted).
fn encode_literal(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Int(v) => Some(v.to_string()),
        SqlValue::Numeric(v) => Some(v.to_string()),
        SqlValue::Text(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        SqlValue::Bytes(b) => Some(format!(
            "'{}'",
            String::from_utf8_lossy(b).replace('\'', "''")
        )),
        SqlValue::Uuid(u) => Some(format!("'{u}'")),
        _ => None,
    }
}
