//! The catalog trait consumed by the dump engine

use std::collections::HashMap;

use async_trait::async_trait;
use dbslice_core::{FkDescriptor, SqlValue};
use futures::stream::BoxStream;

/// One fetched row, keyed by column name.
pub type Row = HashMap<String, SqlValue>;

/// Stream of full rows, each in table column order.
pub type RowStream = BoxStream<'static, Result<Vec<SqlValue>, CatalogError>>;

/// Full-table scan handle: ordered column names plus the row stream.
pub struct TableScan {
    pub columns: Vec<String>,
    pub rows: RowStream,
}

/// Errors raised by a catalog. Every variant is fatal to the run.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("row decode failed: {0}")]
    Decode(String),

    #[error("column {column} has unsupported type {pg_type}")]
    UnsupportedColumnType { column: String, pg_type: String },

    #[error("no primary key found for {schema}.{table}")]
    NoPrimaryKey { schema: String, table: String },
}

/// Introspection and row access against one database.
///
/// `condition` arguments are a ready-made ` WHERE ...` suffix (possibly
/// empty) produced by the engine; the SQL text around it is this trait's
/// implementation detail.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Primary-key column of `schema.table`; errors when none is declared.
    async fn primary_key_column(&self, schema: &str, table: &str)
        -> Result<String, CatalogError>;

    /// Foreign-key descriptors for `schema.table`. With `include_incoming`
    /// the result also covers constraints on other tables that reference
    /// this one.
    async fn foreign_keys(
        &self,
        schema: &str,
        table: &str,
        include_incoming: bool,
    ) -> Result<Vec<FkDescriptor>, CatalogError>;

    /// Rows of `schema.table` matching `condition`, projected onto
    /// `columns`.
    async fn fetch_columns(
        &self,
        schema: &str,
        table: &str,
        condition: &str,
        columns: &[String],
    ) -> Result<Vec<Row>, CatalogError>;

    /// All columns of the rows matching `condition`, as a stream.
    async fn fetch_all_columns(
        &self,
        schema: &str,
        table: &str,
        condition: &str,
    ) -> Result<TableScan, CatalogError>;
}
