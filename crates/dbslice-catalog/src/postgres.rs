//! PostgreSQL catalog over tokio-postgres
//!
//! Introspection goes through `pg_constraint`/`pg_attribute` (foreign
//! keys) and `information_schema` (primary keys); row fetches are plain
//! `SELECT`s with the engine-supplied condition appended. Plain and TLS
//! connections are supported.

use async_trait::async_trait;
use dbslice_core::{Direction, FkDescriptor, SqlValue};
use futures::StreamExt;
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};

use crate::catalog::{Catalog, CatalogError, Row, TableScan};

const PK_COLUMN: &str = r#"
SELECT
    kcu.column_name
FROM
    information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
WHERE
    tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
"#;

const OUTGOING_FKS: &str = r#"
SELECT
    att.attname AS column_name,
    ref_nsp.nspname AS foreign_table_schema,
    ref_tbl.relname AS foreign_table_name,
    ref_att.attname AS foreign_column_name,
    'outgoing' AS direction
FROM pg_constraint con
JOIN pg_class tbl ON con.conrelid = tbl.oid
JOIN pg_namespace nsp ON tbl.relnamespace = nsp.oid AND nsp.nspname = $1
JOIN pg_attribute att ON att.attrelid = tbl.oid
                     AND att.attnum = ANY(con.conkey)
                     AND NOT att.attisdropped
JOIN pg_class ref_tbl ON con.confrelid = ref_tbl.oid
JOIN pg_namespace ref_nsp ON ref_tbl.relnamespace = ref_nsp.oid
JOIN pg_attribute ref_att ON ref_att.attrelid = ref_tbl.oid
                         AND ref_att.attnum = ANY(con.confkey)
                         AND NOT ref_att.attisdropped
WHERE con.contype = 'f'
  AND tbl.relname = $2
"#;

const ALL_FKS: &str = r#"
SELECT
    att.attname AS column_name,
    ref_nsp.nspname AS foreign_table_schema,
    ref_tbl.relname AS foreign_table_name,
    ref_att.attname AS foreign_column_name,
    'outgoing' AS direction
FROM pg_constraint con
JOIN pg_class tbl ON con.conrelid = tbl.oid
JOIN pg_namespace nsp ON tbl.relnamespace = nsp.oid AND nsp.nspname = $1
JOIN pg_attribute att ON att.attrelid = tbl.oid
                     AND att.attnum = ANY(con.conkey)
                     AND NOT att.attisdropped
JOIN pg_class ref_tbl ON con.confrelid = ref_tbl.oid
JOIN pg_namespace ref_nsp ON ref_tbl.relnamespace = ref_nsp.oid
JOIN pg_attribute ref_att ON ref_att.attrelid = ref_tbl.oid
                         AND ref_att.attnum = ANY(con.confkey)
                         AND NOT ref_att.attisdropped
WHERE con.contype = 'f'
  AND tbl.relname = $2

UNION ALL

SELECT
    ref_att.attname AS column_name,
    nsp.nspname AS foreign_table_schema,
    tbl.relname AS foreign_table_name,
    att.attname AS foreign_column_name,
    'incoming' AS direction
FROM pg_constraint con
JOIN pg_class ref_tbl ON con.confrelid = ref_tbl.oid
JOIN pg_namespace ref_nsp ON ref_tbl.relnamespace = ref_nsp.oid AND ref_nsp.nspname = $1
JOIN pg_attribute ref_att ON ref_att.attrelid = ref_tbl.oid
                         AND ref_att.attnum = ANY(con.confkey)
                         AND NOT ref_att.attisdropped
JOIN pg_class tbl ON con.conrelid = tbl.oid
JOIN pg_namespace nsp ON tbl.relnamespace = nsp.oid
JOIN pg_attribute att ON att.attrelid = tbl.oid
                     AND att.attnum = ANY(con.conkey)
                     AND NOT att.attisdropped
WHERE con.contype = 'f'
  AND ref_tbl.relname = $2
"#;

/// Catalog implementation backed by a live PostgreSQL connection.
pub struct PostgresCatalog {
    client: Client,
}

impl PostgresCatalog {
    /// Connect without TLS using a libpq keyword connection string
    /// (`host=... port=... user=... password=... dbname=...`).
    pub async fn connect(conn_str: &str) -> Result<Self, CatalogError> {
        let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
            .await
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });

        Ok(Self { client })
    }

    /// Connect with TLS. Use for servers that require `sslmode=require`.
    pub async fn connect_with_tls(conn_str: &str) -> Result<Self, CatalogError> {
        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| CatalogError::Connection(format!("TLS connector: {e}")))?;
        let tls = MakeTlsConnector::new(connector);

        let (client, connection) = tokio_postgres::connect(conn_str, tls)
            .await
            .map_err(|e| CatalogError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "postgres connection error");
            }
        });

        Ok(Self { client })
    }
}

#[async_trait]
impl Catalog for PostgresCatalog {
    async fn primary_key_column(
        &self,
        schema: &str,
        table: &str,
    ) -> Result<String, CatalogError> {
        tracing::debug!(schema, table, "fetching primary key column");
        let row = self
            .client
            .query_opt(PK_COLUMN, &[&schema, &table])
            .await
            .map_err(query_err)?;
        match row {
            Some(row) => row.try_get::<_, String>(0).map_err(decode_err),
            None => Err(CatalogError::NoPrimaryKey {
                schema: schema.to_string(),
                table: table.to_string(),
            }),
        }
    }

    async fn foreign_keys(
        &self,
        schema: &str,
        table: &str,
        include_incoming: bool,
    ) -> Result<Vec<FkDescriptor>, CatalogError> {
        let query = if include_incoming { ALL_FKS } else { OUTGOING_FKS };
        tracing::debug!(schema, table, include_incoming, "fetching foreign keys");
        let rows = self
            .client
            .query(query, &[&schema, &table])
            .await
            .map_err(query_err)?;

        let mut fks = Vec::with_capacity(rows.len());
        for row in rows {
            let direction: String = row.try_get(4).map_err(decode_err)?;
            fks.push(FkDescriptor {
                column_name: row.try_get(0).map_err(decode_err)?,
                foreign_table_schema: row.try_get(1).map_err(decode_err)?,
                foreign_table_name: row.try_get(2).map_err(decode_err)?,
                foreign_column_name: row.try_get(3).map_err(decode_err)?,
                direction: if direction == "incoming" {
                    Direction::Incoming
                } else {
                    Direction::Outgoing
                },
            });
        }
        Ok(fks)
    }

    async fn fetch_columns(
        &self,
        schema: &str,
        table: &str,
        condition: &str,
        columns: &[String],
    ) -> Result<Vec<Row>, CatalogError> {
        let query = build_select(&columns.join(", "), schema, table, condition);
        tracing::debug!(sql = %query, "fetching key columns");
        let rows = self.client.query(&query, &[]).await.map_err(query_err)?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let values = decode_row(&row)?;
            let map: Row = row
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .zip(values)
                .collect();
            result.push(map);
        }
        Ok(result)
    }

    async fn fetch_all_columns(
        &self,
        schema: &str,
        table: &str,
        condition: &str,
    ) -> Result<TableScan, CatalogError> {
        let query = build_select("*", schema, table, condition);
        tracing::debug!(sql = %query, "fetching rows");
        let statement = self.client.prepare(&query).await.map_err(query_err)?;
        let columns: Vec<String> = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        let stream = self
            .client
            .query_raw(&statement, params)
            .await
            .map_err(query_err)?;

        let rows = stream
            .map(|row| row.map_err(query_err).and_then(|row| decode_row(&row)))
            .boxed();

        Ok(TableScan { columns, rows })
    }
}

/// Fully qualified table reference; the schema prefix is optional.
fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

fn build_select(projection: &str, schema: &str, table: &str, condition: &str) -> String {
    format!(
        "SELECT {} FROM {}{}",
        projection,
        qualified_table(schema, table),
        condition
    )
}

fn query_err(e: tokio_postgres::Error) -> CatalogError {
    CatalogError::Query(e.to_string())
}

fn decode_err(e: tokio_postgres::Error) -> CatalogError {
    CatalogError::Decode(e.to_string())
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Vec<SqlValue>, CatalogError> {
    (0..row.len()).map(|idx| decode_value(row, idx)).collect()
}

/// Decode one cell into a `SqlValue`, dispatching on the column's
/// PostgreSQL type name.
fn decode_value(row: &tokio_postgres::Row, idx: usize) -> Result<SqlValue, CatalogError> {
    let column = &row.columns()[idx];
    let value = match column.type_().name() {
        "bool" => row
            .try_get::<_, Option<bool>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Bool),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map_err(decode_err)?
            .map(|v| SqlValue::Int(v.into())),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map_err(decode_err)?
            .map(|v| SqlValue::Int(v.into())),
        "int8" => row
            .try_get::<_, Option<i64>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Int),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map_err(decode_err)?
            .map(|v| SqlValue::Float(v.into())),
        "float8" => row
            .try_get::<_, Option<f64>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Float),
        "numeric" => row
            .try_get::<_, Option<rust_decimal::Decimal>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Numeric),
        "text" | "varchar" | "bpchar" | "name" | "citext" => row
            .try_get::<_, Option<String>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Text),
        "bytea" => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Bytes),
        "uuid" => row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Uuid),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Date),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(decode_err)?
            .map(|v| SqlValue::Timestamp(v.and_utc())),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(decode_err)?
            .map(SqlValue::Timestamp),
        "json" | "jsonb" => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(decode_err)?
            .map(|v| SqlValue::Text(v.to_string())),
        other => {
            return Err(CatalogError::UnsupportedColumnType {
                column: column.name().to_string(),
                pg_type: other.to_string(),
            })
        }
    };
    Ok(value.unwrap_or(SqlValue::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_table_with_and_without_schema() {
        assert_eq!(qualified_table("alpha", "users"), "alpha.users");
        assert_eq!(qualified_table("", "users"), "users");
    }

    #[test]
    fn select_appends_condition_verbatim() {
        assert_eq!(
            build_select("id, user_id", "alpha", "orders", " where id in (1, 2)"),
            "SELECT id, user_id FROM alpha.orders where id in (1, 2)"
        );
        assert_eq!(
            build_select("*", "alpha", "orders", ""),
            "SELECT * FROM alpha.orders"
        );
    }
}
