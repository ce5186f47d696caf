//! Dump serializer
//!
//! Streams each table's matching rows into a `COPY ... FROM stdin` text
//! block with trigger toggles around it, using the exact value encoding
//! the bulk loader expects. Blocks are written in sequencer order and the
//! sink is flushed at least every 1000 rows.

use std::io::Write;

use chrono::SecondsFormat;
use dbslice_catalog::Catalog;
use dbslice_core::{Filters, SqlValue, TableNode};
use futures::TryStreamExt;
use tracing::debug;

use crate::DumpError;

const FLUSH_EVERY_ROWS: usize = 1000;

/// Writes ordered table blocks into a sink.
pub struct Serializer<'a, C: Catalog> {
    catalog: &'a C,
    schema: &'a str,
}

impl<'a, C: Catalog> Serializer<'a, C> {
    pub fn new(catalog: &'a C, schema: &'a str) -> Self {
        Self { catalog, schema }
    }

    /// Emit one block per table, in the given order. A failure aborts the
    /// whole run; whatever was already written stays in the sink.
    pub async fn serialize<W: Write>(
        &self,
        tables: &[&TableNode],
        sink: &mut W,
    ) -> Result<(), DumpError> {
        for node in tables {
            self.write_table(node, sink).await?;
        }
        Ok(())
    }

    async fn write_table<W: Write>(
        &self,
        node: &TableNode,
        sink: &mut W,
    ) -> Result<(), DumpError> {
        let target = qualified_table(self.schema, &node.name);
        let condition = key_condition(&node.filters);
        debug!(table = %target, "writing table block");

        let scan = self
            .catalog
            .fetch_all_columns(self.schema, &node.name, &condition)
            .await?;
        let columns = scan
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(sink, "-- Data for Name: {target}; Type: TABLE DATA;")?;
        writeln!(sink, "ALTER TABLE {target} DISABLE TRIGGER ALL;")?;
        writeln!(sink, "COPY {target} ({columns}) FROM stdin;")?;

        let mut rows = scan.rows;
        let mut count = 0usize;
        while let Some(row) = rows.try_next().await? {
            let line = row.iter().map(copy_text).collect::<Vec<_>>().join("\t");
            writeln!(sink, "{line}")?;
            count += 1;
            if count % FLUSH_EVERY_ROWS == 0 {
                sink.flush()?;
            }
        }

        writeln!(sink, "\\.")?;
        write!(sink, "ALTER TABLE {target} ENABLE TRIGGER ALL;\n\n\n")?;
        sink.flush()?;
        Ok(())
    }
}

/// Row-fetch condition over the table's accumulated filters: one IN-list
/// per column, OR-combined. A row matching any filtered column qualifies.
fn key_condition(filters: &Filters) -> String {
    if filters.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = filters
        .iter()
        .map(|(column, keys)| {
            let list = keys.iter().cloned().collect::<Vec<_>>().join(", ");
            format!("{column} in ({list})")
        })
        .collect();
    format!(" WHERE {}", clauses.join(" OR "))
}

fn qualified_table(schema: &str, table: &str) -> String {
    if schema.is_empty() {
        table.to_string()
    } else {
        format!("{schema}.{table}")
    }
}

/// Encode one value for a COPY text line.
fn copy_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "\\N".to_string(),
        SqlValue::Bool(true) => "t".to_string(),
        SqlValue::Bool(false) => "f".to_string(),
        SqlValue::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
        SqlValue::Timestamp(v) => v.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        SqlValue::Text(s) => escape_text(s),
        SqlValue::Int(v) => v.to_string(),
        SqlValue::Float(v) => v.to_string(),
        SqlValue::Numeric(v) => v.to_string(),
        SqlValue::Date(v) => v.format("%Y-%m-%d").to_string(),
        SqlValue::Uuid(v) => v.to_string(),
    }
}

/// String-literal escaping with the surrounding quotes stripped off:
/// control characters, backslash and the quote character are escaped.
fn escape_text(s: &str) -> String {
    let quoted = format!("{s:?}");
    quoted[1..quoted.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::collections::{BTreeMap, BTreeSet};
    use std::str::FromStr;

    fn ts(s: &str) -> SqlValue {
        SqlValue::Timestamp(DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc))
    }

    #[test]
    fn encodes_null_and_bool() {
        assert_eq!(copy_text(&SqlValue::Null), "\\N");
        assert_eq!(copy_text(&SqlValue::Bool(true)), "t");
        assert_eq!(copy_text(&SqlValue::Bool(false)), "f");
    }

    #[test]
    fn encodes_bytes_unescaped() {
        assert_eq!(copy_text(&SqlValue::Bytes(b"hello".to_vec())), "hello");
    }

    #[test]
    fn encodes_timestamps_with_shortest_exact_fraction() {
        assert_eq!(
            copy_text(&ts("2008-06-08T12:50:31.000000042Z")),
            "2008-06-08T12:50:31.000000042Z"
        );
        assert_eq!(
            copy_text(&ts("2025-01-01T10:00:00.928501Z")),
            "2025-01-01T10:00:00.928501Z"
        );
        assert_eq!(
            copy_text(&ts("2025-01-01T10:00:00Z")),
            "2025-01-01T10:00:00Z"
        );
    }

    #[test]
    fn encodes_text_with_escapes_and_stripped_quotes() {
        assert_eq!(copy_text(&SqlValue::from("plain")), "plain");
        assert_eq!(copy_text(&SqlValue::from("tab\there")), "tab\\there");
        assert_eq!(copy_text(&SqlValue::from("line\nbreak")), "line\\nbreak");
        assert_eq!(copy_text(&SqlValue::from("back\\slash")), "back\\\\slash");
        assert_eq!(copy_text(&SqlValue::from("say \"hi\"")), "say \\\"hi\\\"");
    }

    #[test]
    fn encodes_scalars_in_default_form() {
        assert_eq!(copy_text(&SqlValue::Int(42)), "42");
        assert_eq!(copy_text(&SqlValue::Float(99.5)), "99.5");
        assert_eq!(
            copy_text(&SqlValue::Numeric(
                rust_decimal::Decimal::from_str("99.99").unwrap()
            )),
            "99.99"
        );
        assert_eq!(
            copy_text(&SqlValue::Uuid(
                uuid::Uuid::from_str("11111111-1111-1111-1111-111111111111").unwrap()
            )),
            "11111111-1111-1111-1111-111111111111"
        );
    }

    #[test]
    fn key_condition_or_combines_columns() {
        let mut filters: Filters = BTreeMap::new();
        filters.insert(
            "id".to_string(),
            BTreeSet::from(["1".to_string(), "2".to_string(), "3".to_string()]),
        );
        filters.insert(
            "user_id".to_string(),
            BTreeSet::from(["1".to_string(), "2".to_string()]),
        );
        assert_eq!(
            key_condition(&filters),
            " WHERE id in (1, 2, 3) OR user_id in (1, 2)"
        );
        assert_eq!(key_condition(&Filters::new()), "");
    }

    #[test]
    fn qualified_table_name() {
        assert_eq!(qualified_table("alpha", "users"), "alpha.users");
        assert_eq!(qualified_table("", "users"), "users");
    }
}
