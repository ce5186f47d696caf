//! Table registry and foreign-key graph types
//!
//! One `Registry` lives for the duration of a single dump run. Nodes are
//! kept in an arena in discovery order and looked up by name, so cyclic
//! foreign-key graphs (A -> B -> C -> A) are representable without shared
//! ownership between nodes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Direction of a foreign-key relationship relative to the table it was
/// fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The current table's column references the foreign table.
    Outgoing,

    /// The foreign table's column references the current table.
    Incoming,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Outgoing
    }
}

/// A single foreign-key relationship as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkDescriptor {
    /// Column on the table the descriptor was fetched for.
    pub column_name: String,

    /// Schema of the table on the other end of the constraint.
    pub foreign_table_schema: String,

    /// Table on the other end of the constraint.
    pub foreign_table_name: String,

    /// Column on the other end of the constraint.
    pub foreign_column_name: String,

    /// Which way the constraint points.
    pub direction: Direction,
}

/// Accumulated key filters for one table: column name to the set of
/// string-encoded key literals collected so far. Sets only ever grow
/// during a run.
pub type Filters = BTreeMap<String, BTreeSet<String>>;

/// A discovered table with its accumulated filters and outgoing edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNode {
    /// Table name, unique within the registry.
    pub name: String,

    /// Column to key-literal sets. Membership only; the ordered map keeps
    /// generated SQL and dumps stable.
    pub filters: Filters,

    /// Names of tables this table references via outgoing foreign keys.
    /// Used only for restore ordering, never for filter propagation.
    pub edges: BTreeSet<String>,
}

impl TableNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filters: Filters::new(),
            edges: BTreeSet::new(),
        }
    }

    /// Add keys under `column`, returning true when at least one key was
    /// not already present.
    pub fn add_keys<I>(&mut self, column: &str, keys: I) -> bool
    where
        I: IntoIterator<Item = String>,
    {
        let set = self.filters.entry(column.to_string()).or_default();
        let mut touched = false;
        for key in keys {
            if set.insert(key) {
                touched = true;
            }
        }
        touched
    }
}

/// Name-keyed arena of table nodes, exactly one node per table name for
/// the lifetime of one resolution run. Iteration follows discovery order.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    nodes: Vec<TableNode>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&TableNode> {
        self.index.get(name).map(|&idx| &self.nodes[idx])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableNode> {
        let idx = *self.index.get(name)?;
        Some(&mut self.nodes[idx])
    }

    /// Look up the node for `name`, creating an empty one at the end of
    /// the discovery order if it does not exist yet.
    pub fn get_or_insert(&mut self, name: &str) -> &mut TableNode {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.nodes.len();
                self.nodes.push(TableNode::new(name));
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.nodes[idx]
    }

    /// Record an outgoing ordering edge `from -> to`. Both self-references
    /// and repeated edges are fine.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.get_or_insert(from).edges.insert(to.to_string());
    }

    /// All nodes in first-discovery order.
    pub fn tables(&self) -> impl Iterator<Item = &TableNode> {
        self.nodes.iter()
    }
}
