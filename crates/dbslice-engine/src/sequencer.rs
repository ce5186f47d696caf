//! Restore-order sequencing
//!
//! Depth-first post-order over the registry's outgoing edges: every
//! referenced table is emitted before its referrers, so the dump can be
//! replayed top to bottom. On a cycle one edge is unavoidably violated;
//! the traversal still emits each table exactly once.

use std::collections::HashSet;

use dbslice_core::{Registry, TableNode};

/// Order the registry's tables for restore. Traversal starts from
/// `root_order` (the caller's original root-table order), then covers the
/// remaining tables in registry discovery order; both are deterministic.
pub fn sequence<'a>(registry: &'a Registry, root_order: &[String]) -> Vec<&'a TableNode> {
    let mut result = Vec::with_capacity(registry.len());
    let mut visited: HashSet<&str> = HashSet::with_capacity(registry.len());

    let roots: HashSet<&str> = root_order.iter().map(String::as_str).collect();
    let mut starting: Vec<&TableNode> = root_order
        .iter()
        .filter_map(|name| registry.get(name))
        .collect();
    starting.extend(
        registry
            .tables()
            .filter(|node| !roots.contains(node.name.as_str())),
    );

    for node in starting {
        if !visited.contains(node.name.as_str()) {
            visit(registry, node, &mut visited, &mut result);
        }
    }
    result
}

fn visit<'a>(
    registry: &'a Registry,
    node: &'a TableNode,
    visited: &mut HashSet<&'a str>,
    result: &mut Vec<&'a TableNode>,
) {
    visited.insert(node.name.as_str());
    for edge in &node.edges {
        if visited.contains(edge.as_str()) {
            continue;
        }
        if let Some(target) = registry.get(edge) {
            visit(registry, target, visited, result);
        }
    }
    result.push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(edges: &[(&str, &[&str])]) -> Registry {
        let mut registry = Registry::new();
        for (name, targets) in edges {
            registry.get_or_insert(name);
            for target in *targets {
                registry.add_edge(name, target);
            }
        }
        registry
    }

    fn names(ordered: &[&TableNode]) -> Vec<String> {
        ordered.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn referenced_tables_come_first() {
        let registry = registry_of(&[
            ("user_payment_methods", &["users", "orders"]),
            ("users", &[]),
            ("orders", &["users"]),
        ]);
        let ordered = sequence(&registry, &["user_payment_methods".to_string()]);
        assert_eq!(
            names(&ordered),
            vec!["users", "orders", "user_payment_methods"]
        );
    }

    #[test]
    fn every_table_appears_exactly_once() {
        let registry = registry_of(&[
            ("a", &["b", "c"]),
            ("b", &["c"]),
            ("c", &[]),
            ("d", &["c"]),
        ]);
        let ordered = sequence(&registry, &["a".to_string()]);
        assert_eq!(ordered.len(), 4);
        let mut seen = HashSet::new();
        for node in &ordered {
            assert!(seen.insert(node.name.as_str()));
        }
    }

    #[test]
    fn cycle_terminates_with_one_entry_per_table() {
        let registry = registry_of(&[
            ("table_one", &["table_two"]),
            ("table_two", &["table_three"]),
            ("table_three", &["table_one"]),
        ]);
        let ordered = sequence(&registry, &["table_one".to_string()]);
        assert_eq!(
            names(&ordered),
            vec!["table_three", "table_two", "table_one"]
        );
    }

    #[test]
    fn self_reference_is_skipped() {
        let registry = registry_of(&[("employees", &["employees"])]);
        let ordered = sequence(&registry, &["employees".to_string()]);
        assert_eq!(names(&ordered), vec!["employees"]);
    }

    #[test]
    fn tables_outside_root_order_follow_discovery_order() {
        let registry = registry_of(&[("root", &[]), ("zeta", &[]), ("alpha", &[])]);
        let ordered = sequence(&registry, &["root".to_string()]);
        assert_eq!(names(&ordered), vec!["root", "zeta", "alpha"]);
    }

    #[test]
    fn topological_property_holds_for_acyclic_edges() {
        let registry = registry_of(&[
            ("a", &["b"]),
            ("b", &["c", "d"]),
            ("c", &["d"]),
            ("d", &[]),
        ]);
        let ordered = sequence(&registry, &["a".to_string()]);
        let position: std::collections::HashMap<&str, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.as_str(), i))
            .collect();
        for node in registry.tables() {
            for edge in &node.edges {
                assert!(position[edge.as_str()] < position[node.name.as_str()]);
            }
        }
    }
}
