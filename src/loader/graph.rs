//! Dependency graph over package rows.
//!
//! Nodes identify one row (or native class) of one package; edges are oriented
//! **dependency → dependent**: `add_edge(outer, current)` reads "outer must
//! exist before current". The resolver's construction rules guarantee acyclicity
//! for well-formed containers, so the sort does not detect cycles; it terminates
//! on any input, and [`DependencyGraph::detect_cycles`] provides the loud
//! diagnostic for inputs that should have been well-formed.

use std::{fmt, sync::Arc};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::{upk::index::ObjectIndex, Error::SelfEdge, Result};

/// What a graph node refers to within its package.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum NodeKey {
    /// A table row (or the package root, for the null index)
    Object(ObjectIndex),
    /// A native class handle, identified by class name; never materialized
    NativeClass(Arc<str>),
}

/// One node of the dependency graph: a row or native class of one package.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Name of the package the node lives in
    pub package: Arc<str>,
    /// The row or handle within that package
    pub key: NodeKey,
}

impl NodeRef {
    /// Node for a table row of a package
    #[must_use]
    pub fn object(package: Arc<str>, index: ObjectIndex) -> Self {
        NodeRef {
            package,
            key: NodeKey::Object(index),
        }
    }

    /// Node for a native class of a package
    #[must_use]
    pub fn native_class(package: Arc<str>, class: &str) -> Self {
        NodeRef {
            package,
            key: NodeKey::NativeClass(Arc::from(class)),
        }
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            NodeKey::Object(index) => write!(f, "({}, {:?})", self.package, index),
            NodeKey::NativeClass(name) => write!(f, "({}, native {})", self.package, name),
        }
    }
}

/// A directed graph expressing "must exist before" constraints between rows.
///
/// Node insertion order is remembered and used as the root visit order of the
/// sort, so repeated runs over the same insertions produce the same order.
/// Edges are a set; duplicates collapse.
#[derive(Default)]
pub struct DependencyGraph {
    /// Nodes in first-insertion order
    order: Vec<NodeRef>,
    /// Adjacency: node -> nodes that depend on it
    edges: FxHashMap<NodeRef, FxHashSet<NodeRef>>,
}

impl DependencyGraph {
    /// Create a new empty graph
    #[must_use]
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Get the number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the node is present
    #[must_use]
    pub fn contains(&self, node: &NodeRef) -> bool {
        self.edges.contains_key(node)
    }

    /// Add a node; idempotent.
    pub fn add_node(&mut self, node: NodeRef) {
        if !self.edges.contains_key(&node) {
            self.order.push(node.clone());
            self.edges.insert(node, FxHashSet::default());
        }
    }

    /// Add the edge `from → to`: `from` must exist before `to`.
    ///
    /// Absent endpoints are added; a duplicate edge collapses into the set.
    ///
    /// # Errors
    /// Returns [`SelfEdge`] when `from == to`, leaving the graph unchanged
    pub fn add_edge(&mut self, from: NodeRef, to: NodeRef) -> Result<()> {
        if from == to {
            return Err(SelfEdge(format!("{from:?}")));
        }

        self.add_node(from.clone());
        self.add_node(to.clone());
        self.edges
            .get_mut(&from)
            .expect("endpoint was just added")
            .insert(to);
        Ok(())
    }

    /// The nodes depending on `node`
    pub fn edges_of<'a>(&'a self, node: &NodeRef) -> impl Iterator<Item = &'a NodeRef> + 'a {
        self.edges.get(node).into_iter().flatten()
    }

    /// Child iterator for a node known to be in the graph.
    fn children(&self, node: &NodeRef) -> std::collections::hash_set::Iter<'_, NodeRef> {
        self.edges
            .get(node)
            .expect("graph node has an adjacency entry")
            .iter()
    }

    /// Produce a materialization order: every node appears after every node it
    /// depends on.
    ///
    /// Post-order depth-first from every unvisited node in insertion order; the
    /// completion stack popped to a list. Terminates on any input, including
    /// cyclic input (where the result is still a total order over all nodes,
    /// just not a topological one).
    #[must_use]
    pub fn topo_sort(&self) -> Vec<NodeRef> {
        let mut finished = Vec::with_capacity(self.order.len());
        let mut visited: FxHashSet<&NodeRef> = FxHashSet::default();
        let mut stack = Vec::new();

        for root in &self.order {
            if visited.contains(root) {
                continue;
            }
            visited.insert(root);
            stack.push((root, self.children(root)));

            // Iterative DFS; a node moves onto the finish stack exactly when its
            // last child has completed.
            while !stack.is_empty() {
                let next = {
                    let (_, children) = stack.last_mut().expect("stack is non-empty");
                    children.find(|child| !visited.contains(*child))
                };

                match next {
                    Some(child) => {
                        visited.insert(child);
                        stack.push((child, self.children(child)));
                    }
                    None => {
                        let (node, _) = stack.pop().expect("stack is non-empty");
                        finished.push(node.clone());
                    }
                }
            }
        }

        finished.reverse();
        finished
    }

    /// Check for circular dependencies in the graph.
    ///
    /// # Errors
    /// Returns [`crate::Error::GraphError`] naming a node on a cycle
    pub fn detect_cycles(&self) -> Result<()> {
        let mut visited = FxHashSet::default();
        let mut visiting = FxHashSet::default();

        for node in &self.order {
            if !visited.contains(node) {
                self.detect_cycle(node, &mut visited, &mut visiting)?;
            }
        }

        Ok(())
    }

    fn detect_cycle(
        &self,
        node: &NodeRef,
        visited: &mut FxHashSet<NodeRef>,
        visiting: &mut FxHashSet<NodeRef>,
    ) -> Result<()> {
        visited.insert(node.clone());
        visiting.insert(node.clone());

        for child in self.edges_of(node) {
            if !visited.contains(child) {
                self.detect_cycle(child, visited, visiting)?;
            } else if visiting.contains(child) {
                return Err(crate::Error::GraphError(format!(
                    "Circular dependency detected involving node {child:?}"
                )));
            }
        }

        visiting.remove(node);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(package: &str, value: i32) -> NodeRef {
        NodeRef::object(Arc::from(package), ObjectIndex(value))
    }

    fn position(order: &[NodeRef], wanted: &NodeRef) -> usize {
        order.iter().position(|n| n == wanted).unwrap()
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut graph = DependencyGraph::new();
        graph.add_node(node("A", 1));
        graph.add_node(node("A", 1));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn edges_auto_add_endpoints_and_collapse() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges_of(&node("A", 1)).count(), 1);
    }

    #[test]
    fn self_edge_is_rejected_and_graph_unchanged() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();

        let result = graph.add_edge(node("A", 1), node("A", 1));
        assert!(matches!(result, Err(SelfEdge(_))));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edges_of(&node("A", 1)).count(), 1);

        // A self edge between yet-unknown nodes must not add the node either
        let result = graph.add_edge(node("B", 1), node("B", 1));
        assert!(result.is_err());
        assert!(!graph.contains(&node("B", 1)));
    }

    #[test]
    fn topo_respects_every_edge() {
        let mut graph = DependencyGraph::new();
        // Diamond: 1 -> 2 -> 4, 1 -> 3 -> 4, plus a detached chain
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        graph.add_edge(node("A", 1), node("A", 3)).unwrap();
        graph.add_edge(node("A", 2), node("A", 4)).unwrap();
        graph.add_edge(node("A", 3), node("A", 4)).unwrap();
        graph.add_edge(node("B", 1), node("B", 2)).unwrap();

        let order = graph.topo_sort();
        assert_eq!(order.len(), 6);

        for (from, to) in [
            (node("A", 1), node("A", 2)),
            (node("A", 1), node("A", 3)),
            (node("A", 2), node("A", 4)),
            (node("A", 3), node("A", 4)),
            (node("B", 1), node("B", 2)),
        ] {
            assert!(
                position(&order, &from) < position(&order, &to),
                "{from:?} must precede {to:?}"
            );
        }
    }

    #[test]
    fn topo_is_stable_under_duplicate_insertions() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        graph.add_edge(node("A", 2), node("A", 3)).unwrap();
        let baseline = graph.topo_sort();

        graph.add_node(node("A", 1));
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        assert_eq!(graph.topo_sort(), baseline);
    }

    #[test]
    fn topo_terminates_on_cycles() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        graph.add_edge(node("A", 2), node("A", 3)).unwrap();
        graph.add_edge(node("A", 3), node("A", 1)).unwrap();

        let order = graph.topo_sort();
        assert_eq!(order.len(), 3);
        assert!(graph.detect_cycles().is_err());
    }

    #[test]
    fn acyclic_graph_passes_cycle_check() {
        let mut graph = DependencyGraph::new();
        graph.add_edge(node("A", 1), node("A", 2)).unwrap();
        graph.add_edge(node("A", 2), node("A", 3)).unwrap();
        assert!(graph.detect_cycles().is_ok());
    }

    #[test]
    fn native_class_nodes_are_distinct() {
        let mut graph = DependencyGraph::new();
        let package: Arc<str> = Arc::from("A");
        graph
            .add_edge(
                NodeRef::native_class(package.clone(), "Vector"),
                NodeRef::object(package.clone(), ObjectIndex(-1)),
            )
            .unwrap();

        assert_eq!(graph.node_count(), 2);
        assert!(graph.contains(&NodeRef::native_class(package, "Vector")));
    }
}
