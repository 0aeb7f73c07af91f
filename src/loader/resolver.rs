//! Dependency enumeration across package boundaries.
//!
//! [`DependencyResolver`] walks table rows breadth-first and enriches a
//! [`DependencyGraph`] with every "must exist before" edge reachable from a
//! root: outer/class/super/archetype edges for exports, outer and resolved
//! reference edges for imports, and native-class handle edges for classes the
//! engine synthesizes. Crossing a package boundary goes through the
//! [`ImportResolver`] authority, which fails the load when a referenced
//! package cannot be produced.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::{
    loader::graph::{DependencyGraph, NodeKey, NodeRef},
    upk::{
        cache::ImportResolver,
        index::ObjectIndex,
        package::{ResolvedImport, Row},
    },
    Error::UnresolvedPackage,
    Result,
};

/// Enumerates the transitive dependency closure of package rows into a graph.
pub struct DependencyResolver<'a> {
    cache: &'a dyn ImportResolver,
    graph: &'a mut DependencyGraph,
    seen: FxHashSet<NodeRef>,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver enriching `graph` through `cache`
    pub fn new(cache: &'a dyn ImportResolver, graph: &'a mut DependencyGraph) -> Self {
        DependencyResolver {
            cache,
            graph,
            seen: FxHashSet::default(),
        }
    }

    /// Add `root` and the transitive closure of edges reachable from it.
    ///
    /// Breadth-first over rows: each dequeued node contributes its edges and
    /// enqueues the rows those edges lead to. Native class handles receive an
    /// edge but are never enqueued; package-root nodes (null index) carry no
    /// row and terminate their branch.
    ///
    /// # Errors
    /// Returns [`UnresolvedPackage`] when a referenced package cannot be
    /// produced, [`crate::Error::UnresolvedImport`] when an import matches
    /// nothing in its target, and propagates graph errors
    pub fn add_object_dependencies(&mut self, root: NodeRef) -> Result<()> {
        let mut queue = VecDeque::new();
        self.graph.add_node(root.clone());
        if self.seen.insert(root.clone()) {
            queue.push_back(root);
        }

        while let Some(current) = queue.pop_front() {
            let NodeKey::Object(index) = &current.key else {
                // Native class handles have no row and therefore no dependencies.
                continue;
            };
            let index = *index;

            let Some(package) = self.cache.resolve(&current.package) else {
                return Err(UnresolvedPackage(current.package.to_string()));
            };

            match package.get_row(index) {
                Row::None => {}
                Row::Export(row) => {
                    for reference in
                        [row.outer_ref, row.class_ref, row.super_ref, row.archetype_ref]
                    {
                        if reference.is_null() {
                            continue;
                        }
                        let node = NodeRef::object(current.package.clone(), reference);
                        self.link(node, &current, &mut queue)?;
                    }
                }
                Row::Import(row) => {
                    let import_row = index.as_import()?;

                    if !row.outer.is_null() {
                        let node = NodeRef::object(current.package.clone(), row.outer);
                        self.link(node, &current, &mut queue)?;
                    }

                    if package.is_native_import(import_row)? {
                        // The class is synthesized by this package; record the
                        // handle edge without enqueueing it for materialization.
                        let class = package.name_of(row.object_name)?;
                        let node = NodeRef::native_class(current.package.clone(), &class);
                        trace!(package = %current.package, class, "native class handle");
                        self.graph.add_edge(node, current.clone())?;
                    } else {
                        let node = match package.resolve_import(import_row, self.cache)? {
                            ResolvedImport::Export { package, index } => {
                                NodeRef::object(package.into(), index)
                            }
                            ResolvedImport::Import { package, index } => {
                                NodeRef::object(package.into(), index)
                            }
                            ResolvedImport::Package(package) => {
                                NodeRef::object(package.into(), ObjectIndex::null())
                            }
                            ResolvedImport::Native { package, class } => {
                                NodeRef::native_class(package.into(), &class.name)
                            }
                        };

                        if matches!(node.key, NodeKey::NativeClass(_)) {
                            self.graph.add_edge(node, current.clone())?;
                        } else {
                            self.link(node, &current, &mut queue)?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Add the edge `dependency → dependent` and enqueue the dependency if new.
    fn link(
        &mut self,
        dependency: NodeRef,
        dependent: &NodeRef,
        queue: &mut VecDeque<NodeRef>,
    ) -> Result<()> {
        self.graph.add_edge(dependency.clone(), dependent.clone())?;
        if self.seen.insert(dependency.clone()) {
            queue.push_back(dependency);
        }
        Ok(())
    }
}
