//! Package loading orchestration.
//!
//! This module turns a container stream into a fully materialized package:
//! decode the tables, seed a [`graph::DependencyGraph`] from every row through
//! the [`resolver::DependencyResolver`], topologically sort it, and materialize
//! each node in order so every object's dependencies exist before the object
//! itself is constructed.
//!
//! Loading is recursive by transitivity: resolving an import may demand that
//! another package be produced mid-seed. That happens inside the cache
//! (pre-`add`ed packages or search-path discovery); the loader itself only
//! requires that `resolve` succeeds for every referenced package.

pub mod graph;
pub mod resolver;

use std::{path::Path, sync::Arc};

use tracing::debug;

use crate::{
    loader::{graph::DependencyGraph, graph::NodeKey, resolver::DependencyResolver},
    objects::registry::ObjectCodecRegistry,
    upk::{
        cache::ImportResolver,
        index::ObjectIndex,
        package::{Package, PackageRc, Row},
    },
    Error::UnresolvedPackage,
    Result,
};

/// Orchestrates decoding, dependency seeding, and in-order materialization.
///
/// The loader owns nothing package-shaped itself; the cache mediates all shared
/// state, so independent loads of different packages may run on separate
/// threads against one cache.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::objects::registry::ObjectCodecRegistry;
/// use upkscope::{PackageCache, PackageLoader};
/// use std::{path::Path, sync::Arc};
///
/// let cache = Arc::new(PackageCache::new().with_search_path("./CookedPC".into()));
/// let registry = Arc::new(ObjectCodecRegistry::new());
/// let loader = PackageLoader::new(cache, registry);
///
/// let package = loader.load(Path::new("./CookedPC/MapStart.upk"), "MapStart")?;
/// println!("materialized {} objects", package.object_count());
/// # Ok::<(), upkscope::Error>(())
/// ```
pub struct PackageLoader {
    cache: Arc<dyn ImportResolver>,
    registry: Arc<ObjectCodecRegistry>,
}

impl PackageLoader {
    /// Create a loader over a shared cache and codec registry
    pub fn new(cache: Arc<dyn ImportResolver>, registry: Arc<ObjectCodecRegistry>) -> Self {
        PackageLoader { cache, registry }
    }

    /// The cache this loader publishes into
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn ImportResolver> {
        &self.cache
    }

    /// Load the package at `path`, known by `name`.
    ///
    /// Returns the cached package when `name` is already held. Otherwise the
    /// container is decoded, published to the cache, its dependency closure is
    /// seeded from every export and import row, and every row node is
    /// materialized in topological order.
    ///
    /// # Errors
    /// Propagates decoding, resolution, graph and materialization failures;
    /// the partially-loaded package stays published and callers that abort
    /// should evict it by name
    pub fn load(&self, path: &Path, name: &str) -> Result<PackageRc> {
        if let Some(package) = self.cache.resolve(name) {
            return Ok(package);
        }

        let package = self.cache.add(Package::from_file(path, name)?);
        self.materialize(&package)?;
        Ok(package)
    }

    /// Load a package from an owned buffer, known by `name`.
    ///
    /// # Errors
    /// See [`PackageLoader::load`]
    pub fn load_from_mem(&self, data: Vec<u8>, name: &str) -> Result<PackageRc> {
        if let Some(package) = self.cache.resolve(name) {
            return Ok(package);
        }

        let package = self.cache.add(Package::from_mem(data, name)?);
        self.materialize(&package)?;
        Ok(package)
    }

    /// Seed the dependency graph from every row of `package`, sort, and
    /// materialize in order.
    fn materialize(&self, package: &PackageRc) -> Result<()> {
        let mut graph = DependencyGraph::new();
        let handle = package.name_handle();

        {
            let mut resolver = DependencyResolver::new(self.cache.as_ref(), &mut graph);
            for row in 0..package.exports().len() {
                resolver
                    .add_object_dependencies(graph_node(&handle, ObjectIndex::from_export(row)))?;
            }
            for row in 0..package.imports().len() {
                resolver
                    .add_object_dependencies(graph_node(&handle, ObjectIndex::from_import(row)))?;
            }
        }

        #[cfg(debug_assertions)]
        {
            // Well-formed containers cannot produce cycles; surface malformed
            // input loudly instead of materializing in a nonsensical order.
            graph.detect_cycles()?;
        }

        let order = graph.topo_sort();
        debug!(
            package = package.name(),
            nodes = order.len(),
            "materializing in dependency order"
        );

        for node in order {
            let NodeKey::Object(index) = node.key else {
                continue;
            };

            let Some(owner) = self.cache.resolve(&node.package) else {
                return Err(UnresolvedPackage(node.package.to_string()));
            };

            if !matches!(owner.get_row(index), Row::None) {
                owner.create_object(index, self.cache.as_ref(), &self.registry)?;
            }
        }

        Ok(())
    }
}

fn graph_node(package: &Arc<str>, index: ObjectIndex) -> graph::NodeRef {
    graph::NodeRef::object(package.clone(), index)
}
