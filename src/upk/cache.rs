//! Shared package storage and the boundary-crossing authority.
//!
//! The [`ImportResolver`] trait is the only interface the resolver and loader
//! demand for crossing package boundaries; [`PackageCache`] is the process-wide
//! implementation, a concurrent name-to-package map with optional search paths
//! that satisfy misses by decoding sibling containers from disk.
//!
//! The cache is a configuration-owned service passed explicitly to the loader
//! and exporter; construct one per session and drop it to release package memory.

use std::path::PathBuf;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::upk::package::{Package, PackageRc};

/// Extensions tried when satisfying a cache miss from a search path.
const PACKAGE_EXTENSIONS: [&str; 3] = ["upk", "u", "umap"];

/// The authority the resolver consults to cross package boundaries.
///
/// `resolve` returning `None` surfaces as
/// [`crate::Error::UnresolvedPackage`] at the call site; implementations never
/// fail loudly themselves. `add` and `resolve` are atomic with respect to each
/// other; readers may overlap freely.
pub trait ImportResolver: Send + Sync {
    /// Produce the package known by `name`, if possible
    fn resolve(&self, name: &str) -> Option<PackageRc>;

    /// Returns true if the package is already held
    fn is_cached(&self, name: &str) -> bool;

    /// Publish a decoded package, returning the shared handle
    fn add(&self, package: Package) -> PackageRc;
}

/// Process-wide associative store mapping package names to decoded packages.
///
/// Packages are published after a successful decode and before materialization,
/// so partially-materialized packages are visible; callers that abort a load
/// evict by name. Registered search paths let `resolve` satisfy a miss by
/// decoding `<name>.upk` (or `.u`, `.umap`) on the fly, which is how loading a
/// package transitively pulls in the containers it references.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::upk::cache::{ImportResolver, PackageCache};
/// use std::path::PathBuf;
///
/// let cache = PackageCache::new().with_search_path(PathBuf::from("./CookedPC"));
/// if let Some(core) = cache.resolve("Core") {
///     println!("{} exports", core.exports().len());
/// }
/// ```
#[derive(Default)]
pub struct PackageCache {
    packages: DashMap<String, PackageRc>,
    search_paths: Vec<PathBuf>,
}

impl PackageCache {
    /// Create a new empty cache with no search paths
    #[must_use]
    pub fn new() -> Self {
        PackageCache::default()
    }

    /// Add a directory that `resolve` may satisfy misses from
    ///
    /// ## Arguments
    /// * 'path' - The directory to scan for `<name>.<ext>` containers
    #[must_use]
    pub fn with_search_path(mut self, path: PathBuf) -> Self {
        self.search_paths.push(path);
        self
    }

    /// Number of packages currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if no package is held
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Drop the package known by `name`, if held
    pub fn evict(&self, name: &str) {
        self.packages.remove(name);
    }

    /// Get the package known by `name` without attempting discovery
    #[must_use]
    pub fn get(&self, name: &str) -> Option<PackageRc> {
        self.packages.get(name).map(|entry| entry.value().clone())
    }

    /// Try to decode `name` from the registered search paths
    fn discover(&self, name: &str) -> Option<PackageRc> {
        for directory in &self.search_paths {
            for extension in PACKAGE_EXTENSIONS {
                let candidate = directory.join(format!("{name}.{extension}"));
                if !candidate.is_file() {
                    continue;
                }

                match Package::from_file(&candidate, name) {
                    Ok(package) => {
                        debug!(package = name, path = %candidate.display(), "discovered container");
                        return Some(self.add(package));
                    }
                    Err(error) => {
                        warn!(
                            package = name,
                            path = %candidate.display(),
                            %error,
                            "failed to decode discovered container"
                        );
                    }
                }
            }
        }
        None
    }
}

impl ImportResolver for PackageCache {
    fn resolve(&self, name: &str) -> Option<PackageRc> {
        if let Some(package) = self.get(name) {
            return Some(package);
        }
        self.discover(name)
    }

    fn is_cached(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    fn add(&self, package: Package) -> PackageRc {
        let shared = PackageRc::new(package);
        self.packages
            .insert(shared.name().to_string(), shared.clone());
        shared
    }
}
