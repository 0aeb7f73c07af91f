// Copyright 2026 The upkscope contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/mod.rs' uses mmap to map a container into memory

//! # upkscope
//!
//! A loader and exporter core for the asset-container format of a well-known 3D
//! engine. A container holds a name table, an import table, an export table, and
//! a stream of serialized object bodies; objects inside one container reference
//! objects in others. `upkscope` resolves that graph of inter-container
//! references into a valid load order, materializes objects in that order, and
//! re-emits a consistent, filtered subset of the graph as a new container.
//!
//! # Architecture
//!
//! The library is organized into layers that mirror the two hard problems:
//!
//! - **File Layer**: Memory-mapped input, bounds-checked parsing, seekable output
//! - **Container Layer**: Reference algebra, name interning, table codecs, and
//!   the decoded package with its materialized objects
//! - **Loader Layer**: Cross-container dependency resolution, the dependency
//!   graph, and topologically ordered materialization
//! - **Export Layer**: Filtered table copy, reference reindexing, and the
//!   two-pass container write
//!
//! ## Key Components
//!
//! - [`crate::Package`] - One decoded container and its materialized objects
//! - [`crate::PackageCache`] - Shares containers across a session; the authority
//!   for crossing container boundaries
//! - [`crate::PackageLoader`] - Decode, resolve, sort, materialize
//! - [`crate::PackageExporter`] - Filter, reindex, two-pass write
//! - [`crate::upk`] - The container data model (indices, names, rows, header)
//! - [`crate::objects`] - Materialized objects and per-class body codecs
//! - [`crate::prelude`] - Convenient re-exports of commonly used types
//! - [`crate::Error`] and [`crate::Result`] - Comprehensive error handling
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use upkscope::{objects::registry::ObjectCodecRegistry, PackageCache, PackageLoader};
//! use std::{path::Path, sync::Arc};
//!
//! // Sibling containers are discovered through the cache's search paths.
//! let cache = Arc::new(PackageCache::new().with_search_path("./CookedPC".into()));
//! let registry = Arc::new(ObjectCodecRegistry::new());
//!
//! let loader = PackageLoader::new(cache.clone(), registry);
//! let package = loader.load(Path::new("./CookedPC/MapStart.upk"), "MapStart")?;
//! println!("materialized {} objects", package.object_count());
//! # Ok::<(), upkscope::Error>(())
//! ```
//!
//! Exporting a loaded container back out:
//!
//! ```rust,ignore
//! use upkscope::PackageExporter;
//!
//! let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
//! let bytes = exporter.export_to_bytes()?;
//! std::fs::write("MapStart_slim.upk", bytes)?;
//! ```
//!
//! # Scope
//!
//! The crate validates the reference graph, not the semantics of object bodies;
//! format versions are carried through verbatim, and any decompression or
//! decryption stage runs before bytes reach [`crate::Package::decode`].

#[macro_use]
pub(crate) mod error;


/// Container re-emission: filtering, reindexing, and the two-pass write.
///
/// See [`crate::export::PackageExporter`] for the pipeline entry point.
pub mod export;

/// Low-level input/output: memory-mapped files, parse and write cursors.
pub mod file;

/// Loading orchestration: dependency graph, resolver, and the loader itself.
pub mod loader;

/// Materialized objects, the class taxonomy, and per-class body codecs.
pub mod objects;

/// The container data model: indices, names, tables, header, package, cache.
pub mod upk;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// The error type for all operations of this library.
///
/// See [`crate::Error`]'s variant documentation for the complete taxonomy of
/// failure modes.
pub use error::Error;

/// The result type used throughout this library.
pub type Result<T> = std::result::Result<T, Error>;

/// Main entry point for working with decoded containers.
///
/// # Usage Examples
///
/// ```rust,no_run
/// use upkscope::Package;
/// let package = Package::from_file(std::path::Path::new("CoreAssets.upk"), "CoreAssets")?;
/// println!("{} exports", package.exports().len());
/// # Ok::<(), upkscope::Error>(())
/// ```
pub use upk::package::Package;

/// Process-wide container storage and boundary-crossing authority.
pub use upk::cache::PackageCache;

/// Tagged signed-integer reference to an import row, export row, or null.
pub use upk::index::ObjectIndex;

/// Decode-resolve-materialize orchestration over a shared cache.
pub use loader::PackageLoader;

/// Filter, reindex and re-emit a loaded container.
pub use export::PackageExporter;

/// Low-level file and stream primitives.
///
/// The [`crate::Parser`] and [`crate::Writer`] cursors are also what object
/// body codecs consume and produce.
pub use file::{File, Parser, Writer};
