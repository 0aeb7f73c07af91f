//! # upkscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types
//! from the library. Import it to get quick access to the essential types for
//! loading, inspecting, and exporting containers.
//!
//! # Usage
//!
//! ```rust,no_run
//! use upkscope::prelude::*;
//!
//! let package = Package::from_file(std::path::Path::new("CoreAssets.upk"), "CoreAssets")?;
//! println!("{}", package.name());
//! # Ok::<(), upkscope::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all library operations
pub use crate::Error;

/// The result type used throughout the library
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// One decoded container and its materialized objects
pub use crate::Package;

/// Shared container storage and boundary-crossing authority
pub use crate::PackageCache;

/// Decode-resolve-materialize orchestration
pub use crate::PackageLoader;

/// Filter, reindex and re-emit a loaded container
pub use crate::PackageExporter;

/// Low-level file parsing and emission utilities
pub use crate::{File, Parser, Writer};

// ================================================================================================
// Container Data Model
// ================================================================================================

/// Tagged object reference and its tag
pub use crate::upk::index::{IndexTag, ObjectIndex};

/// Interned names
pub use crate::upk::name::{FName, NameTable};

/// Table rows
pub use crate::upk::{export::ObjectExport, import::ObjectImport};

/// Container header
pub use crate::upk::summary::FileSummary;

/// Boundary-crossing authority trait
pub use crate::upk::cache::ImportResolver;

// ================================================================================================
// Objects and Codecs
// ================================================================================================

/// Materialized object model
pub use crate::objects::{ObjectBody, ObjectKind, UObject, UObjectRc};

/// Per-class body codec registry
pub use crate::objects::registry::{ObjectCodec, ObjectCodecRegistry, RawObjectCodec};
