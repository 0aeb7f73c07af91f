//! Container data model: reference algebra, tables, and the decoded package.
//!
//! This module holds everything that describes *one* container: the tagged
//! signed-integer [`index::ObjectIndex`], interned [`name::FName`] storage, the
//! header [`summary::FileSummary`], the import/export row types with their byte
//! codecs, the decoded [`package::Package`] itself, and the
//! [`cache::PackageCache`] that shares packages across a session.
//!
//! Cross-container concerns (dependency graphs, materialization order) live in
//! [`crate::loader`]; re-emission lives in [`crate::export`].

/// Implementation of the shared package cache and resolver authority
pub mod cache;
/// Implementation of the export table row
pub mod export;
/// Implementation of the four-word object identifier
pub mod guid;
/// Implementation of the import table row
pub mod import;
/// Commonly used tagged object reference type
pub mod index;
/// Implementation of interned name storage
pub mod name;
/// Implementation of a loaded + parsed container
pub mod package;
/// Implementation of the container header
pub mod summary;
/// Implementation of the row codec seam and owned tables
pub mod tables;
