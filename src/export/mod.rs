//! Container re-emission pipeline.
//!
//! [`PackageExporter`] produces a new container from a loaded source package:
//! the tables are cloned by round-tripping through their codecs, filtered,
//! reindexed so every reference points into the filtered tables, and written in
//! two passes (header and tables first, bodies second, then a seek-back rewrite
//! of the export table and header once real offsets are known).
//!
//! The pipeline is a linear, non-reentrant state machine:
//!
//! ```text
//! Built -> Filtered -> Reindexed -> HeaderWritten -> TablesWritten -> BodiesWritten -> Finalized
//! ```
//!
//! The filter phase is the only place where silently dropping data is policy
//! rather than error; every drop is logged. Any failure after filtering is
//! fatal to the export.

use std::sync::Arc;

use bitflags::bitflags;
use tracing::{debug, warn};

use crate::{
    file::{Parser, Writer},
    objects::{registry::ObjectCodecRegistry, ObjectKind, UObjectRc},
    upk::{
        cache::ImportResolver,
        export::ObjectExport,
        import::ObjectImport,
        index::{IndexTag, ObjectIndex},
        name::{FName, NameTable},
        package::{Package, Row},
        summary::FileSummary,
        tables::{RowCodec, Table},
    },
    Error::ObjectNotMaterialized,
    Result,
};

/// Engine version stamped into every exported container.
pub const EXPORT_ENGINE_VERSION: u32 = 12791;

/// Object flag marking an export that carries a state stack; such exports keep
/// their source object's flags verbatim instead of the rewritten value.
pub const OBJECT_FLAG_HAS_STACK: u64 = 0x0000_0000_0200_0000;

/// Object flags written onto package exports.
pub const PACKAGE_OBJECT_FLAGS: u64 = 0x0007_0004_0000_0000;

/// Object flags written onto shared-resource exports.
pub const RESOURCE_OBJECT_FLAGS: u64 = 0x000F_0004_0000_0000;

/// Object flags written onto every other export.
pub const DEFAULT_OBJECT_FLAGS: u64 = 0x000F_0004_0000_0400;

bitflags! {
    /// Package flags word of the container header and package-like export rows.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct PackageFlags: u32 {
        /// Container may be sent to clients
        const ALLOW_DOWNLOAD = 0x0000_0001;
        /// Container is optional on clients
        const CLIENT_OPTIONAL = 0x0000_0002;
        /// Container only exists server side
        const SERVER_SIDE_ONLY = 0x0000_0004;
        /// Container went through the cooker
        const COOKED = 0x0000_0008;
    }
}

/// The linear phases of the export pipeline.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExportPhase {
    /// Tables cloned from the source, nothing dropped yet
    Built,
    /// Tables filtered; augmentation is allowed now
    Filtered,
    /// References rewritten into the filtered tables
    Reindexed,
    /// Header emitted with placeholder offsets
    HeaderWritten,
    /// Name/import/export/depends tables emitted
    TablesWritten,
    /// Object bodies emitted, real offsets known
    BodiesWritten,
    /// Export table and header rewritten in place; output complete
    Finalized,
}

/// Where an output row came from.
#[derive(Clone, Copy, Debug)]
enum RowOrigin {
    /// Cloned from the source package at this original index
    Source(ObjectIndex),
    /// Inserted by post-filter augmentation; references already final
    Augmented,
}

/// Body output stream handed to class codecs.
///
/// Names and object references written through this stream are routed through
/// the exporter's tables, so references inside re-emitted bodies point at the
/// *new* indices rather than the source package's.
pub struct BodyWriter<'a> {
    out: &'a mut Writer,
    names: &'a mut NameTable,
    remap: &'a dyn Fn(ObjectIndex) -> ObjectIndex,
}

impl BodyWriter<'_> {
    /// Current output position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.out.pos()
    }

    /// Emit raw bytes
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_bytes(bytes)
    }

    /// Emit a little-endian primitive
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_le<T: crate::file::io::SerialIO>(&mut self, value: T) -> Result<()> {
        self.out.write_le(value)
    }

    /// Emit a name, interning it into the exporter's name table
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_fname(&mut self, text: &str) -> Result<()> {
        let name = self.names.intern(text);
        name.write(self.out)
    }

    /// Emit an object reference, rewritten from source-table space into the
    /// exporter's filtered tables
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_index(&mut self, old: ObjectIndex) -> Result<()> {
        (self.remap)(old).write(self.out)
    }
}

/// Builds a filtered, reindexed copy of a source package and writes it out.
///
/// The source package must have been loaded (materialized) first: the filter
/// keeps only imports whose resolved objects exist, and reindexing looks up
/// target objects by identity.
///
/// # Examples
///
/// ```rust,ignore
/// let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
/// let bytes = exporter.export_to_bytes()?;
/// std::fs::write("Slimmed.upk", bytes)?;
/// ```
pub struct PackageExporter<'a> {
    source: &'a Package,
    cache: &'a dyn ImportResolver,
    registry: &'a ObjectCodecRegistry,
    phase: ExportPhase,

    summary: FileSummary,
    names: NameTable,
    imports: Vec<ObjectImport>,
    import_objects: Vec<UObjectRc>,
    import_origins: Vec<RowOrigin>,
    exports: Vec<ObjectExport>,
    export_objects: Vec<Option<UObjectRc>>,
    export_origins: Vec<RowOrigin>,

    writer: Writer,
}

impl<'a> PackageExporter<'a> {
    /// Clone the source header and tables by round-tripping them through their
    /// codecs, so the working copy is fully decoupled from the source.
    ///
    /// # Errors
    /// Propagates codec failures from the round trip
    pub fn new(
        source: &'a Package,
        cache: &'a dyn ImportResolver,
        registry: &'a ObjectCodecRegistry,
    ) -> Result<Self> {
        let mut clone = Writer::new();
        source.summary().write(&mut clone)?;
        source.names().write(&mut clone)?;
        source.imports().write(&mut clone)?;
        source.exports().write(&mut clone)?;

        let mut parser = Parser::new(clone.as_slice());
        let summary = FileSummary::read(&mut parser)?;
        let names = NameTable::read(&mut parser, source.names().len())?;
        let imports = Table::<ObjectImport>::read(&mut parser, source.imports().len())?;
        let exports = Table::<ObjectExport>::read(&mut parser, source.exports().len())?;

        Ok(PackageExporter {
            source,
            cache,
            registry,
            phase: ExportPhase::Built,
            summary,
            names,
            imports: imports.iter().cloned().collect(),
            import_objects: Vec::new(),
            import_origins: Vec::new(),
            exports: exports.iter().cloned().collect(),
            export_objects: Vec::new(),
            export_origins: Vec::new(),
            writer: Writer::new(),
        })
    }

    /// The phase the pipeline is currently in
    #[must_use]
    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// The filtered import rows
    #[must_use]
    pub fn imports(&self) -> &[ObjectImport] {
        &self.imports
    }

    /// The filtered export rows
    #[must_use]
    pub fn exports(&self) -> &[ObjectExport] {
        &self.exports
    }

    /// The exporter's name table
    #[must_use]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    fn expect_phase(&self, expected: ExportPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(crate::Error::Error(format!(
                "Exporter is in phase {:?}, expected {:?}",
                self.phase, expected
            )))
        }
    }

    /// Drop rows the output must not carry.
    ///
    /// Imports lose all-`None` placeholder rows, rows whose resolved object was
    /// never materialized, and internal rows that resolve back into this
    /// package. Exports lose zero-size bodies; if a world export is present, it
    /// and every export nested under it are removed (map slimming). Dropping
    /// here is policy, not error; each drop is logged.
    ///
    /// # Errors
    /// Propagates name lookups on malformed rows
    pub fn filter(&mut self) -> Result<()> {
        self.expect_phase(ExportPhase::Built)?;

        let source_name = self.source.name().to_string();

        let mut imports = Vec::new();
        let mut import_objects = Vec::new();
        let mut import_origins = Vec::new();

        for (row_index, row) in self.imports.iter().enumerate() {
            let old = ObjectIndex::from_import(row_index);

            if row.is_none_row(&self.names)? {
                debug!(package = %source_name, row = row_index, "dropping placeholder import");
                continue;
            }

            let Some(object) = self.source.object_at(old) else {
                debug!(
                    package = %source_name,
                    row = row_index,
                    "dropping import with no resolved object"
                );
                continue;
            };

            // An import whose resolved object sits under an export of this very
            // package is a self-reference through the import table. Dropped, not
            // repaired; flagged so the loss is visible.
            if object.is_in_package(&source_name) && object.outer.tag() == IndexTag::Export {
                warn!(
                    package = %source_name,
                    object = %object.full_name,
                    "dropping internal import; references to it will null out"
                );
                continue;
            }

            imports.push(row.clone());
            import_objects.push(object);
            import_origins.push(RowOrigin::Source(old));
        }

        // Map slimming: find world exports, then poison every export whose
        // outer chain passes through one.
        let mut dropped = vec![false; self.exports.len()];
        for (row_index, row) in self.exports.iter().enumerate() {
            if self.kind_of_source_row(row)? == ObjectKind::World {
                dropped[row_index] = true;
            }
        }
        for row_index in 0..self.exports.len() {
            if dropped[row_index] {
                continue;
            }

            let mut outer = self.exports[row_index].outer_ref;
            for _ in 0..self.exports.len() {
                let Ok(outer_row) = outer.as_export() else {
                    break;
                };
                if dropped[outer_row] {
                    dropped[row_index] = true;
                    break;
                }
                match self.exports.get(outer_row) {
                    Some(row) => outer = row.outer_ref,
                    None => break,
                }
            }
        }

        let mut exports = Vec::new();
        let mut export_objects = Vec::new();
        let mut export_origins = Vec::new();

        for (row_index, row) in self.exports.iter().enumerate() {
            let old = ObjectIndex::from_export(row_index);

            if row.serial_size == 0 {
                debug!(package = %source_name, row = row_index, "dropping bodiless export");
                continue;
            }
            if dropped[row_index] {
                debug!(package = %source_name, row = row_index, "dropping world-nested export");
                continue;
            }

            exports.push(row.clone());
            export_objects.push(self.source.object_at(old));
            export_origins.push(RowOrigin::Source(old));
        }

        debug!(
            package = %source_name,
            imports = imports.len(),
            exports = exports.len(),
            "filtered tables"
        );

        self.imports = imports;
        self.import_objects = import_objects;
        self.import_origins = import_origins;
        self.exports = exports;
        self.export_objects = export_objects;
        self.export_origins = export_origins;
        self.phase = ExportPhase::Filtered;
        Ok(())
    }

    /// Intern a name into the exporter's table, for augmentation rows
    pub fn intern_name(&mut self, text: &str) -> FName {
        self.names.intern(text)
    }

    /// Insert an export row after filtering (e.g. a dummy material node).
    ///
    /// The row's references must already point into the exporter's tables; the
    /// reindex pass leaves augmented rows untouched. Returns the new row index.
    ///
    /// # Errors
    /// Returns an error outside the `Filtered` phase
    pub fn add_export(&mut self, row: ObjectExport, object: UObjectRc) -> Result<usize> {
        self.expect_phase(ExportPhase::Filtered)?;

        self.exports.push(row);
        self.export_objects.push(Some(object));
        self.export_origins.push(RowOrigin::Augmented);
        Ok(self.exports.len() - 1)
    }

    /// Insert an import row after filtering.
    ///
    /// # Errors
    /// Returns an error outside the `Filtered` phase
    pub fn add_import(&mut self, row: ObjectImport, object: UObjectRc) -> Result<usize> {
        self.expect_phase(ExportPhase::Filtered)?;

        self.imports.push(row);
        self.import_objects.push(object);
        self.import_origins.push(RowOrigin::Augmented);
        Ok(self.imports.len() - 1)
    }

    /// Rewrite the header for standalone consumption, rewrite export flags by
    /// object kind, and reindex every reference into the filtered tables.
    ///
    /// # Errors
    /// Propagates row lookups on malformed source rows
    pub fn reindex(&mut self) -> Result<()> {
        self.expect_phase(ExportPhase::Filtered)?;

        // Header: strip cook provenance, stamp the canonical engine version,
        // mark the container downloadable.
        self.summary.licensee_version = 0;
        self.summary.cooker_version = 0;
        self.summary.engine_version = EXPORT_ENGINE_VERSION;
        self.summary.package_flags = PackageFlags::ALLOW_DOWNLOAD.bits();
        self.summary.additional_packages_to_cook.clear();
        self.summary.texture_allocations.clear();
        self.summary.thumbnail_offset = 0;

        // Export flags by object kind.
        for row_index in 0..self.exports.len() {
            let kind = match &self.export_objects[row_index] {
                Some(object) => object.kind,
                None => self.kind_of_source_row(&self.exports[row_index])?,
            };

            let (object_flags, package_flags) = match kind {
                ObjectKind::Package => {
                    (PACKAGE_OBJECT_FLAGS, PackageFlags::ALLOW_DOWNLOAD.bits())
                }
                kind if kind.is_resource() => (RESOURCE_OBJECT_FLAGS, 0),
                _ => (DEFAULT_OBJECT_FLAGS, 0),
            };

            let row = &mut self.exports[row_index];
            row.object_flags = object_flags;
            row.package_flags = package_flags;
        }

        // References: every kept row still carries source-table indices; chase
        // each one to its object and look the object up in the new tables.
        for row_index in 0..self.imports.len() {
            if let RowOrigin::Source(_) = self.import_origins[row_index] {
                let outer = self.imports[row_index].outer;
                self.imports[row_index].outer = self.remap(outer);
            }
        }

        for row_index in 0..self.exports.len() {
            let RowOrigin::Source(_) = self.export_origins[row_index] else {
                continue;
            };

            let row = &self.exports[row_index];
            let (outer_ref, class_ref, super_ref, archetype_ref) = (
                self.remap(row.outer_ref),
                self.remap(row.class_ref),
                self.remap(row.super_ref),
                self.remap(row.archetype_ref),
            );

            let row = &mut self.exports[row_index];
            row.outer_ref = outer_ref;
            row.class_ref = class_ref;
            row.super_ref = super_ref;
            row.archetype_ref = archetype_ref;
        }

        self.phase = ExportPhase::Reindexed;
        Ok(())
    }

    /// Find the new index of a materialized object in the filtered tables.
    ///
    /// Exports are searched first (positive index), then imports (negative);
    /// objects in neither table yield the null reference.
    #[must_use]
    pub fn find_object_index(&self, object: &UObjectRc) -> ObjectIndex {
        find_in_tables(&self.export_objects, &self.import_objects, object)
    }

    /// Rewrite one source-space reference into the filtered tables.
    fn remap(&self, old: ObjectIndex) -> ObjectIndex {
        remap_reference(
            self.source,
            &self.export_objects,
            &self.import_objects,
            old,
        )
    }

    /// Classify a row by its class name in the source package.
    fn kind_of_source_row(&self, row: &ObjectExport) -> Result<ObjectKind> {
        if row.class_ref.is_null() {
            return Ok(ObjectKind::Class);
        }
        Ok(ObjectKind::from_class_name(
            &self.source.row_name_of(row.class_ref)?,
        ))
    }

    /// First pass, step one: serialize the header at offset 0 with the offsets
    /// it currently holds; they are patched in [`PackageExporter::finalize`].
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_header(&mut self) -> Result<()> {
        self.expect_phase(ExportPhase::Reindexed)?;

        self.summary.write(&mut self.writer)?;
        self.phase = ExportPhase::HeaderWritten;
        Ok(())
    }

    /// First pass, step two: emit names, imports, exports and the dummy depends
    /// table, recording real offsets and counts into the header copy.
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn write_tables(&mut self) -> Result<()> {
        self.expect_phase(ExportPhase::HeaderWritten)?;

        self.summary.name_offset = self.writer.pos() as i32;
        self.summary.name_count = self.names.len() as i32;
        self.names.write(&mut self.writer)?;

        self.summary.import_offset = self.writer.pos() as i32;
        self.summary.import_count = self.imports.len() as i32;
        for row in &self.imports {
            row.write_row(&mut self.writer)?;
        }

        self.summary.export_offset = self.writer.pos() as i32;
        self.summary.export_count = self.exports.len() as i32;
        for row in &self.exports {
            row.write_row(&mut self.writer)?;
        }

        // The depends table is emitted as zeros; real depends data is not
        // produced by this pipeline.
        self.summary.depends_offset = self.writer.pos() as i32;
        for _ in 0..self.exports.len() {
            self.writer.write_le::<i32>(0)?;
        }

        self.summary.thumbnail_offset = 0;
        self.summary.total_header_size = self.writer.pos() as i32;
        self.phase = ExportPhase::TablesWritten;
        Ok(())
    }

    /// Second pass: emit every export body in table order, recording each row's
    /// final `serial_offset`/`serial_size`.
    ///
    /// Objects not yet materialized are materialized here; exports flagged as
    /// carrying a state stack keep their source object's flags.
    ///
    /// # Errors
    /// Returns [`ObjectNotMaterialized`] for augmented rows without a payload
    /// source and propagates codec and stream failures
    pub fn write_bodies(&mut self) -> Result<()> {
        self.expect_phase(ExportPhase::TablesWritten)?;

        for row_index in 0..self.exports.len() {
            if self.export_objects[row_index].is_none() {
                match self.export_origins[row_index] {
                    RowOrigin::Source(old) => {
                        let object = self.source.create_object(old, self.cache, self.registry)?;
                        self.export_objects[row_index] = Some(object);
                    }
                    RowOrigin::Augmented => {
                        return Err(ObjectNotMaterialized(format!(
                            "augmented export row {row_index}"
                        )))
                    }
                }
            }
        }

        for row_index in 0..self.exports.len() {
            let object = self.export_objects[row_index]
                .clone()
                .expect("materialized above");

            let chain = match self.export_origins[row_index] {
                RowOrigin::Source(old) => match self.source.get_row(old) {
                    Row::Export(source_row) => self.source.class_chain_of(source_row)?,
                    _ => vec![object.class_name.clone()],
                },
                RowOrigin::Augmented => vec![object.class_name.clone()],
            };
            let codec = self.registry.resolve(&chain);

            if object.flags & OBJECT_FLAG_HAS_STACK != 0 {
                self.exports[row_index].object_flags = object.flags;
            }

            let offset = self.writer.pos();
            {
                let (writer, names, source, export_objects, import_objects) = (
                    &mut self.writer,
                    &mut self.names,
                    self.source,
                    &self.export_objects,
                    &self.import_objects,
                );
                let remap = |old: ObjectIndex| {
                    remap_reference(source, export_objects, import_objects, old)
                };
                let mut body = BodyWriter {
                    out: writer,
                    names,
                    remap: &remap,
                };
                codec.write_body(&object, &mut body)?;
            }

            let row = &mut self.exports[row_index];
            row.serial_offset = offset as i32;
            row.serial_size = (self.writer.pos() - offset) as i32;
        }

        self.phase = ExportPhase::BodiesWritten;
        Ok(())
    }

    /// Seek back and rewrite the export table (now with final offsets and
    /// sizes) and the header, then hand the finished stream over.
    ///
    /// # Errors
    /// Propagates stream failures
    pub fn finalize(mut self) -> Result<Writer> {
        self.expect_phase(ExportPhase::BodiesWritten)?;

        let end = self.writer.len();

        self.writer.seek(self.summary.export_offset as usize)?;
        for row in &self.exports {
            row.write_row(&mut self.writer)?;
        }

        self.writer.seek(0)?;
        self.summary.write(&mut self.writer)?;

        self.writer.seek(end)?;
        self.phase = ExportPhase::Finalized;
        Ok(self.writer)
    }

    /// Run every remaining phase and return the finished container bytes.
    ///
    /// # Errors
    /// Propagates the first phase failure
    pub fn export_to_bytes(mut self) -> Result<Vec<u8>> {
        if self.phase == ExportPhase::Built {
            self.filter()?;
        }
        if self.phase == ExportPhase::Filtered {
            self.reindex()?;
        }
        if self.phase == ExportPhase::Reindexed {
            self.write_header()?;
        }
        if self.phase == ExportPhase::HeaderWritten {
            self.write_tables()?;
        }
        if self.phase == ExportPhase::TablesWritten {
            self.write_bodies()?;
        }
        Ok(self.finalize()?.into_bytes())
    }
}

/// Chase a source-space reference to its materialized object and find its new
/// index; unresolvable references null out, loudly.
fn remap_reference(
    source: &Package,
    exports: &[Option<UObjectRc>],
    imports: &[UObjectRc],
    old: ObjectIndex,
) -> ObjectIndex {
    if old.is_null() {
        return ObjectIndex::null();
    }

    let Some(object) = source.object_at(old) else {
        warn!(
            package = source.name(),
            reference = %old,
            "reference target was never materialized; nulling out"
        );
        return ObjectIndex::null();
    };

    let new_index = find_in_tables(exports, imports, &object);
    if new_index.is_null() {
        warn!(
            package = source.name(),
            object = %object.full_name,
            "reference target was filtered out; nulling out"
        );
    }
    new_index
}

/// Identity search over the filtered tables: exports first, then imports.
fn find_in_tables(
    exports: &[Option<UObjectRc>],
    imports: &[UObjectRc],
    object: &UObjectRc,
) -> ObjectIndex {
    for (row, candidate) in exports.iter().enumerate() {
        if let Some(candidate) = candidate {
            if Arc::ptr_eq(candidate, object) {
                return ObjectIndex::from_export(row);
            }
        }
    }

    for (row, candidate) in imports.iter().enumerate() {
        if Arc::ptr_eq(candidate, object) {
            return ObjectIndex::from_import(row);
        }
    }

    ObjectIndex::null()
}
