//! The decoded in-memory representation of one container.
//!
//! [`Package`] owns the header, name table, import and export tables, the raw
//! stream (for lazy body reads), the per-package native class registry, and the
//! map of materialized objects. Decoding parses the header and tables and leaves
//! every body unread; materialization happens row by row, in dependency order,
//! under the loader's control.

use std::{path::Path, sync::Arc};

use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use tracing::debug;

use crate::{
    file::{File, Parser},
    objects::{
        registry::ObjectCodecRegistry, NativeClass, NativeClassRc, ObjectBody, ObjectKind,
        UObject, UObjectRc,
    },
    upk::{
        cache::ImportResolver,
        export::ObjectExport,
        import::ObjectImport,
        index::{IndexTag, ObjectIndex},
        name::{FName, NameTable},
        summary::FileSummary,
        tables::Table,
    },
    Error::{ObjectNotMaterialized, UnresolvedImport, UnresolvedPackage},
    Result,
};

/// The distinguished class name used when `class_ref` is null.
pub const CLASS_OF_CLASSES: &str = "Class";

/// A reference to a shared package
pub type PackageRc = Arc<Package>;

/// Row dispatch result of [`Package::get_row`].
#[derive(Clone, Copy, Debug)]
pub enum Row<'a> {
    /// The index referred to an import row
    Import(&'a ObjectImport),
    /// The index referred to an export row
    Export(&'a ObjectExport),
    /// The index was null or out of range
    None,
}

/// Where an import row resolves to, across package boundaries.
#[derive(Clone, Debug)]
pub enum ResolvedImport {
    /// The import matched an export of the target package
    Export {
        /// Target package name
        package: String,
        /// Export reference within the target package
        index: ObjectIndex,
    },
    /// The import matched an import of the target package
    Import {
        /// Target package name
        package: String,
        /// Import reference within the target package
        index: ObjectIndex,
    },
    /// The import matched a native class of the target package
    Native {
        /// Target package name
        package: String,
        /// The synthesized class
        class: NativeClassRc,
    },
    /// The import is a top-level reference to the target package itself
    Package(String),
}

/// One decoded container.
///
/// The tables are immutable once decoded; the object map and the native class
/// registry use interior mutability so materialization and registration work
/// through shared references, which is how the cache hands packages out.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::upk::package::Package;
/// use std::path::Path;
///
/// let package = Package::from_file(Path::new("CoreAssets.upk"), "CoreAssets")?;
/// println!(
///     "{}: {} names, {} imports, {} exports",
///     package.name(),
///     package.names().len(),
///     package.imports().len(),
///     package.exports().len(),
/// );
/// # Ok::<(), upkscope::Error>(())
/// ```
pub struct Package {
    name: Arc<str>,
    summary: FileSummary,
    names: NameTable,
    imports: Table<ObjectImport>,
    exports: Table<ObjectExport>,
    data: File,
    objects: SkipMap<ObjectIndex, UObjectRc>,
    native_classes: DashMap<String, NativeClassRc>,
}

impl Package {
    /// Decode a container from an input stream.
    ///
    /// Parses the header, name table, import table and export table; object
    /// bodies stay unread until materialization.
    ///
    /// ## Arguments
    /// * 'data' - The plaintext container stream
    /// * 'name' - The name this package is known by (cache key)
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for header violations,
    /// [`crate::Error::TruncatedTable`] when a table extends past the stream, and
    /// [`crate::Error::BadNameReference`] when a row references a missing name
    pub fn decode(data: File, name: &str) -> Result<Package> {
        let mut parser = Parser::new(data.data());
        let summary = FileSummary::read(&mut parser)?;

        if parser.seek(summary.name_offset as usize).is_err() {
            return Err(malformed_error!(
                "Name table offset {} is outside the stream",
                summary.name_offset
            ));
        }
        let names = NameTable::read(&mut parser, summary.name_count as usize)?;

        if parser.seek(summary.import_offset as usize).is_err() {
            return Err(malformed_error!(
                "Import table offset {} is outside the stream",
                summary.import_offset
            ));
        }
        let imports = Table::<ObjectImport>::read(&mut parser, summary.import_count as usize)?;

        if parser.seek(summary.export_offset as usize).is_err() {
            return Err(malformed_error!(
                "Export table offset {} is outside the stream",
                summary.export_offset
            ));
        }
        let exports = Table::<ObjectExport>::read(&mut parser, summary.export_count as usize)?;

        let package = Package {
            name: Arc::from(name),
            summary,
            names,
            imports,
            exports,
            data,
            objects: SkipMap::new(),
            native_classes: DashMap::new(),
        };
        package.validate_rows()?;

        debug!(
            package = name,
            names = package.names.len(),
            imports = package.imports.len(),
            exports = package.exports.len(),
            "decoded container"
        );
        Ok(package)
    }

    /// Decode a container from a file on disk
    ///
    /// # Errors
    /// Returns I/O errors from mapping the file and every error [`Package::decode`] returns
    pub fn from_file(path: &Path, name: &str) -> Result<Package> {
        Package::decode(File::from_file(path)?, name)
    }

    /// Decode a container from an owned buffer
    ///
    /// # Errors
    /// Returns every error [`Package::decode`] returns
    pub fn from_mem(data: Vec<u8>, name: &str) -> Result<Package> {
        Package::decode(File::from_mem(data)?, name)
    }

    /// Check the structural invariants the tables must uphold: every name id
    /// resolves, and every non-null reference points at a row that exists.
    fn validate_rows(&self) -> Result<()> {
        for row in &self.imports {
            self.names.lookup(row.class_package.index)?;
            self.names.lookup(row.class_name.index)?;
            self.names.lookup(row.object_name.index)?;

            if !row.outer.is_null() && matches!(self.get_row(row.outer), Row::None) {
                return Err(malformed_error!(
                    "Import outer {} points at a missing row",
                    row.outer
                ));
            }
        }

        for row in &self.exports {
            self.names.lookup(row.object_name.index)?;

            for reference in [row.class_ref, row.super_ref, row.outer_ref, row.archetype_ref] {
                if !reference.is_null() && matches!(self.get_row(reference), Row::None) {
                    return Err(malformed_error!(
                        "Export reference {} points at a missing row",
                        reference
                    ));
                }
            }
        }

        Ok(())
    }

    /// The name this package is known by
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the package name, for graph nodes and objects
    #[must_use]
    pub fn name_handle(&self) -> Arc<str> {
        self.name.clone()
    }

    /// The decoded header
    #[must_use]
    pub fn summary(&self) -> &FileSummary {
        &self.summary
    }

    /// The name table
    #[must_use]
    pub fn names(&self) -> &NameTable {
        &self.names
    }

    /// The import table
    #[must_use]
    pub fn imports(&self) -> &Table<ObjectImport> {
        &self.imports
    }

    /// The export table
    #[must_use]
    pub fn exports(&self) -> &Table<ObjectExport> {
        &self.exports
    }

    /// Dispatch an index to the row it refers to; constant time.
    #[must_use]
    pub fn get_row(&self, index: ObjectIndex) -> Row<'_> {
        match index.tag() {
            IndexTag::Null => Row::None,
            IndexTag::Import => match index
                .as_import()
                .ok()
                .and_then(|row| self.imports.get(row))
            {
                Some(row) => Row::Import(row),
                None => Row::None,
            },
            IndexTag::Export => match index
                .as_export()
                .ok()
                .and_then(|row| self.exports.get(row))
            {
                Some(row) => Row::Export(row),
                None => Row::None,
            },
        }
    }

    /// Resolve a name reference to its text
    ///
    /// # Errors
    /// Returns [`crate::Error::BadNameReference`] when the id is not in the name table
    pub fn name_of(&self, name: FName) -> Result<String> {
        self.names.text_of(name)
    }

    /// The bare object name of the row `index` refers to
    ///
    /// # Errors
    /// Returns an error when the index does not refer to a row
    pub fn row_name_of(&self, index: ObjectIndex) -> Result<String> {
        match self.get_row(index) {
            Row::Import(row) => self.name_of(row.object_name),
            Row::Export(row) => self.name_of(row.object_name),
            Row::None => Err(crate::Error::Error(format!(
                "Index {index} of package {} does not refer to a row",
                self.name
            ))),
        }
    }

    /// The dot-joined full name of the row `index` refers to.
    ///
    /// Joins the row's name with the chain of outer names. For imports the chain
    /// walks the import table up to the top-level package reference; for exports
    /// it stays within the export table.
    ///
    /// # Errors
    /// Returns an error when the index does not refer to a row, a name id is
    /// missing, or the outer chain does not terminate
    pub fn full_name_of(&self, index: ObjectIndex) -> Result<String> {
        let mut segments = Vec::new();
        let mut current = index;

        // A well-formed outer chain is shorter than the two tables combined;
        // anything longer is a cycle in malformed input.
        let limit = self.imports.len() + self.exports.len() + 1;

        for _ in 0..limit {
            match self.get_row(current) {
                Row::Import(row) => {
                    segments.push(self.name_of(row.object_name)?);
                    current = row.outer;
                }
                Row::Export(row) => {
                    segments.push(self.name_of(row.object_name)?);
                    current = row.outer_ref;
                }
                Row::None => {
                    if current.is_null() && !segments.is_empty() {
                        segments.reverse();
                        return Ok(segments.join("."));
                    }
                    return Err(crate::Error::Error(format!(
                        "Index {index} of package {} does not refer to a row",
                        self.name
                    )));
                }
            }
        }

        Err(crate::Error::GraphError(format!(
            "Outer chain of {index} in package {} does not terminate",
            self.name
        )))
    }

    /// The top-level package import at the root of an import row's outer chain.
    ///
    /// For a row that is itself a top-level package reference, this is the row.
    ///
    /// # Errors
    /// Returns an error when the chain leaves the import table or does not terminate
    pub fn import_package_of(&self, import_row: usize) -> Result<&ObjectImport> {
        let mut current = import_row;
        let limit = self.imports.len() + 1;

        for _ in 0..limit {
            let Some(row) = self.imports.get(current) else {
                return Err(malformed_error!(
                    "Import outer chain of row {} leaves the import table",
                    import_row
                ));
            };

            if row.outer.is_null() {
                return Ok(row);
            }
            current = row.outer.as_import()?;
        }

        Err(crate::Error::GraphError(format!(
            "Import outer chain of row {import_row} in package {} does not terminate",
            self.name
        )))
    }

    /// Is-native test: the import's top-level package self-identifies as this
    /// package, meaning the class is synthesized natively and has no row elsewhere.
    ///
    /// # Errors
    /// Propagates chain-walking and name lookup failures
    pub fn is_native_import(&self, import_row: usize) -> Result<bool> {
        let package = self.import_package_of(import_row)?;
        Ok(self.name_of(package.object_name)? == self.name.as_ref())
    }

    /// Returns a native class registered for this package, if any
    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<NativeClassRc> {
        self.native_classes
            .get(name)
            .map(|entry| entry.value().clone())
    }

    /// Register a native class for this package
    pub fn register_native_class(&self, class: NativeClass) {
        self.native_classes
            .insert(class.name.clone(), Arc::new(class));
    }

    /// Resolve an import row to the object it references in its target package.
    ///
    /// The target package name comes from the top of the row's outer chain. The
    /// target's exports are searched by leaf name and package-local full name,
    /// then its imports by leaf name and full name, then its native classes by
    /// leaf name. Searches are linear by specification.
    ///
    /// ## Arguments
    /// * 'import_row' - The import row to resolve
    /// * 'resolver'   - The authority for crossing package boundaries
    ///
    /// # Errors
    /// Returns [`UnresolvedPackage`] when the target package cannot be produced
    /// and [`UnresolvedImport`] when no candidate matches
    pub fn resolve_import(
        &self,
        import_row: usize,
        resolver: &dyn ImportResolver,
    ) -> Result<ResolvedImport> {
        let Some(row) = self.imports.get(import_row) else {
            return Err(crate::Error::Error(format!(
                "Import row {import_row} is not present in package {}",
                self.name
            )));
        };

        if row.is_package() {
            let target = self.name_of(row.object_name)?;
            if resolver.resolve(&target).is_none() {
                return Err(UnresolvedPackage(target));
            }
            return Ok(ResolvedImport::Package(target));
        }

        let target_name = self.name_of(self.import_package_of(import_row)?.object_name)?;
        let Some(target) = resolver.resolve(&target_name) else {
            return Err(UnresolvedPackage(target_name));
        };

        let full_name = self.full_name_of(ObjectIndex::from_import(import_row))?;
        let leaf = full_name
            .rsplit('.')
            .next()
            .unwrap_or(full_name.as_str())
            .to_string();

        // Exports carry package-local full names, so the target package prefix
        // is stripped from the wanted name before comparing.
        if let Some(local_name) = full_name.strip_prefix(&format!("{target_name}.")) {
            for (k, candidate) in target.exports().iter().enumerate() {
                if target.name_of(candidate.object_name)? == leaf
                    && target.full_name_of(ObjectIndex::from_export(k))? == local_name
                {
                    return Ok(ResolvedImport::Export {
                        package: target_name,
                        index: ObjectIndex::from_export(k),
                    });
                }
            }
        }

        for (k, candidate) in target.imports().iter().enumerate() {
            if target.name_of(candidate.object_name)? == leaf
                && target.full_name_of(ObjectIndex::from_import(k))? == full_name
            {
                return Ok(ResolvedImport::Import {
                    package: target_name,
                    index: ObjectIndex::from_import(k),
                });
            }
        }

        if let Some(class) = target.find_class(&leaf) {
            return Ok(ResolvedImport::Native {
                package: target_name,
                class,
            });
        }

        Err(UnresolvedImport(full_name))
    }

    /// The byte range of an export's serialized body
    ///
    /// # Errors
    /// Returns an error when the row is missing or the range leaves the stream
    pub fn body_bytes(&self, export_row: usize) -> Result<&[u8]> {
        let Some(row) = self.exports.get(export_row) else {
            return Err(crate::Error::Error(format!(
                "Export row {export_row} is not present in package {}",
                self.name
            )));
        };

        if row.serial_size < 0 || row.serial_offset < 0 {
            return Err(malformed_error!(
                "Export row {} has a negative body range",
                export_row
            ));
        }
        if row.serial_size == 0 {
            return Ok(&[]);
        }

        self.data
            .data_slice(row.serial_offset as usize, row.serial_size as usize)
    }

    /// The materialized object for `index`, if any
    #[must_use]
    pub fn object_at(&self, index: ObjectIndex) -> Option<UObjectRc> {
        self.objects.get(&index).map(|entry| entry.value().clone())
    }

    /// Number of materialized objects
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The class-name chain of an export's class, most specific first.
    ///
    /// Starts at the class the row references (or the distinguished `Class` for
    /// null) and follows `super_ref` edges while they stay within the export
    /// table. Used to pick the most specific registered body codec.
    ///
    /// # Errors
    /// Propagates row and name lookup failures
    pub fn class_chain_of(&self, export: &ObjectExport) -> Result<Vec<String>> {
        let mut chain = Vec::new();
        let mut current = export.class_ref;
        let limit = self.imports.len() + self.exports.len() + 1;

        for _ in 0..limit {
            match self.get_row(current) {
                Row::None => {
                    if chain.is_empty() {
                        chain.push(CLASS_OF_CLASSES.to_string());
                    }
                    return Ok(chain);
                }
                Row::Import(row) => {
                    chain.push(self.name_of(row.object_name)?);
                    return Ok(chain);
                }
                Row::Export(row) => {
                    chain.push(self.name_of(row.object_name)?);
                    current = row.super_ref;
                }
            }
        }

        Err(crate::Error::GraphError(format!(
            "Super chain in package {} does not terminate",
            self.name
        )))
    }

    /// Materialize the object a row refers to, if not already materialized.
    ///
    /// Export rows decode their body range through the most specific registered
    /// codec; import rows alias the object they resolve to ("import wrapping"),
    /// or synthesize a class-kind wrapper for native resolutions. Precondition:
    /// every dependency of this row has been materialized, which the loader
    /// guarantees by materializing in topological order.
    ///
    /// ## Arguments
    /// * 'index'    - The row to materialize
    /// * 'resolver' - The authority for crossing package boundaries
    /// * 'registry' - Per-class body codecs
    ///
    /// # Errors
    /// Returns [`ObjectNotMaterialized`] when an aliased target is missing, and
    /// propagates resolution and codec failures; failure is fatal to the load
    pub fn create_object(
        &self,
        index: ObjectIndex,
        resolver: &dyn ImportResolver,
        registry: &ObjectCodecRegistry,
    ) -> Result<UObjectRc> {
        if let Some(existing) = self.object_at(index) {
            return Ok(existing);
        }

        let object = match self.get_row(index) {
            Row::None => {
                return Err(crate::Error::Error(format!(
                    "Index {index} of package {} does not refer to a row",
                    self.name
                )))
            }
            Row::Export(row) => {
                let class_name = if row.class_ref.is_null() {
                    CLASS_OF_CLASSES.to_string()
                } else {
                    self.row_name_of(row.class_ref)?
                };
                let chain = self.class_chain_of(row)?;
                let codec = registry.resolve(&chain);
                let body = codec.read_body(row, self.body_bytes(index.as_export()?)?)?;

                Arc::new(UObject {
                    package: self.name_handle(),
                    index,
                    name: self.name_of(row.object_name)?,
                    full_name: self.full_name_of(index)?,
                    class_name: class_name.clone(),
                    kind: ObjectKind::from_class_name(&class_name),
                    outer: row.outer_ref,
                    archetype: row.archetype_ref,
                    flags: row.object_flags,
                    body,
                })
            }
            Row::Import(row) => {
                let import_row = index.as_import()?;
                if self.is_native_import(import_row)? {
                    self.synthesize_class_wrapper(index, self.name_of(row.object_name)?)?
                } else {
                    match self.resolve_import(import_row, resolver)? {
                        ResolvedImport::Export { package, index: target } => {
                            self.alias_remote(resolver, &package, target)?
                        }
                        ResolvedImport::Import { package, index: target } => {
                            self.alias_remote(resolver, &package, target)?
                        }
                        ResolvedImport::Native { class, .. } => {
                            self.synthesize_class_wrapper(index, class.name.clone())?
                        }
                        ResolvedImport::Package(package) => Arc::new(UObject {
                            package: self.name_handle(),
                            index,
                            name: package.clone(),
                            full_name: package,
                            class_name: "Package".to_string(),
                            kind: ObjectKind::Package,
                            outer: ObjectIndex::null(),
                            archetype: ObjectIndex::null(),
                            flags: 0,
                            body: ObjectBody::Empty,
                        }),
                    }
                }
            }
        };

        self.objects.insert(index, object.clone());
        Ok(object)
    }

    fn alias_remote(
        &self,
        resolver: &dyn ImportResolver,
        package: &str,
        index: ObjectIndex,
    ) -> Result<UObjectRc> {
        let Some(target) = resolver.resolve(package) else {
            return Err(UnresolvedPackage(package.to_string()));
        };

        match target.object_at(index) {
            Some(object) => Ok(object),
            None => Err(ObjectNotMaterialized(format!(
                "{}.{}",
                package,
                target.full_name_of(index)?
            ))),
        }
    }

    fn synthesize_class_wrapper(&self, index: ObjectIndex, name: String) -> Result<UObjectRc> {
        Ok(Arc::new(UObject {
            package: self.name_handle(),
            index,
            full_name: self.full_name_of(index)?,
            name,
            class_name: CLASS_OF_CLASSES.to_string(),
            kind: ObjectKind::Class,
            outer: ObjectIndex::null(),
            archetype: ObjectIndex::null(),
            flags: 0,
            body: ObjectBody::Empty,
        }))
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("names", &self.names.len())
            .field("imports", &self.imports.len())
            .field("exports", &self.exports.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test::ImageBuilder, upk::cache::PackageCache};

    /// Two exports nested under each other, one package import.
    fn simple_package() -> Package {
        let mut builder = ImageBuilder::new();
        builder.import("Core", "Package", ObjectIndex::null(), "Engine");
        let outer = builder.export(
            ObjectIndex::null(),
            ObjectIndex::null(),
            ObjectIndex::null(),
            "Outer",
            &[1, 2, 3],
        );
        builder.export(ObjectIndex::null(), ObjectIndex::null(), outer, "Inner", &[4]);

        Package::from_mem(builder.build(), "A").unwrap()
    }

    #[test]
    fn decode_and_dispatch() {
        let package = simple_package();

        assert_eq!(package.name(), "A");
        assert_eq!(package.imports().len(), 1);
        assert_eq!(package.exports().len(), 2);

        assert!(matches!(
            package.get_row(ObjectIndex::from_import(0)),
            Row::Import(_)
        ));
        assert!(matches!(
            package.get_row(ObjectIndex::from_export(1)),
            Row::Export(_)
        ));
        assert!(matches!(package.get_row(ObjectIndex::null()), Row::None));
        assert!(matches!(
            package.get_row(ObjectIndex::from_export(7)),
            Row::None
        ));
    }

    #[test]
    fn full_names_join_outer_chains() {
        let package = simple_package();

        assert_eq!(
            package.full_name_of(ObjectIndex::from_export(0)).unwrap(),
            "Outer"
        );
        assert_eq!(
            package.full_name_of(ObjectIndex::from_export(1)).unwrap(),
            "Outer.Inner"
        );
        assert_eq!(
            package.full_name_of(ObjectIndex::from_import(0)).unwrap(),
            "Engine"
        );
    }

    #[test]
    fn body_bytes_are_sliced_lazily() {
        let package = simple_package();

        assert_eq!(package.body_bytes(0).unwrap(), &[1, 2, 3]);
        assert_eq!(package.body_bytes(1).unwrap(), &[4]);
        assert!(package.body_bytes(2).is_err());
        assert_eq!(package.object_count(), 0);
    }

    #[test]
    fn native_import_self_identifies() {
        let mut builder = ImageBuilder::new();
        let own = builder.import("Core", "Package", ObjectIndex::null(), "A");
        builder.import("Core", "Class", own, "Vector");
        builder.import("Core", "Package", ObjectIndex::null(), "Engine");

        let package = Package::from_mem(builder.build(), "A").unwrap();

        assert!(package.is_native_import(1).unwrap());
        assert!(!package.is_native_import(2).unwrap());
    }

    #[test]
    fn bad_name_reference_fails_decode() {
        let mut builder = ImageBuilder::new();
        builder.import("Core", "Package", ObjectIndex::null(), "Engine");

        let mut image = builder.build();
        let import_offset = Package::from_mem(image.clone(), "A")
            .unwrap()
            .summary()
            .import_offset as usize;

        // Corrupt the import row's object_name id to point past the name table;
        // the id sits after two names (8 bytes each) and the outer index.
        let victim = import_offset + 20;
        image[victim..victim + 4].copy_from_slice(&99u32.to_le_bytes());

        assert!(matches!(
            Package::from_mem(image, "A"),
            Err(crate::Error::BadNameReference(99))
        ));
    }

    fn linked_cache() -> (PackageCache, PackageRc, PackageRc) {
        // B defines Core.Foo; A imports it as B.Core.Foo.
        let mut builder = ImageBuilder::new();
        let core = builder.export(
            ObjectIndex::null(),
            ObjectIndex::null(),
            ObjectIndex::null(),
            "Core",
            &[0xAA],
        );
        builder.export(ObjectIndex::null(), ObjectIndex::null(), core, "Foo", &[0xBB]);
        let b = Package::from_mem(builder.build(), "B").unwrap();

        let mut builder = ImageBuilder::new();
        let package = builder.import("Core", "Package", ObjectIndex::null(), "B");
        let core = builder.import("Core", "Package", package, "Core");
        builder.import("Engine", "StaticMesh", core, "Foo");
        let a = Package::from_mem(builder.build(), "A").unwrap();

        let cache = PackageCache::new();
        let b = cache.add(b);
        let a = cache.add(a);
        (cache, a, b)
    }

    #[test]
    fn resolve_import_finds_remote_export() {
        let (cache, a, _) = linked_cache();

        match a.resolve_import(2, &cache).unwrap() {
            ResolvedImport::Export { package, index } => {
                assert_eq!(package, "B");
                assert_eq!(index, ObjectIndex::from_export(1));
            }
            other => panic!("expected export resolution, got {other:?}"),
        }

        match a.resolve_import(0, &cache).unwrap() {
            ResolvedImport::Package(package) => assert_eq!(package, "B"),
            other => panic!("expected package resolution, got {other:?}"),
        }
    }

    #[test]
    fn resolve_import_reports_missing_package() {
        let mut builder = ImageBuilder::new();
        let package = builder.import("Core", "Package", ObjectIndex::null(), "Nowhere");
        builder.import("Core", "Class", package, "Thing");
        let a = Package::from_mem(builder.build(), "A").unwrap();

        let cache = PackageCache::new();
        assert!(matches!(
            a.resolve_import(1, &cache),
            Err(UnresolvedPackage(name)) if name == "Nowhere"
        ));
    }

    #[test]
    fn resolve_import_reports_missing_object() {
        let (cache, _a, _b) = linked_cache();

        // Point the leaf import at a name B does not define.
        let mut builder = ImageBuilder::new();
        let package = builder.import("Core", "Package", ObjectIndex::null(), "B");
        builder.import("Engine", "StaticMesh", package, "Missing");
        let stale = cache.add(Package::from_mem(builder.build(), "Stale").unwrap());

        assert!(matches!(
            stale.resolve_import(1, &cache),
            Err(UnresolvedImport(full)) if full == "B.Missing"
        ));
    }

    #[test]
    fn create_object_aliases_remote_exports() {
        let (cache, a, b) = linked_cache();
        let registry = ObjectCodecRegistry::new();

        // Materialize B in dependency order, then A's import wrappers.
        b.create_object(ObjectIndex::from_export(0), &cache, &registry)
            .unwrap();
        let foo = b
            .create_object(ObjectIndex::from_export(1), &cache, &registry)
            .unwrap();
        assert_eq!(foo.full_name, "Core.Foo");
        assert_eq!(foo.body, crate::objects::ObjectBody::Raw(vec![0xBB]));

        for import_row in [0usize, 1] {
            a.create_object(ObjectIndex::from_import(import_row), &cache, &registry)
                .unwrap();
        }
        let wrapper = a
            .create_object(ObjectIndex::from_import(2), &cache, &registry)
            .unwrap();

        assert!(Arc::ptr_eq(&wrapper, &foo));
        assert_eq!(a.object_count(), 3);

        // Idempotent
        let again = a
            .create_object(ObjectIndex::from_import(2), &cache, &registry)
            .unwrap();
        assert!(Arc::ptr_eq(&again, &foo));
    }

    #[test]
    fn native_classes_register_and_resolve() {
        let package = simple_package();
        assert!(package.find_class("Vector").is_none());

        package.register_native_class(NativeClass::new("Vector", "A"));
        let class = package.find_class("Vector").unwrap();
        assert_eq!(class.name, "Vector");
    }
}
