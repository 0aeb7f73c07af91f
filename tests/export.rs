//! End-to-end export scenarios: filtering, flag rewriting, reindexing, and the
//! two-pass layout with its offset patch-back.

mod common;

use std::sync::Arc;

use common::ImageBuilder;
use upkscope::{
    export::{
        ExportPhase, EXPORT_ENGINE_VERSION, OBJECT_FLAG_HAS_STACK, PACKAGE_OBJECT_FLAGS,
        RESOURCE_OBJECT_FLAGS,
    },
    objects::NativeClass,
    prelude::*,
};

/// A cache holding "Core" with the engine's native classes, plus the loaded
/// source package built by `build_source`.
fn load_source(
    image: Vec<u8>,
    name: &str,
) -> anyhow::Result<(Arc<PackageCache>, Arc<ObjectCodecRegistry>, Arc<Package>)> {
    let cache = Arc::new(PackageCache::new());

    let core = Package::from_mem(ImageBuilder::new().build(), "Core")?;
    for class in ["Package", "Class", "World", "Level", "Material", "StaticMesh"] {
        core.register_native_class(NativeClass::new(class, "Core"));
    }
    cache.add(core);

    let registry = Arc::new(ObjectCodecRegistry::new());
    let loader = PackageLoader::new(cache.clone(), registry.clone());
    let package = loader.load_from_mem(image, name)?;
    Ok((cache, registry, package))
}

/// The map-slimming scenario: a package object, a world with a nested level,
/// and a top-level static mesh.
fn map_image() -> (Vec<u8>, ObjectIndex, ObjectIndex, ObjectIndex, ObjectIndex) {
    let mut builder = ImageBuilder::new();
    let core = builder.import("Core", "Package", ObjectIndex::null(), "Core");
    let class_package = builder.import("Core", "Class", core, "Package");
    let class_world = builder.import("Core", "Class", core, "World");
    let class_level = builder.import("Core", "Class", core, "Level");
    let class_mesh = builder.import("Core", "Class", core, "StaticMesh");

    let package = builder.export(class_package, ObjectIndex::null(), "MyPkg", &[1, 2, 3, 4]);
    let world = builder.export(class_world, ObjectIndex::null(), "TheWorld", &[5, 6]);
    builder.export(class_level, world, "PersistentLevel", &[7, 8, 9]);
    let mesh = builder.export(class_mesh, ObjectIndex::null(), "Rock", &[10; 16]);

    (builder.build(), package, world, class_mesh, mesh)
}

#[test]
fn filter_drops_world_and_its_children() -> anyhow::Result<()> {
    let (image, ..) = map_image();
    let (cache, registry, package) = load_source(image, "Map")?;

    let mut exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    exporter.filter()?;
    exporter.reindex()?;

    let names: Vec<String> = exporter
        .exports()
        .iter()
        .map(|row| exporter.names().text_of(row.object_name).unwrap())
        .collect();
    assert_eq!(names, vec!["MyPkg", "Rock"]);

    // Flag rewrite by kind: package flags on the package, resource flags on the mesh.
    assert_eq!(exporter.exports()[0].object_flags, PACKAGE_OBJECT_FLAGS);
    assert_eq!(exporter.exports()[0].package_flags, 1);
    assert_eq!(exporter.exports()[1].object_flags, RESOURCE_OBJECT_FLAGS);
    assert_eq!(exporter.exports()[1].package_flags, 0);
    Ok(())
}

#[test]
fn filter_drops_bodiless_exports() -> anyhow::Result<()> {
    let mut builder = ImageBuilder::new();
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Empty", &[]);
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Full", &[1]);
    let (cache, registry, package) = load_source(builder.build(), "A")?;

    let mut exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    exporter.filter()?;

    assert_eq!(exporter.exports().len(), 1);
    assert_eq!(
        exporter.names().text_of(exporter.exports()[0].object_name)?,
        "Full"
    );
    Ok(())
}

#[test]
fn reindex_is_consistent_with_find_object_index() -> anyhow::Result<()> {
    let (image, _, _, class_mesh, mesh) = map_image();
    let (cache, registry, package) = load_source(image, "Map")?;

    let mut exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    exporter.filter()?;
    exporter.reindex()?;

    // The mesh row survived; its class reference must equal the new index of
    // the class-import's object.
    let mesh_object = package.object_at(mesh).unwrap();
    let mesh_row_index = exporter.find_object_index(&mesh_object).as_export()?;
    let class_object = package.object_at(class_mesh).unwrap();

    let row = &exporter.exports()[mesh_row_index];
    assert_eq!(row.class_ref, exporter.find_object_index(&class_object));
    assert!(!row.class_ref.is_null());

    // Every surviving non-null reference satisfies the same equation.
    for row in exporter.exports() {
        for reference in [row.class_ref, row.super_ref, row.outer_ref, row.archetype_ref] {
            if reference.is_null() {
                continue;
            }
            let row_index = match reference.tag() {
                IndexTag::Export => reference.as_export()?,
                _ => continue,
            };
            assert!(row_index < exporter.exports().len());
        }
    }
    Ok(())
}

#[test]
fn two_pass_layout_partitions_the_body_stream() -> anyhow::Result<()> {
    let mut builder = ImageBuilder::new();
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "First", &[0x11; 10]);
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Second", &[0x22; 20]);
    let (cache, registry, package) = load_source(builder.build(), "A")?;

    let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    let bytes = exporter.export_to_bytes()?;
    let out = Package::from_mem(bytes.clone(), "A2")?;

    let summary = out.summary();
    assert_eq!(summary.export_count, 2);
    assert_eq!(summary.engine_version, EXPORT_ENGINE_VERSION);
    assert_eq!(summary.licensee_version, 0);
    assert_eq!(summary.cooker_version, 0);
    assert_eq!(summary.package_flags, 1);
    assert_eq!(summary.thumbnail_offset, 0);
    assert!(summary.additional_packages_to_cook.is_empty());
    assert!(summary.texture_allocations.is_empty());

    // Depends table: export_count zeros right between exports and bodies.
    assert_eq!(
        summary.total_header_size,
        summary.depends_offset + 4 * summary.export_count
    );

    // S6: body offsets follow the header back to back.
    let first = out.exports().get(0).unwrap();
    let second = out.exports().get(1).unwrap();
    assert_eq!(first.serial_offset, summary.total_header_size);
    assert_eq!(first.serial_size, 10);
    assert_eq!(second.serial_offset, summary.total_header_size + 10);
    assert_eq!(second.serial_size, 20);

    // Property: the ranges partition [total_header_size, end).
    assert_eq!(
        bytes.len(),
        (summary.total_header_size + first.serial_size + second.serial_size) as usize
    );
    assert_eq!(out.body_bytes(0)?, &[0x11; 10]);
    assert_eq!(out.body_bytes(1)?, &[0x22; 20]);
    Ok(())
}

#[test]
fn export_round_trip_preserves_surviving_triples() -> anyhow::Result<()> {
    let (image, ..) = map_image();
    let (cache, registry, package) = load_source(image, "Map")?;

    let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    let bytes = exporter.export_to_bytes()?;

    let out = cache.add(Package::from_mem(bytes, "MapOut")?);

    // Survivors keep (full_name, class_full_name, outer_full_name) up to the
    // filter rules: the world and its level are gone, nothing else changed.
    let mut surviving = Vec::new();
    for row in 0..out.exports().len() {
        let index = ObjectIndex::from_export(row);
        let class_ref = out.exports().get(row).unwrap().class_ref;
        surviving.push((
            out.full_name_of(index)?,
            out.full_name_of(class_ref)?,
        ));
    }

    assert_eq!(
        surviving,
        vec![
            ("MyPkg".to_string(), "Core.Package".to_string()),
            ("Rock".to_string(), "Core.StaticMesh".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn has_stack_flag_propagates_source_flags() -> anyhow::Result<()> {
    let source_flags = OBJECT_FLAG_HAS_STACK | 0x0000_0000_0000_0042;

    let mut builder = ImageBuilder::new();
    builder.export_flagged(
        ObjectIndex::null(),
        ObjectIndex::null(),
        "Stacked",
        &[1, 2],
        source_flags,
    );
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Plain", &[3]);
    let (cache, registry, package) = load_source(builder.build(), "A")?;

    let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    let bytes = exporter.export_to_bytes()?;
    let out = Package::from_mem(bytes, "A2")?;

    assert_eq!(out.exports().get(0).unwrap().object_flags, source_flags);
    assert_ne!(out.exports().get(1).unwrap().object_flags, source_flags);
    Ok(())
}

#[test]
fn exporter_phases_are_linear() -> anyhow::Result<()> {
    let mut builder = ImageBuilder::new();
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Only", &[1]);
    let (cache, registry, package) = load_source(builder.build(), "A")?;

    let mut exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    assert_eq!(exporter.phase(), ExportPhase::Built);

    // Phases cannot be skipped or repeated.
    assert!(exporter.reindex().is_err());
    exporter.filter()?;
    assert!(exporter.filter().is_err());
    assert!(exporter.write_header().is_err());
    exporter.reindex()?;
    exporter.write_header()?;
    exporter.write_tables()?;
    exporter.write_bodies()?;
    assert_eq!(exporter.phase(), ExportPhase::BodiesWritten);

    let writer = exporter.finalize()?;
    assert!(!writer.is_empty());
    Ok(())
}

#[test]
fn exported_file_round_trips_through_disk() -> anyhow::Result<()> {
    let mut builder = ImageBuilder::new();
    builder.export(ObjectIndex::null(), ObjectIndex::null(), "Only", &[9, 9, 9]);
    let (cache, registry, package) = load_source(builder.build(), "A")?;

    let exporter = PackageExporter::new(&package, cache.as_ref(), &registry)?;
    let bytes = exporter.export_to_bytes()?;

    let directory = tempfile::tempdir()?;
    let path = directory.path().join("A.upk");
    std::fs::write(&path, &bytes)?;

    let reloaded = Package::from_file(&path, "A")?;
    assert_eq!(reloaded.exports().len(), 1);
    assert_eq!(reloaded.body_bytes(0)?, &[9, 9, 9]);
    Ok(())
}

#[test]
fn search_paths_discover_sibling_containers() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;

    let mut builder = ImageBuilder::new();
    let core = builder.export(ObjectIndex::null(), ObjectIndex::null(), "Core", &[0xAA]);
    builder.export(ObjectIndex::null(), core, "Foo", &[0xBB]);
    std::fs::write(directory.path().join("B.upk"), builder.build())?;

    let mut builder = ImageBuilder::new();
    let package = builder.import("Core", "Package", ObjectIndex::null(), "B");
    let core = builder.import("Core", "Package", package, "Core");
    builder.import("Engine", "StaticMesh", core, "Foo");
    let a_image = builder.build();

    let cache = Arc::new(PackageCache::new().with_search_path(directory.path().to_path_buf()));
    let loader = PackageLoader::new(cache.clone(), Arc::new(ObjectCodecRegistry::new()));
    let a = loader.load_from_mem(a_image, "A")?;

    assert!(cache.is_cached("B"));
    let wrapper = a.object_at(ObjectIndex::from_import(2)).unwrap();
    assert_eq!(wrapper.full_name, "Core.Foo");
    Ok(())
}
