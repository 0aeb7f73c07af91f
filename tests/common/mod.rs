//! Shared container-image factory for the integration tests.
//!
//! Builds syntactically valid container images entirely in memory through the
//! public API, so no fixture files are needed.

#![allow(dead_code)]

use upkscope::{
    prelude::*,
    upk::{guid::FGuid, summary::PACKAGE_MAGIC, tables::RowCodec},
    Writer,
};

/// Builds a container image from rows and bodies, computing all offsets.
#[derive(Default)]
pub struct ImageBuilder {
    names: Vec<String>,
    imports: Vec<ObjectImport>,
    exports: Vec<(ObjectExport, Vec<u8>)>,
}

impl ImageBuilder {
    pub fn new() -> Self {
        ImageBuilder::default()
    }

    /// Get-or-add a name, returning its reference
    pub fn name(&mut self, text: &str) -> FName {
        if let Some(index) = self.names.iter().position(|name| name == text) {
            return FName::new(index as u32);
        }
        self.names.push(text.to_string());
        FName::new((self.names.len() - 1) as u32)
    }

    /// Add an import row, returning its reference
    pub fn import(
        &mut self,
        class_package: &str,
        class_name: &str,
        outer: ObjectIndex,
        object_name: &str,
    ) -> ObjectIndex {
        let row = ObjectImport {
            class_package: self.name(class_package),
            class_name: self.name(class_name),
            outer,
            object_name: self.name(object_name),
        };
        self.imports.push(row);
        ObjectIndex::from_import(self.imports.len() - 1)
    }

    /// Add an export row with a body, returning its reference
    pub fn export(
        &mut self,
        class_ref: ObjectIndex,
        outer_ref: ObjectIndex,
        object_name: &str,
        body: &[u8],
    ) -> ObjectIndex {
        self.export_flagged(class_ref, outer_ref, object_name, body, 0)
    }

    /// Add an export row with explicit object flags
    pub fn export_flagged(
        &mut self,
        class_ref: ObjectIndex,
        outer_ref: ObjectIndex,
        object_name: &str,
        body: &[u8],
        object_flags: u64,
    ) -> ObjectIndex {
        let row = ObjectExport {
            class_ref,
            super_ref: ObjectIndex::null(),
            outer_ref,
            object_name: self.name(object_name),
            archetype_ref: ObjectIndex::null(),
            object_flags,
            serial_size: 0,
            serial_offset: 0,
            export_flags: 0,
            net_object_count: 0,
            guid: FGuid::zero(),
            package_flags: 0,
        };
        self.exports.push((row, body.to_vec()));
        ObjectIndex::from_export(self.exports.len() - 1)
    }

    /// Emit the image: header, names, imports, exports, depends, bodies, with
    /// the header and export table patched once real offsets are known.
    pub fn build(mut self) -> Vec<u8> {
        let mut summary = FileSummary {
            magic: PACKAGE_MAGIC,
            file_version: 0x0303_0000,
            package_name: "Test".to_string(),
            ..FileSummary::default()
        };

        let mut writer = Writer::new();
        summary.write(&mut writer).expect("summary placeholder");

        summary.name_offset = writer.pos() as i32;
        summary.name_count = self.names.len() as i32;
        for name in &self.names {
            writer.write_fstring(name).expect("name row");
            writer
                .write_le::<u64>(0x0007_0010_0000_0000)
                .expect("name flags");
        }

        summary.import_offset = writer.pos() as i32;
        summary.import_count = self.imports.len() as i32;
        for row in &self.imports {
            row.write_row(&mut writer).expect("import row");
        }

        let export_offset = writer.pos();
        summary.export_offset = export_offset as i32;
        summary.export_count = self.exports.len() as i32;
        for (row, _) in &self.exports {
            row.write_row(&mut writer).expect("export row placeholder");
        }

        summary.depends_offset = writer.pos() as i32;
        for _ in 0..self.exports.len() {
            writer.write_le::<i32>(0).expect("depends row");
        }

        summary.total_header_size = writer.pos() as i32;

        for (row, body) in &mut self.exports {
            row.serial_offset = writer.pos() as i32;
            row.serial_size = body.len() as i32;
            writer.write_bytes(body).expect("body bytes");
        }

        let end = writer.len();
        writer.seek(export_offset).expect("seek export table");
        for (row, _) in &self.exports {
            row.write_row(&mut writer).expect("export row final");
        }
        writer.seek(0).expect("seek header");
        summary.write(&mut writer).expect("summary final");
        writer.seek(end).expect("seek end");

        writer.into_bytes()
    }
}
