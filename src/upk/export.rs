use crate::{
    file::{Parser, Writer},
    upk::{guid::FGuid, index::ObjectIndex, name::FName, tables::RowCodec},
    Result,
};

/// One row of the export table: an object this container defines.
///
/// `class_ref`, `super_ref` and `archetype_ref` may point into either table;
/// `outer_ref` stays within the export table. A null `class_ref` denotes the
/// distinguished `Class` of classes. `serial_offset`/`serial_size` delimit the
/// byte range of the object's body within the container stream; all flag words
/// are carried through verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectExport {
    /// Class of the object, or null for the `Class` of classes
    pub class_ref: ObjectIndex,
    /// Superclass, for class objects
    pub super_ref: ObjectIndex,
    /// Enclosing object; the chain of outers forms the full name
    pub outer_ref: ObjectIndex,
    /// Name of the object
    pub object_name: FName,
    /// Object supplying default property values
    pub archetype_ref: ObjectIndex,
    /// Object flags word, not interpreted during loading
    pub object_flags: u64,
    /// Length of the serialized body in bytes
    pub serial_size: i32,
    /// Offset of the serialized body within the container stream
    pub serial_offset: i32,
    /// Export flags word
    pub export_flags: u32,
    /// Net object count carried through verbatim
    pub net_object_count: i32,
    /// Per-object identifier
    pub guid: FGuid,
    /// Package flags for package-like exports
    pub package_flags: u32,
}

impl ObjectExport {
    /// Returns true if this export is the distinguished `Class` of classes
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.class_ref.is_null()
    }

    /// The byte range of the serialized body, as stream offsets
    #[must_use]
    pub fn body_range(&self) -> (usize, usize) {
        (self.serial_offset as usize, self.serial_size as usize)
    }
}

impl RowCodec for ObjectExport {
    const TABLE: &'static str = "export";

    fn read_row(parser: &mut Parser) -> Result<Self> {
        Ok(ObjectExport {
            class_ref: ObjectIndex::read(parser)?,
            super_ref: ObjectIndex::read(parser)?,
            outer_ref: ObjectIndex::read(parser)?,
            object_name: FName::read(parser)?,
            archetype_ref: ObjectIndex::read(parser)?,
            object_flags: parser.read_le::<u64>()?,
            serial_size: parser.read_le::<i32>()?,
            serial_offset: parser.read_le::<i32>()?,
            export_flags: parser.read_le::<u32>()?,
            net_object_count: parser.read_le::<i32>()?,
            guid: FGuid::read(parser)?,
            package_flags: parser.read_le::<u32>()?,
        })
    }

    fn write_row(&self, writer: &mut Writer) -> Result<()> {
        self.class_ref.write(writer)?;
        self.super_ref.write(writer)?;
        self.outer_ref.write(writer)?;
        self.object_name.write(writer)?;
        self.archetype_ref.write(writer)?;
        writer.write_le::<u64>(self.object_flags)?;
        writer.write_le::<i32>(self.serial_size)?;
        writer.write_le::<i32>(self.serial_offset)?;
        writer.write_le::<u32>(self.export_flags)?;
        writer.write_le::<i32>(self.net_object_count)?;
        self.guid.write(writer)?;
        writer.write_le::<u32>(self.package_flags)
    }
}
