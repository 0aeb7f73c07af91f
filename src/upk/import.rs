use crate::{
    file::{Parser, Writer},
    upk::{
        index::ObjectIndex,
        name::{FName, NameTable, NAME_NONE},
        tables::RowCodec,
    },
    Result,
};

/// One row of the import table: an object this container consumes from another one.
///
/// `class_package`/`class_name` name the class of the referenced object, `outer`
/// points at the enclosing import (or is null for a top-level package reference),
/// and `object_name` names the object itself. A row whose three names are all
/// `"None"` is an empty placeholder.
///
/// An import is *native* when its top-level package resolves to the name of the
/// container holding the row: the class is synthesized by the engine and has no
/// table entry anywhere.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectImport {
    /// Package the referenced object's class comes from
    pub class_package: FName,
    /// Class of the referenced object
    pub class_name: FName,
    /// Enclosing import, or null for a top-level package reference
    pub outer: ObjectIndex,
    /// Name of the referenced object
    pub object_name: FName,
}

impl ObjectImport {
    /// Returns true if this row denotes a top-level package reference
    #[must_use]
    pub fn is_package(&self) -> bool {
        self.outer.is_null()
    }

    /// Returns true if all three names of the row are the `"None"` sentinel
    ///
    /// ## Arguments
    /// * 'names' - The owning container's name table
    pub fn is_none_row(&self, names: &NameTable) -> Result<bool> {
        Ok(names.lookup(self.class_package.index)? == NAME_NONE
            && names.lookup(self.class_name.index)? == NAME_NONE
            && names.lookup(self.object_name.index)? == NAME_NONE)
    }
}

impl RowCodec for ObjectImport {
    const TABLE: &'static str = "import";

    fn read_row(parser: &mut Parser) -> Result<Self> {
        Ok(ObjectImport {
            class_package: FName::read(parser)?,
            class_name: FName::read(parser)?,
            outer: ObjectIndex::read(parser)?,
            object_name: FName::read(parser)?,
        })
    }

    fn write_row(&self, writer: &mut Writer) -> Result<()> {
        self.class_package.write(writer)?;
        self.class_name.write(writer)?;
        self.outer.write(writer)?;
        self.object_name.write(writer)
    }
}
