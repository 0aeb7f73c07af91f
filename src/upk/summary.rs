//! Container header (`FileSummary`) decoding and emission.
//!
//! The summary sits at offset 0 and carries the magic, format versions, the
//! offsets and counts of every table, and a handful of cook-time fields. Versions
//! and flag words pass through this crate verbatim; only the structural fields
//! (counts, offsets) are validated against the stream they describe.

use crate::{
    file::{Parser, Writer},
    Result,
};

/// Magic tag identifying a package container stream.
pub const PACKAGE_MAGIC: u32 = 0x9E2A_83C1;

/// One cook-time texture allocation record, carried through verbatim.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureAllocation {
    /// Width of the allocated mip chain
    pub size_x: i32,
    /// Height of the allocated mip chain
    pub size_y: i32,
    /// Number of mips
    pub num_mips: i32,
    /// Pixel format id
    pub format: u32,
    /// Creation flags
    pub create_flags: u32,
    /// Exports sharing this allocation
    pub export_indices: Vec<i32>,
}

impl TextureAllocation {
    fn read(parser: &mut Parser) -> Result<Self> {
        let size_x = parser.read_le::<i32>()?;
        let size_y = parser.read_le::<i32>()?;
        let num_mips = parser.read_le::<i32>()?;
        let format = parser.read_le::<u32>()?;
        let create_flags = parser.read_le::<u32>()?;

        let count = parser.read_le::<i32>()?;
        if count < 0 {
            return Err(malformed_error!(
                "Texture allocation export list has negative count {}",
                count
            ));
        }

        let mut export_indices = Vec::with_capacity(count as usize);
        for _ in 0..count {
            export_indices.push(parser.read_le::<i32>()?);
        }

        Ok(TextureAllocation {
            size_x,
            size_y,
            num_mips,
            format,
            create_flags,
            export_indices,
        })
    }

    fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<i32>(self.size_x)?;
        writer.write_le::<i32>(self.size_y)?;
        writer.write_le::<i32>(self.num_mips)?;
        writer.write_le::<u32>(self.format)?;
        writer.write_le::<u32>(self.create_flags)?;
        writer.write_le::<i32>(self.export_indices.len() as i32)?;
        for index in &self.export_indices {
            writer.write_le::<i32>(*index)?;
        }
        Ok(())
    }
}

/// The decoded container header.
///
/// Field order matches the on-disk layout; see the crate documentation for the
/// full file layout. The decoder checks the magic and the sanity of counts, and
/// leaves everything else untouched for the exporter to rewrite or carry through.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSummary {
    /// Container magic, always [`PACKAGE_MAGIC`]
    pub magic: u32,
    /// Packed format version words, carried verbatim
    pub file_version: u32,
    /// Size of the header including every table, up to the first object body
    pub total_header_size: i32,
    /// Name of the folder the package was cooked from
    pub package_name: String,
    /// Package flags word
    pub package_flags: u32,
    /// Number of rows in the name table
    pub name_count: i32,
    /// Stream offset of the name table
    pub name_offset: i32,
    /// Number of rows in the export table
    pub export_count: i32,
    /// Stream offset of the export table
    pub export_offset: i32,
    /// Number of rows in the import table
    pub import_count: i32,
    /// Stream offset of the import table
    pub import_offset: i32,
    /// Stream offset of the depends table
    pub depends_offset: i32,
    /// Stream offset of the thumbnail table, zero when absent
    pub thumbnail_offset: i32,
    /// Engine version the container was saved with
    pub engine_version: u32,
    /// Cooker version the container was saved with
    pub cooker_version: u32,
    /// Licensee version the container was saved with
    pub licensee_version: u32,
    /// Names of sibling packages the cooker bundled
    pub additional_packages_to_cook: Vec<String>,
    /// Cook-time texture allocations
    pub texture_allocations: Vec<TextureAllocation>,
}

impl FileSummary {
    /// Read the summary from the current parser position.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] when the magic does not match or a
    /// declared count is negative, and [`crate::Error::OutOfBounds`] when the
    /// stream ends inside the header
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let magic = parser.read_le::<u32>()?;
        if magic != PACKAGE_MAGIC {
            return Err(malformed_error!(
                "Bad container magic {:#010X}, expected {:#010X}",
                magic,
                PACKAGE_MAGIC
            ));
        }

        let file_version = parser.read_le::<u32>()?;
        let total_header_size = parser.read_le::<i32>()?;
        let package_name = parser.read_fstring()?;
        let package_flags = parser.read_le::<u32>()?;

        let name_count = parser.read_le::<i32>()?;
        let name_offset = parser.read_le::<i32>()?;
        let export_count = parser.read_le::<i32>()?;
        let export_offset = parser.read_le::<i32>()?;
        let import_count = parser.read_le::<i32>()?;
        let import_offset = parser.read_le::<i32>()?;
        let depends_offset = parser.read_le::<i32>()?;
        let thumbnail_offset = parser.read_le::<i32>()?;

        for (field, value) in [
            ("name_count", name_count),
            ("name_offset", name_offset),
            ("export_count", export_count),
            ("export_offset", export_offset),
            ("import_count", import_count),
            ("import_offset", import_offset),
        ] {
            if value < 0 {
                return Err(malformed_error!("Header field {} is negative", field));
            }
        }

        let engine_version = parser.read_le::<u32>()?;
        let cooker_version = parser.read_le::<u32>()?;
        let licensee_version = parser.read_le::<u32>()?;

        let package_count = parser.read_le::<i32>()?;
        if package_count < 0 {
            return Err(malformed_error!("Additional package list has negative count"));
        }
        let mut additional_packages_to_cook = Vec::with_capacity(package_count as usize);
        for _ in 0..package_count {
            additional_packages_to_cook.push(parser.read_fstring()?);
        }

        let allocation_count = parser.read_le::<i32>()?;
        if allocation_count < 0 {
            return Err(malformed_error!("Texture allocation list has negative count"));
        }
        let mut texture_allocations = Vec::with_capacity(allocation_count as usize);
        for _ in 0..allocation_count {
            texture_allocations.push(TextureAllocation::read(parser)?);
        }

        Ok(FileSummary {
            magic,
            file_version,
            total_header_size,
            package_name,
            package_flags,
            name_count,
            name_offset,
            export_count,
            export_offset,
            import_count,
            import_offset,
            depends_offset,
            thumbnail_offset,
            engine_version,
            cooker_version,
            licensee_version,
            additional_packages_to_cook,
            texture_allocations,
        })
    }

    /// Write the summary at the current writer position.
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u32>(self.magic)?;
        writer.write_le::<u32>(self.file_version)?;
        writer.write_le::<i32>(self.total_header_size)?;
        writer.write_fstring(&self.package_name)?;
        writer.write_le::<u32>(self.package_flags)?;

        writer.write_le::<i32>(self.name_count)?;
        writer.write_le::<i32>(self.name_offset)?;
        writer.write_le::<i32>(self.export_count)?;
        writer.write_le::<i32>(self.export_offset)?;
        writer.write_le::<i32>(self.import_count)?;
        writer.write_le::<i32>(self.import_offset)?;
        writer.write_le::<i32>(self.depends_offset)?;
        writer.write_le::<i32>(self.thumbnail_offset)?;

        writer.write_le::<u32>(self.engine_version)?;
        writer.write_le::<u32>(self.cooker_version)?;
        writer.write_le::<u32>(self.licensee_version)?;

        writer.write_le::<i32>(self.additional_packages_to_cook.len() as i32)?;
        for package in &self.additional_packages_to_cook {
            writer.write_fstring(package)?;
        }

        writer.write_le::<i32>(self.texture_allocations.len() as i32)?;
        for allocation in &self.texture_allocations {
            allocation.write(writer)?;
        }

        Ok(())
    }

    /// Create a summary with the magic set and everything else empty
    #[must_use]
    pub fn empty() -> Self {
        FileSummary {
            magic: PACKAGE_MAGIC,
            ..FileSummary::default()
        }
    }
}
