//! Interned name storage for package containers.
//!
//! Every string a container mentions lives exactly once in its name table; rows refer
//! to names through [`FName`], a stable numeric id plus an instance number. Comparing
//! names within one container is id comparison; resolving an [`FName`] to text always
//! goes through the owning container's [`NameTable`].

use crate::{
    file::{Parser, Writer},
    Error::BadNameReference,
    Result,
};

/// The distinguished sentinel name used for empty rows.
pub const NAME_NONE: &str = "None";

/// Flags word given to names first interned during export.
const DEFAULT_NAME_FLAGS: u64 = 0x0007_0010_0000_0000;

/// A reference to an entry in a container's name table.
///
/// The pair `(index, number)` identifies a name instance: `index` selects the table
/// row, and a non-zero `number` denotes the `number - 1`-th numbered instance of
/// that name (rendered as `Name_0`, `Name_1`, ...). Two `FName`s from the same
/// container are equal iff both fields are equal; resolving one to text requires
/// the owning container.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct FName {
    /// Index into the owning container's name table
    pub index: u32,
    /// Instance number; 0 renders the bare name
    pub number: i32,
}

impl FName {
    /// Creates an instance-0 reference to name table row `index`
    #[must_use]
    pub fn new(index: u32) -> Self {
        FName { index, number: 0 }
    }

    /// Read a name reference from the current parser position
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(FName {
            index: parser.read_le::<u32>()?,
            number: parser.read_le::<i32>()?,
        })
    }

    /// Write the name reference at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<u32>(self.index)?;
        writer.write_le::<i32>(self.number)
    }
}

/// One row of a name table: the string and a flags word carried through verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameEntry {
    /// The interned string
    pub name: String,
    /// Flags word, not interpreted by this crate
    pub flags: u64,
}

/// Ordered, append-only string storage with stable numeric ids.
///
/// Decoding fills the table from the container stream; during export the table only
/// ever grows through [`NameTable::intern`], so ids handed out earlier stay valid.
/// Removal is not supported.
#[derive(Clone, Debug, Default)]
pub struct NameTable {
    entries: Vec<NameEntry>,
}

impl NameTable {
    /// Create a new empty table
    #[must_use]
    pub fn new() -> Self {
        NameTable::default()
    }

    /// Get the number of names in the table
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table holds no names
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the string stored at `id`
    ///
    /// ## Arguments
    /// * 'id' - The name id to look up (comes from decoded rows)
    ///
    /// # Errors
    /// Returns [`BadNameReference`] if the id is not present in the table
    pub fn lookup(&self, id: u32) -> Result<&str> {
        match self.entries.get(id as usize) {
            Some(entry) => Ok(&entry.name),
            None => Err(BadNameReference(id)),
        }
    }

    /// Resolve a name reference to its text, applying the instance number.
    ///
    /// ## Arguments
    /// * 'name' - The reference to resolve
    ///
    /// # Errors
    /// Returns [`BadNameReference`] if the reference's id is not present
    pub fn text_of(&self, name: FName) -> Result<String> {
        let base = self.lookup(name.index)?;
        if name.number > 0 {
            Ok(format!("{}_{}", base, name.number - 1))
        } else {
            Ok(base.to_string())
        }
    }

    /// Find the id of an exact string, if interned
    #[must_use]
    pub fn find(&self, text: &str) -> Option<u32> {
        self.entries
            .iter()
            .position(|entry| entry.name == text)
            .map(|index| index as u32)
    }

    /// Intern a string, appending it if absent.
    ///
    /// Idempotent: interning the same string twice yields the same id. The
    /// returned reference always carries instance number 0.
    ///
    /// ## Arguments
    /// * 'text' - The string to intern
    pub fn intern(&mut self, text: &str) -> FName {
        if let Some(index) = self.find(text) {
            return FName::new(index);
        }

        self.entries.push(NameEntry {
            name: text.to_string(),
            flags: DEFAULT_NAME_FLAGS,
        });
        FName::new((self.entries.len() - 1) as u32)
    }

    /// Append a decoded row, preserving its flags word verbatim
    pub fn push_entry(&mut self, name: String, flags: u64) {
        self.entries.push(NameEntry { name, flags });
    }

    /// Iterate over the rows in id order
    pub fn iter(&self) -> impl Iterator<Item = &NameEntry> {
        self.entries.iter()
    }

    /// Read `count` name rows from the current parser position
    ///
    /// ## Arguments
    /// * 'parser' - The cursor to read from
    /// * 'count'  - The declared row count
    ///
    /// # Errors
    /// Returns decoding errors if a row is truncated or its string is invalid
    pub fn read(parser: &mut Parser, count: usize) -> Result<Self> {
        let mut table = NameTable {
            entries: Vec::with_capacity(count),
        };

        for _ in 0..count {
            let name = parser.read_fstring()?;
            let flags = parser.read_le::<u64>()?;
            table.push_entry(name, flags);
        }

        Ok(table)
    }

    /// Write every row at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        for entry in &self.entries {
            writer.write_fstring(&entry.name)?;
            writer.write_le::<u64>(entry.flags)?;
        }
        Ok(())
    }
}
