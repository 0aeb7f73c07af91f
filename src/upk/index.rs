use std::fmt;

use crate::{
    file::{Parser, Writer},
    Error::WrongIndexTag,
    Result,
};

/// Which table an [`ObjectIndex`] refers into.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum IndexTag {
    /// The null reference
    Null,
    /// A reference into the import table
    Import,
    /// A reference into the export table
    Export,
}

/// A tagged signed-integer reference to an import row, an export row, or nothing.
///
/// The canonical encoding packs the tag into the sign of a single 32-bit value:
/// - `0` is the null reference
/// - `i > 0` refers to export row `i - 1`
/// - `i < 0` refers to import row `-i - 1`
///
/// For any non-null index held by a decoded row, the referenced row exists in the
/// package that owns the holding row. Equality, ordering and hashing all use the
/// raw signed integer.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::upk::index::{IndexTag, ObjectIndex};
///
/// let index = ObjectIndex::from_export(7);
/// assert_eq!(index.tag(), IndexTag::Export);
/// assert_eq!(index.as_export()?, 7);
/// assert_eq!(index.value(), 8);
/// # Ok::<(), upkscope::Error>(())
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectIndex(pub i32);

impl ObjectIndex {
    /// The null reference
    #[must_use]
    pub fn null() -> Self {
        ObjectIndex(0)
    }

    /// Creates an index referring to export row `k`
    #[must_use]
    pub fn from_export(k: usize) -> Self {
        ObjectIndex(k as i32 + 1)
    }

    /// Creates an index referring to import row `k`
    #[must_use]
    pub fn from_import(k: usize) -> Self {
        ObjectIndex(-(k as i32) - 1)
    }

    /// Returns the raw signed value
    #[must_use]
    pub fn value(&self) -> i32 {
        self.0
    }

    /// Extracts the tag from the sign of the value
    #[must_use]
    pub fn tag(&self) -> IndexTag {
        match self.0 {
            0 => IndexTag::Null,
            i if i > 0 => IndexTag::Export,
            _ => IndexTag::Import,
        }
    }

    /// Returns true if this is the null reference
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns the export row this index refers to
    ///
    /// # Errors
    /// Returns [`WrongIndexTag`] when the index is null or an import reference
    pub fn as_export(&self) -> Result<usize> {
        match self.tag() {
            IndexTag::Export => Ok((self.0 - 1) as usize),
            actual => Err(WrongIndexTag {
                expected: IndexTag::Export,
                actual,
            }),
        }
    }

    /// Returns the import row this index refers to
    ///
    /// # Errors
    /// Returns [`WrongIndexTag`] when the index is null or an export reference
    pub fn as_import(&self) -> Result<usize> {
        match self.tag() {
            IndexTag::Import => Ok((-self.0 - 1) as usize),
            actual => Err(WrongIndexTag {
                expected: IndexTag::Import,
                actual,
            }),
        }
    }

    /// Read an index from the current parser position (little-endian two's complement)
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if reading would exceed the data length
    pub fn read(parser: &mut Parser) -> Result<Self> {
        Ok(ObjectIndex(parser.read_le::<i32>()?))
    }

    /// Write the index at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        writer.write_le::<i32>(self.0)
    }
}

impl From<i32> for ObjectIndex {
    fn from(value: i32) -> Self {
        ObjectIndex(value)
    }
}

impl From<ObjectIndex> for i32 {
    fn from(index: ObjectIndex) -> Self {
        index.0
    }
}

impl fmt::Debug for ObjectIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tag() {
            IndexTag::Null => write!(f, "ObjectIndex(Null)"),
            IndexTag::Export => write!(f, "ObjectIndex(Export {})", self.0 - 1),
            IndexTag::Import => write!(f, "ObjectIndex(Import {})", -self.0 - 1),
        }
    }
}

impl fmt::Display for ObjectIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
