//! Row codec seam and owned table storage.
//!
//! Each table row type implements [`RowCodec`], the byte-level contract for one row:
//! decode from a [`Parser`], encode into a [`Writer`]. [`Table`] is the owned,
//! index-addressable storage the package keeps rows in; the exporter mutates cloned
//! tables freely, so rows are owned values rather than lazy views over the stream.

use crate::{
    file::{Parser, Writer},
    Error::TruncatedTable,
    Result,
};

/// Byte-level codec contract implemented by each table row type.
///
/// Implementations read and write exactly one row at the cursor position; the
/// surrounding [`Table`] handles counts and bulk iteration.
pub trait RowCodec: Sized {
    /// Name of the owning table, used in truncation diagnostics
    const TABLE: &'static str;

    /// Read one row from the current parser position
    ///
    /// # Errors
    /// Returns decoding errors when the row is truncated or structurally invalid
    fn read_row(parser: &mut Parser) -> Result<Self>;

    /// Write one row at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    fn write_row(&self, writer: &mut Writer) -> Result<()>;
}

/// An owned table of decoded rows, addressed by zero-based row index.
#[derive(Clone, Debug, Default)]
pub struct Table<T> {
    rows: Vec<T>,
}

impl<T: RowCodec> Table<T> {
    /// Create a new empty table
    #[must_use]
    pub fn new() -> Self {
        Table { rows: Vec::new() }
    }

    /// Get the number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table holds no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the row at `index`, if present
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.rows.get(index)
    }

    /// Get the row at `index` mutably, if present
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.rows.get_mut(index)
    }

    /// Append a row, returning its index
    pub fn push(&mut self, row: T) -> usize {
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Iterate over the rows in index order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.iter()
    }

    /// Read `count` rows from the current parser position
    ///
    /// ## Arguments
    /// * 'parser' - The cursor to read from
    /// * 'count'  - The declared row count
    ///
    /// # Errors
    /// Returns [`TruncatedTable`] when the stream ends before `count` rows
    pub fn read(parser: &mut Parser, count: usize) -> Result<Self> {
        let offset = parser.pos();
        let mut rows = Vec::with_capacity(count);

        for _ in 0..count {
            match T::read_row(parser) {
                Ok(row) => rows.push(row),
                Err(crate::Error::OutOfBounds) => {
                    return Err(TruncatedTable {
                        table: T::TABLE,
                        offset,
                        needed: parser.len() - offset + 1,
                    })
                }
                Err(error) => return Err(error),
            }
        }

        Ok(Table { rows })
    }

    /// Write every row at the current writer position
    ///
    /// # Errors
    /// Propagates stream failures from the writer
    pub fn write(&self, writer: &mut Writer) -> Result<()> {
        for row in &self.rows {
            row.write_row(writer)?;
        }
        Ok(())
    }
}

impl<T> From<Vec<T>> for Table<T> {
    fn from(rows: Vec<T>) -> Self {
        Table { rows }
    }
}

impl<'a, T> IntoIterator for &'a Table<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
