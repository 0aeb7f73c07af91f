//! Low-level byte stream parser for container decoding.
//!
//! The [`Parser`] type provides methods for reading primitive values, seeking, and slicing
//! byte streams. It is used internally by the package decoder, but is also available for
//! users who need to decode custom data such as object bodies.
//!
//! # Example
//!
//! ```rust,no_run
//! use upkscope::Parser;
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), upkscope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, SerialIO},
    Error::OutOfBounds,
    Result,
};

/// A generic binary data parser for reading container structures.
///
/// `Parser` provides a cursor-based interface for reading little-endian binary data.
/// It is designed for parsing the container format's header, name table, import and
/// export tables, and serialized object bodies.
///
/// The parser maintains an internal position cursor and provides bounds checking
/// to prevent buffer overruns when reading malformed or truncated data.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::Parser;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut parser = Parser::new(&data);
///
/// // Read little-endian values
/// let first = parser.read_le::<u32>()?;
/// assert_eq!(first, 0x04030201);
///
/// // Seek to a specific position
/// parser.seek(6)?;
/// let last_bytes = parser.read_le::<u16>()?;
/// assert_eq!(last_bytes, 0x0807);
/// # Ok::<(), upkscope::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` from a byte slice
    ///
    /// ## Arguments
    /// * 'data' - The byte slice to read from
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the data
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the parser has no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if there is more data to parse
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move current position to N
    ///
    /// ## Arguments
    /// * 'pos' - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if position is beyond the data length
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Get the current position of the parser
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Read a type T from the current position in little-endian, and advance accordingly
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if reading would exceed the data length
    pub fn read_le<T: SerialIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `len` raw bytes from the current position, and advance accordingly
    ///
    /// ## Arguments
    /// * 'len' - The amount of bytes to read
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if reading would exceed the data length
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let Some(end) = self.position.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if end > self.data.len() {
            return Err(OutOfBounds);
        }

        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Read a length-prefixed string from the current position.
    ///
    /// The prefix is a signed 32-bit count. A positive count denotes that many 8-bit
    /// characters including a NUL terminator; a negative count denotes `-count` UTF-16
    /// code units including the terminator; zero denotes the empty string.
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if the declared length exceeds the remaining data, or
    /// [`crate::Error::Malformed`] if the bytes are not valid text or lack a terminator
    pub fn read_fstring(&mut self) -> Result<String> {
        let count = self.read_le::<i32>()?;
        if count == 0 {
            return Ok(String::new());
        }

        if count > 0 {
            let bytes = self.read_bytes(count as usize)?;
            match bytes.split_last() {
                Some((0, chars)) => match std::str::from_utf8(chars) {
                    Ok(text) => Ok(text.to_string()),
                    Err(_) => Err(malformed_error!("String is not valid UTF-8")),
                },
                _ => Err(malformed_error!("String is missing its NUL terminator")),
            }
        } else {
            let Some(count) = count.checked_neg() else {
                return Err(malformed_error!("String length prefix overflows"));
            };

            let mut units = Vec::with_capacity(count as usize);
            for _ in 0..count {
                units.push(self.read_le::<u16>()?);
            }

            match units.pop() {
                Some(0) => match String::from_utf16(&units) {
                    Ok(text) => Ok(text),
                    Err(_) => Err(malformed_error!("String is not valid UTF-16")),
                },
                _ => Err(malformed_error!("String is missing its NUL terminator")),
            }
        }
    }
}
