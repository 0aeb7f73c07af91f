//! Growable, seekable byte stream writer for container emission.
//!
//! The [`Writer`] type is the output half of the file layer. The exporter's two-pass
//! layout writes the header and tables with placeholder offsets, emits object bodies,
//! then seeks back to patch the header and export table in place. Bodies have unknown
//! sizes before they are serialized, so the buffer grows on demand instead of being
//! pre-sized; finished output is flushed to disk in one atomic-ish step.

use std::{fs, path::Path};

use crate::{file::io::SerialIO, Error::OutOfBounds, Result};

/// A growable binary output buffer with a seekable write cursor.
///
/// Writing at the end of the buffer appends; writing at an earlier position overwrites
/// in place, which is how offset patch-back works. All writes are little-endian.
///
/// # Examples
///
/// ```rust,no_run
/// use upkscope::Writer;
///
/// let mut writer = Writer::new();
/// writer.write_le::<u32>(0)?;           // placeholder
/// writer.write_le::<u16>(0xBEEF)?;
///
/// let end = writer.pos();
/// writer.seek(0)?;
/// writer.write_le::<u32>(end as u32)?;  // patch the placeholder
/// writer.seek(end)?;
/// # Ok::<(), upkscope::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Writer {
    data: Vec<u8>,
    position: usize,
}

impl Writer {
    /// Create a new empty `Writer`
    #[must_use]
    pub fn new() -> Self {
        Writer::default()
    }

    /// Returns the length of the data written so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing has been written
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the current position of the write cursor
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Move the write cursor to N
    ///
    /// Seeking is only valid within the already-written range; the buffer never
    /// grows by seeking, only by writing.
    ///
    /// ## Arguments
    /// * 'pos' - The position to move the cursor to
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if position is beyond the written length
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Write a type T at the current position in little-endian, and advance accordingly
    ///
    /// # Errors
    /// Infallible today; returns `Result` so codecs compose with fallible streams
    pub fn write_le<T: SerialIO>(&mut self, value: T) -> Result<()> {
        self.write_bytes(value.to_le_bytes().as_ref())
    }

    /// Write raw bytes at the current position, and advance accordingly
    ///
    /// ## Arguments
    /// * 'bytes' - The bytes to emit
    ///
    /// # Errors
    /// Infallible today; returns `Result` so codecs compose with fallible streams
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.position + bytes.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
        Ok(())
    }

    /// Write a length-prefixed string at the current position.
    ///
    /// Always emits the 8-bit form: a positive signed 32-bit count followed by the
    /// bytes and a NUL terminator. The empty string is emitted as a zero count.
    ///
    /// ## Arguments
    /// * 'text' - The string to emit
    ///
    /// # Errors
    /// Returns [`crate::Error::NotSupported`] if the string does not fit 8-bit characters
    pub fn write_fstring(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return self.write_le::<i32>(0);
        }

        if !text.is_ascii() {
            return Err(crate::Error::NotSupported);
        }

        let Ok(count) = i32::try_from(text.len() + 1) else {
            return Err(crate::Error::NotSupported);
        };

        self.write_le::<i32>(count)?;
        self.write_bytes(text.as_bytes())?;
        self.write_le::<u8>(0)
    }

    /// View the written data
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the writer and take the written data
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Flush the written data to a file on disk.
    ///
    /// ## Arguments
    /// * 'path' - The destination path; an existing file is replaced
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the filesystem write fails
    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }
}
