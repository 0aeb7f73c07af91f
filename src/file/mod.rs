//! Input and output primitives for container streams.
//!
//! This module provides the byte-level plumbing the package layer is built on:
//!
//! - [`File`] - an input container stream, memory-mapped from disk or owned in memory
//! - [`Parser`] - a bounds-checked read cursor over a byte slice
//! - [`Writer`] - a growable, seekable output buffer with patch-back writes
//! - [`io`] - endian-aware primitive reads and writes shared by both cursors
//!
//! The decoder consumes plaintext container bytes; any decompression or decryption
//! stage runs before data reaches this layer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use upkscope::File;
//! use std::path::Path;
//!
//! let file = File::from_file(Path::new("CoreAssets.upk"))?;
//! println!("Loaded container with {} bytes", file.len());
//! # Ok::<(), upkscope::Error>(())
//! ```

pub mod io;
pub mod parser;
pub mod writer;

use std::{fs, path::Path};

use memmap2::Mmap;

use crate::{
    Error::{Empty, FileError, OutOfBounds},
    Result,
};

pub use parser::Parser;
pub use writer::Writer;

/// Backing storage for an input container stream.
///
/// Files loaded from disk stay memory-mapped so table decoding and body reads
/// never copy more than the rows they touch; in-memory buffers are owned outright.
enum Backend {
    /// Input backed by a memory-mapped file on disk
    Physical(Mmap),
    /// Input backed by an owned buffer
    Memory(Vec<u8>),
}

impl Backend {
    fn data(&self) -> &[u8] {
        match self {
            Backend::Physical(mmap) => mmap.as_ref(),
            Backend::Memory(data) => data.as_slice(),
        }
    }
}

/// An input container stream.
///
/// `File` owns the raw plaintext bytes of one container and hands out bounds-checked
/// slices of them. The package decoder parses the header and tables out of it, and
/// keeps it alive afterwards so object bodies can be read lazily at materialization
/// time from `[serial_offset, serial_offset + serial_size)` ranges.
///
/// # Examples
///
/// ## Loading from File
///
/// ```rust,no_run
/// use upkscope::File;
/// use std::path::Path;
///
/// let file = File::from_file(Path::new("CoreAssets.upk"))?;
/// println!("{} bytes", file.len());
/// # Ok::<(), upkscope::Error>(())
/// ```
///
/// ## Loading from Memory
///
/// ```rust,no_run
/// use upkscope::File;
///
/// let data = std::fs::read("CoreAssets.upk")?;
/// let file = File::from_mem(data)?;
/// println!("{} bytes", file.len());
/// # Ok::<(), upkscope::Error>(())
/// ```
pub struct File {
    backend: Backend,
}

impl File {
    /// Create a `File` by memory-mapping a container from disk
    ///
    /// ## Arguments
    /// * 'path' - The file path to map
    ///
    /// # Errors
    /// Returns [`FileError`] if the file cannot be opened or mapped, or
    /// [`Empty`] if it contains no data
    pub fn from_file(path: &Path) -> Result<File> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(FileError(error)),
        };

        if mmap.is_empty() {
            return Err(Empty);
        }

        Ok(File {
            backend: Backend::Physical(mmap),
        })
    }

    /// Create a `File` from an owned in-memory buffer
    ///
    /// ## Arguments
    /// * 'data' - The plaintext container bytes to consume
    ///
    /// # Errors
    /// Returns [`Empty`] if the buffer contains no data
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        if data.is_empty() {
            return Err(Empty);
        }

        Ok(File {
            backend: Backend::Memory(data),
        })
    }

    /// Returns the length of the underlying data
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.data().len()
    }

    /// Returns true if the file holds no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.data().is_empty()
    }

    /// View the whole underlying data
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Get a bounds-checked slice of the underlying data
    ///
    /// ## Arguments
    /// * 'offset' - Start of the slice
    /// * 'len'    - Length of the slice
    ///
    /// # Errors
    /// Returns [`OutOfBounds`] if the range does not lie within the data
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let data = self.backend.data();

        let Some(end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if end > data.len() {
            return Err(OutOfBounds);
        }

        Ok(&data[offset..end])
    }
}
