use thiserror::Error;

use crate::upk::index::IndexTag;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers all possible error conditions that can occur while decoding package
/// containers, resolving cross-package references, materializing objects, and re-emitting
/// packages. Each variant provides specific context about the failure mode to enable
/// appropriate error handling.
///
/// # Error Categories
///
/// ## Container Decoding Errors
/// - [`Error::Malformed`] - Corrupted or invalid header/table structure
/// - [`Error::TruncatedTable`] - A table extends past the end of the stream
/// - [`Error::BadNameReference`] - A row references a name id outside the name table
/// - [`Error::OutOfBounds`] - Attempted to read beyond the stream boundaries
/// - [`Error::Empty`] - Empty input provided
/// - [`Error::NotSupported`] - Unsupported container format or feature
///
/// ## Resolution Errors
/// - [`Error::UnresolvedPackage`] - A referenced package cannot be produced by the resolver
/// - [`Error::UnresolvedImport`] - An import has no matching export, import, or native class
///
/// ## Graph and Index Errors
/// - [`Error::SelfEdge`] - Attempt to add a `u -> u` edge to the dependency graph
/// - [`Error::WrongIndexTag`] - An index accessor was called for the wrong tag
/// - [`Error::GraphError`] - Dependency graph construction or ordering failure
///
/// ## Export Errors
/// - [`Error::ObjectNotMaterialized`] - A body serializer was invoked on an unresolved object
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem and stream I/O errors, propagated verbatim
#[derive(Error, Debug)]
pub enum Error {
    /// The container is damaged and could not be decoded.
    ///
    /// Covers malformed headers and any structural invariant violation detected
    /// while parsing. The error carries the source location where the
    /// malformation was detected for debugging purposes.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A table row range extends past the end of the container stream.
    #[error("Truncated {table} table - need {needed} bytes at offset {offset}")]
    TruncatedTable {
        /// Which table was being decoded
        table: &'static str,
        /// Stream offset at which the table starts
        offset: usize,
        /// Bytes required to hold the declared row count
        needed: usize,
    },

    /// A row references a name id that does not exist in the owning name table.
    #[error("Name id {0} is not present in the name table")]
    BadNameReference(u32),

    /// An out of bound access was attempted while decoding the container.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// This container format or feature is not supported.
    #[error("This container format is not supported")]
    NotSupported,

    /// The resolver could not produce a package that other rows reference.
    ///
    /// Fatal to the enclosing load; the name identifies the missing package.
    #[error("Failed to resolve package - {0}")]
    UnresolvedPackage(String),

    /// An import row has no matching export, import, or native class in its
    /// target package.
    ///
    /// The payload is the full dot-joined name of the offending import.
    #[error("Failed to resolve import - {0}")]
    UnresolvedImport(String),

    /// Attempt to add a self-referential edge to the dependency graph.
    ///
    /// Programmer error; the graph is left unchanged.
    #[error("Self edge rejected for node - {0}")]
    SelfEdge(String),

    /// An [`crate::upk::index::ObjectIndex`] accessor was called for the wrong tag.
    ///
    /// Programmer error, e.g. calling `as_export` on an import reference.
    #[error("Wrong index tag - expected {expected:?}, found {actual:?}")]
    WrongIndexTag {
        /// The tag the accessor is defined for
        expected: IndexTag,
        /// The tag the index actually carries
        actual: IndexTag,
    },

    /// A body serializer was invoked for an object that has not been materialized.
    ///
    /// Fatal to the export of that object; the payload names it.
    #[error("Object has not been materialized - {0}")]
    ObjectNotMaterialized(String),

    /// Dependency graph error.
    ///
    /// Errors related to dependency analysis and materialization order. This
    /// occurs when circular dependencies are detected in input that should have
    /// been acyclic.
    #[error("{0}")]
    GraphError(String),

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur during file operations
    /// such as reading from disk, permission issues, or filesystem errors.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
