use thiserror::Error;

use crate::metadata::tables::TableId;

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
/// Errors fall into three groups:
///
/// ## Addressing errors
/// - [`Error::AddressOutOfRange`] - a file offset beyond the end of the image
/// - [`Error::UnmappedAddress`] - an RVA without file backing
/// - [`Error::InvalidRange`] - a stream request outside the image bytes
///
/// ## Structural errors
/// - [`Error::InvalidRowId`] - a row-id of 0 or beyond the row count of its table
/// - [`Error::BadImageFormat`] - an entity constructed over an invalid row
/// - [`Error::MalformedTable`] - a row that extends past its stream
/// - [`Error::Malformed`] - any other corrupted header or stream
///
/// ## Environment errors
/// - [`Error::FileError`], [`Error::GoblinErr`], [`Error::LockError`],
///   [`Error::ContainerDropped`]
///
/// Layout corruption (DOS, NT and section headers) is reported when the image is opened.
/// Everything else is reported at the first access that needs the broken bytes, so a single
/// corrupt row never prevents unrelated entities from resolving.
///
/// # Examples
///
/// ```rust,no_run
/// use cilimage::{file::PeImage, Error};
/// use std::path::Path;
///
/// match PeImage::from_file(Path::new("assembly.dll")) {
///     Ok(image) => println!("{} sections", image.sections().len()),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed file: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A file offset lies at or beyond the end of the image.
    #[error("File offset 0x{0:x} is outside of the image")]
    AddressOutOfRange(u64),

    /// An RVA is not backed by file bytes.
    ///
    /// Either no section contains the address, or it falls into the virtual-only tail of a
    /// section whose in-memory size exceeds its size on disk.
    #[error("RVA 0x{0:08x} is not backed by file data")]
    UnmappedAddress(u32),

    /// A requested stream does not fit into the image bytes.
    #[error("Invalid range - offset 0x{offset:x}, length 0x{length:x}")]
    InvalidRange {
        /// Start of the requested range
        offset: u64,
        /// Length of the requested range
        length: u64,
    },

    /// A row-id is 0 or larger than the row count of its table.
    #[error("Invalid row-id {rid} for table {table:?}")]
    InvalidRowId {
        /// The table that was accessed
        table: TableId,
        /// The offending row-id
        rid: u32,
    },

    /// A metadata entity was requested for a row that can not exist.
    #[error("Bad image format - {0}")]
    BadImageFormat(String),

    /// A table row could not be decoded from the bytes of its stream.
    #[error("Malformed table {table:?} - {message}")]
    MalformedTable {
        /// The table being decoded
        table: TableId,
        /// What went wrong
        message: String,
    },

    /// The file is damaged and could not be parsed.
    ///
    /// Carries the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// This file type is not supported.
    ///
    /// Returned for PE images without a CLR runtime header.
    #[error("This file type is not supported")]
    NotSupported,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// Error from the goblin crate during PE parsing.
    #[error("{0}")]
    GoblinErr(#[from] goblin::error::Error),

    /// Failed to lock target.
    ///
    /// A lazily computed value was guarded by a lock that got poisoned by a panicking
    /// recipe.
    #[error("Failed to lock target")]
    LockError,

    /// The module an entity was read from has already been dropped.
    #[error("The owning module is no longer alive")]
    ContainerDropped,
}
