//! The PE image container and its address space.
//!
//! A [`PeImage`] owns the raw image bytes behind a [`Backend`] (an owned buffer or a
//! memory-mapped file) together with the [`ImageLayout`] parsed from its headers. It
//! implements [`AddressSpace`], which translates between raw file offsets and RVAs and hands
//! out bounded [`ByteStream`] views.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cilimage::file::{AddressSpace, PeImage, Rva};
//! use std::path::Path;
//!
//! let image = PeImage::from_file(Path::new("tests/samples/sample.dll"))?;
//! println!("{} sections", image.sections().len());
//!
//! if let Some((clr_rva, clr_size)) = image.clr_directory() {
//!     let offset = image.to_file_offset(clr_rva)?;
//!     let mut header = image.create_stream_rva(clr_rva, Some(u64::from(clr_size)))?;
//!     println!("CLR header at {} is {} bytes, cb = {}", offset, clr_size, header.read_le::<u32>()?);
//! }
//! # Ok::<(), cilimage::Error>(())
//! ```
//!
//! # Addressing rules
//!
//! - Offsets outside every section's raw data are header bytes, mapped to the same RVA.
//! - RVAs in the zero-filled tail of a section (beyond its raw size) have no file offset.
//! - Streams may end exactly at the end of the file, never past it.

pub mod io;
pub mod layout;
mod memory;
mod physical;
mod stream;

use std::{path::Path, sync::Arc};

use goblin::pe::{header::DosHeader, section_table::SectionTable};

use crate::{
    Error::{Empty, InvalidRange, OutOfBounds},
    Result,
};

pub use layout::{FileOffset, ImageLayout, NtHeaders, Rva};
pub use memory::Memory;
pub use physical::Physical;
pub use stream::ByteStream;

/// Backend trait for image data sources.
///
/// Abstracts over where the bytes come from. All implementations must be thread-safe, since
/// streams created from one image are handed to other threads.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns true if the backend holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        self.data().get(offset..offset_end).ok_or(OutOfBounds)
    }
}

/// Translation between file offsets and RVAs, plus bounded stream creation.
pub trait AddressSpace {
    /// Map a file offset to an RVA.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressOutOfRange`] if the offset lies beyond the file
    fn to_rva(&self, offset: FileOffset) -> Result<Rva>;

    /// Map an RVA to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if no file bytes back the RVA
    fn to_file_offset(&self, rva: Rva) -> Result<FileOffset>;

    /// A stream over `[offset, offset + length)`, or to the end of the file if `length` is
    /// `None`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRange`] if the range is not inside `[0, len]`
    fn create_stream(&self, offset: FileOffset, length: Option<u64>) -> Result<ByteStream>;

    /// Like [`AddressSpace::create_stream`], starting at the file offset backing `rva`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] or [`crate::Error::InvalidRange`]
    fn create_stream_rva(&self, rva: Rva, length: Option<u64>) -> Result<ByteStream> {
        let offset = self.to_file_offset(rva)?;
        self.create_stream(offset, length)
    }

    /// A stream over the entire file.
    ///
    /// # Errors
    /// Never fails for a well-formed address space
    fn create_full_stream(&self) -> Result<ByteStream> {
        self.create_stream(FileOffset(0), None)
    }
}

/// A loaded PE image.
///
/// The headers are parsed once when the image is opened; header corruption fails here and
/// nowhere else. The image bytes are shared with every stream created from it, so the
/// image itself may be dropped while streams are still in use.
pub struct PeImage {
    data: Arc<dyn Backend>,
    layout: ImageLayout,
}

impl PeImage {
    /// Map and parse the image at `path`.
    ///
    /// # Errors
    /// Returns an error if the file can not be mapped, is empty or has broken PE headers
    pub fn from_file(path: &Path) -> Result<PeImage> {
        Self::load(Physical::new(path)?)
    }

    /// Parse an image held in memory.
    ///
    /// # Errors
    /// Returns an error if `data` is empty or has broken PE headers
    pub fn from_mem(data: Vec<u8>) -> Result<PeImage> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<PeImage> {
        if data.is_empty() {
            return Err(Empty);
        }

        let layout = ImageLayout::parse(data.data())?;
        tracing::debug!(
            "opened PE image: {} bytes, {} sections, image base 0x{:x}",
            data.len(),
            layout.sections().len(),
            layout.image_base()
        );

        Ok(PeImage {
            data: Arc::new(data),
            layout,
        })
    }

    /// The parsed header layout
    #[must_use]
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// The DOS header
    #[must_use]
    pub fn dos_header(&self) -> &DosHeader {
        self.layout.dos_header()
    }

    /// The NT headers
    #[must_use]
    pub fn nt_headers(&self) -> &NtHeaders {
        self.layout.nt_headers()
    }

    /// The section headers, in file order
    #[must_use]
    pub fn sections(&self) -> &[SectionTable] {
        self.layout.sections()
    }

    /// The preferred load address
    #[must_use]
    pub fn image_base(&self) -> u64 {
        self.layout.image_base()
    }

    /// The CLR runtime header directory as (RVA, size)
    #[must_use]
    pub fn clr_directory(&self) -> Option<(Rva, u32)> {
        self.layout.clr_directory()
    }

    /// Map an absolute virtual address to a file offset.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the address has no file backing
    pub fn va_to_file_offset(&self, va: u64) -> Result<FileOffset> {
        self.layout.va_to_file_offset(va)
    }

    /// The raw image bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image holds no bytes; never the case for a loaded image
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AddressSpace for PeImage {
    fn to_rva(&self, offset: FileOffset) -> Result<Rva> {
        self.layout.to_rva(offset)
    }

    fn to_file_offset(&self, rva: Rva) -> Result<FileOffset> {
        self.layout.to_file_offset(rva)
    }

    fn create_stream(&self, offset: FileOffset, length: Option<u64>) -> Result<ByteStream> {
        let file_len = self.data.len() as u64;
        let invalid = || InvalidRange {
            offset: offset.0,
            length: length.unwrap_or(0),
        };

        if offset.0 > file_len {
            return Err(invalid());
        }

        let length = length.unwrap_or(file_len - offset.0);
        match offset.0.checked_add(length) {
            Some(end) if end <= file_len => {}
            _ => return Err(invalid()),
        }

        let start = usize::try_from(offset.0).map_err(|_| invalid())?;
        let len = usize::try_from(length).map_err(|_| invalid())?;
        ByteStream::new(self.data.clone(), start, len)
    }
}
