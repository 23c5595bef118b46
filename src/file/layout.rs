//! Parsed PE container layout and the RVA ↔ file offset mapping built on it.
//!
//! [`ImageLayout`] is an owned snapshot of the DOS header, the NT headers and the section
//! table, taken with `goblin` when an image is opened. It never changes afterwards, so it can
//! be shared between threads without synchronization.
//!
//! Section headers are not assumed to be sorted, contiguous or non-overlapping. Every lookup
//! scans the whole table and picks the first section that contains the address.

use std::fmt;

use goblin::pe::{
    data_directories::{DataDirectory, DataDirectoryType},
    header::{CoffHeader, DosHeader},
    optional_header::OptionalHeader,
    section_table::SectionTable,
    PE,
};

use crate::{
    Error::{AddressOutOfRange, GoblinErr, UnmappedAddress},
    Result,
};

/// A byte position within the raw file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileOffset(pub u64);

/// A relative virtual address, the offset from the image base once the image is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rva(pub u32);

impl fmt::Display for FileOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::Display for Rva {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

impl From<u32> for Rva {
    fn from(value: u32) -> Self {
        Rva(value)
    }
}

impl From<u64> for FileOffset {
    fn from(value: u64) -> Self {
        FileOffset(value)
    }
}

/// The NT headers of an image: PE signature, COFF file header and optional header.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NtHeaders {
    /// The `PE\0\0` signature
    pub signature: u32,
    /// COFF file header (machine, section count, characteristics, ...)
    pub file_header: CoffHeader,
    /// Optional header (image base, alignments, data directories, ...)
    pub optional_header: OptionalHeader,
}

/// The headers of a PE image that describe where its bytes live in memory.
#[derive(Clone, Debug)]
pub struct ImageLayout {
    dos_header: DosHeader,
    nt_headers: NtHeaders,
    sections: Vec<SectionTable>,
    file_len: u64,
}

impl ImageLayout {
    /// Parse the layout headers of a PE image.
    ///
    /// # Arguments
    /// * 'data' - The complete image bytes
    ///
    /// # Errors
    /// Returns an error if `goblin` rejects the headers or the optional header is missing
    pub fn parse(data: &[u8]) -> Result<ImageLayout> {
        let pe = PE::parse(data).map_err(GoblinErr)?;
        let Some(optional_header) = pe.header.optional_header else {
            return Err(malformed_error!("File does not have an OptionalHeader"));
        };

        Ok(ImageLayout {
            dos_header: pe.header.dos_header,
            nt_headers: NtHeaders {
                signature: pe.header.signature,
                file_header: pe.header.coff_header,
                optional_header,
            },
            sections: pe.sections,
            file_len: data.len() as u64,
        })
    }

    /// The DOS header
    #[must_use]
    pub fn dos_header(&self) -> &DosHeader {
        &self.dos_header
    }

    /// The NT headers
    #[must_use]
    pub fn nt_headers(&self) -> &NtHeaders {
        &self.nt_headers
    }

    /// The section headers, in file order
    #[must_use]
    pub fn sections(&self) -> &[SectionTable] {
        &self.sections
    }

    /// Size of the image file in bytes
    #[must_use]
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// The preferred load address of the image
    #[must_use]
    pub fn image_base(&self) -> u64 {
        u64::from(self.nt_headers.optional_header.windows_fields.image_base)
    }

    /// The RVA of the entry point, 0 for images without one
    #[must_use]
    pub fn entry_point(&self) -> Rva {
        let entry = u64::from(
            self.nt_headers
                .optional_header
                .standard_fields
                .address_of_entry_point,
        );
        Rva(u32::try_from(entry).unwrap_or(0))
    }

    /// Look up a data directory, ignoring empty entries.
    #[must_use]
    pub fn data_directory(&self, kind: DataDirectoryType) -> Option<DataDirectory> {
        self.nt_headers
            .optional_header
            .data_directories
            .dirs()
            .find(|(directory_type, directory)| {
                *directory_type == kind && directory.virtual_address != 0 && directory.size != 0
            })
            .map(|(_, directory)| directory)
    }

    /// The CLR runtime header directory as (RVA, size), if the image is managed.
    #[must_use]
    pub fn clr_directory(&self) -> Option<(Rva, u32)> {
        self.data_directory(DataDirectoryType::ClrRuntimeHeader)
            .map(|directory| (Rva(directory.virtual_address), directory.size))
    }

    /// Map a file offset to the RVA it is loaded at.
    ///
    /// Offsets outside every section's raw data belong to the header region, which is
    /// mapped at the image base unchanged.
    ///
    /// # Errors
    /// Returns [`crate::Error::AddressOutOfRange`] if the offset is not inside the file
    pub fn to_rva(&self, offset: FileOffset) -> Result<Rva> {
        if offset.0 >= self.file_len {
            return Err(AddressOutOfRange(offset.0));
        }

        for section in &self.sections {
            let raw_start = u64::from(section.pointer_to_raw_data);
            let raw_end = raw_start + u64::from(section.size_of_raw_data);
            if offset.0 >= raw_start && offset.0 < raw_end {
                let rva = u64::from(section.virtual_address) + (offset.0 - raw_start);
                return u32::try_from(rva)
                    .map(Rva)
                    .map_err(|_| AddressOutOfRange(offset.0));
            }
        }

        u32::try_from(offset.0)
            .map(Rva)
            .map_err(|_| AddressOutOfRange(offset.0))
    }

    /// Map an RVA to the file offset holding its bytes.
    ///
    /// A section covers `[virtual_address, virtual_address + max(virtual_size,
    /// size_of_raw_data))` in memory, but only the first `min(virtual_size,
    /// size_of_raw_data)` bytes of it come from the file. A `virtual_size` of 0 means the
    /// raw size applies.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] for RVAs outside every section and for RVAs
    /// in the zero-filled tail of a section
    pub fn to_file_offset(&self, rva: Rva) -> Result<FileOffset> {
        for section in &self.sections {
            let raw_size = section.size_of_raw_data;
            let virtual_size = if section.virtual_size == 0 {
                raw_size
            } else {
                section.virtual_size
            };

            let start = u64::from(section.virtual_address);
            let end = start + u64::from(virtual_size.max(raw_size));
            let rva_value = u64::from(rva.0);
            if rva_value < start || rva_value >= end {
                continue;
            }

            let delta = rva_value - start;
            if delta >= u64::from(virtual_size.min(raw_size)) {
                return Err(UnmappedAddress(rva.0));
            }

            return Ok(FileOffset(u64::from(section.pointer_to_raw_data) + delta));
        }

        Err(UnmappedAddress(rva.0))
    }

    /// Map an absolute virtual address, based on the preferred image base.
    ///
    /// # Errors
    /// Returns [`crate::Error::UnmappedAddress`] if the address is below the image base or
    /// does not map into the file
    pub fn va_to_file_offset(&self, va: u64) -> Result<FileOffset> {
        let image_base = self.image_base();
        let Some(rva) = va.checked_sub(image_base) else {
            return Err(UnmappedAddress(u32::try_from(va).unwrap_or(u32::MAX)));
        };

        let Ok(rva) = u32::try_from(rva) else {
            return Err(UnmappedAddress(u32::MAX));
        };

        self.to_file_offset(Rva(rva))
    }

    /// Find the section containing `rva`, by virtual extent.
    #[must_use]
    pub fn section_for_rva(&self, rva: Rva) -> Option<&SectionTable> {
        self.sections.iter().find(|section| {
            let extent = section.virtual_size.max(section.size_of_raw_data);
            rva.0 >= section.virtual_address
                && u64::from(rva.0) < u64::from(section.virtual_address) + u64::from(extent)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::PeBuilder;

    fn scenario() -> ImageLayout {
        let data = PeBuilder::scenario().build();
        ImageLayout::parse(&data).unwrap()
    }

    #[test]
    fn headers() {
        let layout = scenario();

        assert_eq!(layout.dos_header().signature, 0x5A4D);
        assert_eq!(layout.dos_header().pe_pointer, 0x80);
        assert_eq!(layout.nt_headers().signature, 0x0000_4550);
        assert_eq!(layout.nt_headers().file_header.number_of_sections, 2);
        assert_eq!(layout.image_base(), 0x40_0000);
        assert_eq!(layout.sections().len(), 2);
        assert_eq!(layout.file_len(), 0xC00);
        assert!(layout.clr_directory().is_none());
    }

    #[test]
    fn rva_to_file_offset() {
        let layout = scenario();

        assert_eq!(layout.to_file_offset(Rva(0x2100)).unwrap(), FileOffset(0x500));
        assert_eq!(layout.to_file_offset(Rva(0x2000)).unwrap(), FileOffset(0x400));
        assert_eq!(layout.to_file_offset(Rva(0x25FF)).unwrap(), FileOffset(0x9FF));
        assert_eq!(layout.to_file_offset(Rva(0x3010)).unwrap(), FileOffset(0xA10));
    }

    #[test]
    fn rva_in_virtual_tail() {
        let layout = scenario();

        assert!(matches!(
            layout.to_file_offset(Rva(0x2700)),
            Err(UnmappedAddress(0x2700))
        ));
        assert!(matches!(
            layout.to_file_offset(Rva(0x2600)),
            Err(UnmappedAddress(0x2600))
        ));
    }

    #[test]
    fn rva_outside_sections() {
        let layout = scenario();

        assert!(matches!(
            layout.to_file_offset(Rva(0x1000)),
            Err(UnmappedAddress(0x1000))
        ));
        assert!(matches!(
            layout.to_file_offset(Rva(0x3200)),
            Err(UnmappedAddress(0x3200))
        ));
    }

    #[test]
    fn file_offset_to_rva() {
        let layout = scenario();

        assert_eq!(layout.to_rva(FileOffset(0x500)).unwrap(), Rva(0x2100));
        assert_eq!(layout.to_rva(FileOffset(0xA00)).unwrap(), Rva(0x3000));
        // header region maps by identity
        assert_eq!(layout.to_rva(FileOffset(0x80)).unwrap(), Rva(0x80));
        assert!(matches!(
            layout.to_rva(FileOffset(0xC00)),
            Err(AddressOutOfRange(0xC00))
        ));
    }

    #[test]
    fn round_trip() {
        let layout = scenario();

        for offset in (0x400..0xA00).chain(0xA00..0xC00).step_by(0x3F) {
            let rva = layout.to_rva(FileOffset(offset)).unwrap();
            assert_eq!(layout.to_file_offset(rva).unwrap(), FileOffset(offset));
        }

        for rva in (0x2000..0x2600).chain(0x3000..0x3200).step_by(0x41) {
            let offset = layout.to_file_offset(Rva(rva)).unwrap();
            assert_eq!(layout.to_rva(offset).unwrap(), Rva(rva));
        }
    }

    #[test]
    fn unsorted_sections() {
        let data = PeBuilder::new()
            .section(b".rsrc", 0x3000, 0x200, 0xA00, 0x200)
            .section(b".text", 0x2000, 0x800, 0x400, 0x600)
            .file_len(0xC00)
            .build();
        let layout = ImageLayout::parse(&data).unwrap();

        assert_eq!(layout.to_file_offset(Rva(0x2100)).unwrap(), FileOffset(0x500));
        assert_eq!(layout.to_file_offset(Rva(0x3100)).unwrap(), FileOffset(0xB00));
        assert_eq!(layout.to_rva(FileOffset(0x500)).unwrap(), Rva(0x2100));
    }

    #[test]
    fn virtual_size_zero_uses_raw_size() {
        let data = PeBuilder::new()
            .section(b".data", 0x2000, 0, 0x400, 0x200)
            .file_len(0x600)
            .build();
        let layout = ImageLayout::parse(&data).unwrap();

        assert_eq!(layout.to_file_offset(Rva(0x21FF)).unwrap(), FileOffset(0x5FF));
        assert!(layout.to_file_offset(Rva(0x2200)).is_err());
    }

    #[test]
    fn virtual_address() {
        let layout = scenario();

        assert_eq!(
            layout.va_to_file_offset(0x40_2100).unwrap(),
            FileOffset(0x500)
        );
        assert!(layout.va_to_file_offset(0x2100).is_err());
    }
}
