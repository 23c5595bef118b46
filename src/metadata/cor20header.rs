//! The CLR runtime header (`IMAGE_COR20_HEADER`), the entry point into managed metadata.
//!
//! The header is found through data directory 14 of the optional header and points at the
//! metadata root, the managed resources and the strong name signature.

use bitflags::bitflags;

use crate::{file::ByteStream, Result};

bitflags! {
    /// Runtime flags of a managed image (`COMIMAGE_FLAGS_*`)
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Cor20Flags: u32 {
        /// Image contains only IL code
        const IL_ONLY = 0x0000_0001;
        /// Image can only be loaded into a 32-bit process
        const REQUIRED_32BIT = 0x0000_0002;
        /// Image is a library of IL code
        const IL_LIBRARY = 0x0000_0004;
        /// Image is strong name signed
        const STRONG_NAME_SIGNED = 0x0000_0008;
        /// The entry point token is an RVA of a native entry point
        const NATIVE_ENTRYPOINT = 0x0000_0010;
        /// Debug data is tracked
        const TRACK_DEBUG_DATA = 0x0001_0000;
        /// Prefer a 32-bit process on 64-bit platforms
        const PREFERRED_32BIT = 0x0002_0000;
    }
}

/// The CLR runtime header.
#[derive(Clone, Debug, PartialEq)]
pub struct Cor20Header {
    /// Size of the header, always 72
    pub cb: u32,
    /// Major runtime version required
    pub major_runtime_version: u16,
    /// Minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata
    pub meta_data_size: u32,
    /// Runtime flags
    pub flags: Cor20Flags,
    /// Token of the managed entry point, or RVA of a native one
    pub entry_point_token: u32,
    /// RVA of the managed resources
    pub resource_rva: u32,
    /// Size of the managed resources
    pub resource_size: u32,
    /// RVA of the strong name signature
    pub strong_name_signature_rva: u32,
    /// Size of the strong name signature
    pub strong_name_signature_size: u32,
    /// RVA of the vtable fixups
    pub vtable_fixups_rva: u32,
    /// Size of the vtable fixups
    pub vtable_fixups_size: u32,
    /// RVA of the managed native header (ReadyToRun)
    pub managed_native_header_rva: u32,
    /// Size of the managed native header
    pub managed_native_header_size: u32,
}

impl Cor20Header {
    /// Size of the header in bytes
    pub const SIZE: usize = 72;

    /// Read the header from the start of `stream`.
    ///
    /// # Errors
    /// Returns an error if the stream is too short, the size field is not 72 or the
    /// metadata directory is empty
    pub fn read(stream: &mut ByteStream) -> Result<Cor20Header> {
        let cb = stream.read_le::<u32>()?;
        if cb as usize != Self::SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = stream.read_le::<u16>()?;
        let minor_runtime_version = stream.read_le::<u16>()?;

        let meta_data_rva = stream.read_le::<u32>()?;
        let meta_data_size = stream.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!(
                "CLR header has an empty metadata directory - 0x{:x} / 0x{:x}",
                meta_data_rva,
                meta_data_size
            ));
        }

        let flags = Cor20Flags::from_bits_retain(stream.read_le::<u32>()?);
        let entry_point_token = stream.read_le::<u32>()?;
        let resource_rva = stream.read_le::<u32>()?;
        let resource_size = stream.read_le::<u32>()?;
        let strong_name_signature_rva = stream.read_le::<u32>()?;
        let strong_name_signature_size = stream.read_le::<u32>()?;

        // code manager table, reserved
        stream.advance_by(8)?;

        let vtable_fixups_rva = stream.read_le::<u32>()?;
        let vtable_fixups_size = stream.read_le::<u32>()?;

        // export address table jumps, reserved
        stream.advance_by(8)?;

        let managed_native_header_rva = stream.read_le::<u32>()?;
        let managed_native_header_size = stream.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
            entry_point_token,
            resource_rva,
            resource_size,
            strong_name_signature_rva,
            strong_name_signature_size,
            vtable_fixups_rva,
            vtable_fixups_size,
            managed_native_header_rva,
            managed_native_header_size,
        })
    }
}
