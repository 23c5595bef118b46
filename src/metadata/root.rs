//! The metadata root (`BSJB` header) and its stream directory.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Error::OutOfBounds,
    Result,
};

/// Signature of the metadata root, `BSJB`
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root header.
#[derive(Clone, Debug, PartialEq)]
pub struct Root {
    /// Magic signature, `BSJB`
    pub signature: u32,
    /// Major version, usually 1
    pub major_version: u16,
    /// Minor version, usually 1
    pub minor_version: u16,
    /// Reserved, always 0
    pub reserved: u32,
    /// Length of the version string field, including padding
    pub length: u32,
    /// Runtime version string, e.g. `v4.0.30319`
    pub version: String,
    /// Reserved, always 0
    pub flags: u16,
    /// Number of streams
    pub stream_number: u16,
    /// The stream directory
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parse the metadata root from the start of `data`, the bytes of the metadata directory.
    ///
    /// # Errors
    /// Returns an error if the signature does not match, the header is truncated or a
    /// stream reaches past the end of `data`
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(OutOfBounds);
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - 0x{:08x}",
                signature
            ));
        }

        let length = read_le_at::<u32>(data, &mut 12)?;
        let Some(version_end) = (length as usize).checked_add(16) else {
            return Err(malformed_error!("Version string length overflows - {}", length));
        };
        if version_end + 4 > data.len() {
            return Err(OutOfBounds);
        }

        let version_bytes = &data[16..version_end];
        let terminator = version_bytes
            .iter()
            .position(|byte| *byte == 0)
            .unwrap_or(version_bytes.len());
        let version = String::from_utf8_lossy(&version_bytes[..terminator]).into_owned();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_number = read_le_at::<u16>(data, &mut offset)?;
        if stream_number == 0 || usize::from(stream_number) > 8 {
            return Err(malformed_error!("Invalid stream count - {}", stream_number));
        }

        let mut stream_headers = Vec::with_capacity(usize::from(stream_number));
        for _ in 0..stream_number {
            if offset >= data.len() {
                return Err(OutOfBounds);
            }

            let header = StreamHeader::from(&data[offset..])?;
            match header.offset.checked_add(header.size) {
                Some(end) if end as usize <= data.len() => {}
                _ => {
                    return Err(malformed_error!(
                        "Stream {} exceeds the metadata - 0x{:x} + 0x{:x}",
                        header.name,
                        header.offset,
                        header.size
                    ))
                }
            }

            if stream_headers
                .iter()
                .any(|existing: &StreamHeader| existing.name == header.name)
            {
                return Err(malformed_error!("Duplicate stream - {}", header.name));
            }

            offset += header.encoded_len();
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version: read_le_at::<u16>(data, &mut 4)?,
            minor_version: read_le_at::<u16>(data, &mut 6)?,
            reserved: read_le_at::<u32>(data, &mut 8)?,
            length,
            version,
            flags,
            stream_number,
            stream_headers,
        })
    }

    /// The compressed (`#~`) or uncompressed (`#-`) tables stream, if present
    #[must_use]
    pub fn tables_stream(&self) -> Option<&StreamHeader> {
        self.stream_headers
            .iter()
            .find(|header| header.name == "#~" || header.name == "#-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', b'.', 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x01, 0x00,

            0x24, 0x00, 0x00, 0x00, // StreamHeader
            0x04, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,

            0xAA, 0xBB, 0xCC, 0xDD,
        ];

        let parsed_header = Root::read(&header_bytes).unwrap();

        assert_eq!(parsed_header.signature, CIL_HEADER_MAGIC);
        assert_eq!(parsed_header.major_version, 1);
        assert_eq!(parsed_header.minor_version, 1);
        assert_eq!(parsed_header.length, 8);
        assert_eq!(parsed_header.version, "v4.0.");
        assert_eq!(parsed_header.stream_number, 1);
        assert_eq!(parsed_header.stream_headers[0].offset, 0x24);
        assert_eq!(parsed_header.stream_headers[0].size, 0x4);
        assert_eq!(parsed_header.tables_stream().unwrap().name, "#~");
    }

    #[test]
    fn invalid() {
        let mut bytes = vec![0u8; 40];
        assert!(Root::read(&bytes).is_err());

        bytes[..4].copy_from_slice(&CIL_HEADER_MAGIC.to_le_bytes());
        bytes[12] = 0xFF;
        assert!(Root::read(&bytes).is_err());

        // stream directory pointing outside the metadata
        #[rustfmt::skip]
        let header_bytes = [
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00, 0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            b'v', b'4', 0x00, 0x00,
            0x00, 0x00, 0x01, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x40, 0x00, 0x00, 0x00,
            0x23, 0x7E, 0x00, 0x00,
        ];
        assert!(Root::read(&header_bytes).is_err());
    }
}
