//! Bounded, independently positioned views over image bytes.
//!
//! A [`ByteStream`] covers a fixed window `[start, start + len)` of a [`Backend`] and keeps
//! its own cursor. Streams share the backend through an `Arc`, so the bytes stay alive for
//! as long as any stream (or the image that produced it) does, and dropping a stream is all
//! that is needed to release it.

use std::{fmt, io, sync::Arc};

use crate::{
    file::{
        io::{read_le_at, LeBytes},
        memory::Memory,
        Backend,
    },
    Error::{InvalidRange, OutOfBounds},
    Result,
};

/// A bounded, seekable, little-endian reader over a window of image bytes.
///
/// Positions passed to and returned by the stream are relative to the start of the window.
///
/// ```rust
/// use cilimage::file::ByteStream;
///
/// let mut stream = ByteStream::from_vec(vec![0x01, 0x00, 0x02, 0x00, 0x00, 0x00]);
/// assert_eq!(stream.read_le::<u16>()?, 1);
/// assert_eq!(stream.read_le::<u32>()?, 2);
/// assert_eq!(stream.remaining(), 0);
/// # Ok::<(), cilimage::Error>(())
/// ```
#[derive(Clone)]
pub struct ByteStream {
    source: Arc<dyn Backend>,
    start: usize,
    len: usize,
    position: usize,
}

impl ByteStream {
    /// Create a stream over `[start, start + len)` of `source`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRange`] if the window does not fit into the source
    pub fn new(source: Arc<dyn Backend>, start: usize, len: usize) -> Result<ByteStream> {
        let fits = start
            .checked_add(len)
            .is_some_and(|end| end <= source.len());
        if !fits {
            return Err(InvalidRange {
                offset: start as u64,
                length: len as u64,
            });
        }

        Ok(ByteStream {
            source,
            start,
            len,
            position: 0,
        })
    }

    /// Create a stream that owns `data`.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> ByteStream {
        let len = data.len();
        ByteStream {
            source: Arc::new(Memory::new(data)),
            start: 0,
            len,
            position: 0,
        }
    }

    /// Create a stream over a sub-window of this one, starting at `offset` relative to this
    /// stream. The new stream shares the same backend and starts at position 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidRange`] if the window exceeds this stream
    pub fn sub_stream(&self, offset: usize, len: usize) -> Result<ByteStream> {
        let fits = offset.checked_add(len).is_some_and(|end| end <= self.len);
        if !fits {
            return Err(InvalidRange {
                offset: offset as u64,
                length: len as u64,
            });
        }

        ByteStream::new(self.source.clone(), self.start + offset, len)
    }

    /// The bytes covered by this stream
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.source
            .data()
            .get(self.start..self.start + self.len)
            .unwrap_or_default()
    }

    /// The absolute offset of the stream window within its source
    #[must_use]
    pub fn start(&self) -> usize {
        self.start
    }

    /// Length of the window in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current cursor position
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Bytes left between the cursor and the end of the window
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.len - self.position
    }

    /// Move the cursor to `pos`. Seeking to the end of the window is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the window
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.len {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Advance the cursor by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if that would move past the end of the window
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        match self.position.checked_add(step) {
            Some(pos) if pos <= self.len => {
                self.position = pos;
                Ok(())
            }
            _ => Err(OutOfBounds),
        }
    }

    /// Round the cursor up to the next multiple of `alignment`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `alignment` is 0 or the aligned position is
    /// past the window
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment == 0 {
            return Err(OutOfBounds);
        }

        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Read a little-endian value and advance the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the window
    pub fn read_le<T: LeBytes>(&mut self) -> Result<T> {
        let mut position = self.position;
        let value = read_le_at::<T>(self.data(), &mut position)?;
        self.position = position;
        Ok(value)
    }

    /// Read a little-endian value without moving the cursor.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the window
    pub fn peek_le<T: LeBytes>(&self) -> Result<T> {
        let mut position = self.position;
        read_le_at::<T>(self.data(), &mut position)
    }

    /// Borrow the next `len` bytes and advance the cursor past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain
    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let start = self.position;
        self.advance_by(len)?;
        Ok(&self.data()[start..start + len])
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream")
            .field("start", &self.start)
            .field("len", &self.len)
            .field("position", &self.position)
            .finish()
    }
}

impl io::Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len().min(self.remaining());
        let start = self.position;
        buf[..count].copy_from_slice(&self.data()[start..start + count]);
        self.position += count;
        Ok(count)
    }
}

impl io::Seek for ByteStream {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => i128::from(offset),
            io::SeekFrom::End(offset) => self.len as i128 + i128::from(offset),
            io::SeekFrom::Current(offset) => self.position as i128 + i128::from(offset),
        };

        if target < 0 || target > self.len as i128 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek outside of the stream window",
            ));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let target = target as usize;
        self.position = target;
        Ok(target as u64)
    }
}
