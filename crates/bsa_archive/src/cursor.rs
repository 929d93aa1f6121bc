//! Position tracking binary reader used by every dialect parser and by extraction.
//!
//! Numeric reads come from [`byteorder::ReadBytesExt`], which is available on any
//! [`ByteCursor`] since it implements [`Read`]. Both byte orders are therefore supported:
//! `cursor.read_u32::<LittleEndian>()` and `cursor.read_u32::<BigEndian>()`.

use byteorder::{ByteOrder, ReadBytesExt};
use std::io::{self, Read, Seek, SeekFrom};

/// A seekable reader that knows its own position and the total length of the stream.
///
/// The cursor is owned by exactly one [`crate::Archive`]; every parse and extraction
/// borrows it mutably, so only one operation can move it at a time.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: R,
    position: u64,
    len: u64,
}

impl<R> ByteCursor<R> {
    /// Total length of the underlying stream in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the underlying stream is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current absolute position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left between the current position and the end of the stream
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> ByteCursor<R> {
    /// Wrap a reader, measuring its length and rewinding it to the start.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            position: 0,
            len,
        })
    }

    /// Move to an absolute position.
    pub fn seek_to(&mut self, position: u64) -> io::Result<()> {
        self.seek(SeekFrom::Start(position)).map(|_| ())
    }

    /// Move forward by `count` bytes.
    pub fn skip(&mut self, count: u64) -> io::Result<()> {
        let target = self
            .position
            .checked_add(count)
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        self.seek_to(target)
    }

    /// Read exactly `count` bytes.
    ///
    /// Requests reaching past the end of the stream fail before anything is allocated.
    pub fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>> {
        if count as u64 > self.remaining() {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        let mut buffer = vec![0u8; count];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a string stored in exactly `count` bytes, dropping trailing NULs.
    pub fn read_fixed_string(&mut self, count: usize) -> io::Result<String> {
        let bytes = self.read_bytes(count)?;
        Ok(decode_trimmed(&bytes))
    }

    /// Read a string prefixed by a single length byte.
    pub fn read_u8_prefixed_string(&mut self) -> io::Result<String> {
        let count = self.read_u8()?;
        self.read_fixed_string(count as usize)
    }

    /// Read a string prefixed by a two byte length.
    pub fn read_u16_prefixed_string<E: ByteOrder>(&mut self) -> io::Result<String> {
        let count = self.read_u16::<E>()?;
        self.read_fixed_string(count as usize)
    }

    /// Read a string prefixed by a four byte length.
    pub fn read_u32_prefixed_string<E: ByteOrder>(&mut self) -> io::Result<String> {
        let count = self.read_u32::<E>()?;
        self.read_fixed_string(count as usize)
    }

    /// Read bytes up to (and consuming) the next NUL.
    pub fn read_cstring(&mut self) -> io::Result<String> {
        let mut raw = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == b'\0' {
                break;
            }
            raw.push(byte);
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

}

fn decode_trimmed(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| *b != b'\0')
        .map_or(0, |last| last + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl<R: Read> Read for ByteCursor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        self.position += read as u64;
        Ok(read)
    }
}

impl<R: Seek> Seek for ByteCursor<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.position = self.inner.seek(pos)?;
        Ok(self.position)
    }
}
