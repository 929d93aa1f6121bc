//! Locating the payload of an entry and streaming it into a sink.
//!
//! How the stored bytes are laid out depends on the dialect of the archive:
//!
//! - `BSA\0` (32-bit), classic and legacy archives: an optional length prefixed copy of
//!   the full path, then either the raw bytes or a four byte decompressed length followed
//!   by a zlib stream. Legacy archives record the decompressed length in the entry and
//!   store the zlib stream directly.
//! - `BSA\0` (64-bit): the low 30 bits of the size are the stored length, which includes
//!   the optional path prefix and the four byte decompressed length.
//! - `BTDX`: raw or zlib compressed bytes at the recorded offset. Textures are rebuilt
//!   from their chunks.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, ErrorKind, Read, Seek, Write};
use tracing::{debug, trace};

use crate::compression::{inflate_exact, BlockReader};
use crate::cursor::ByteCursor;
use crate::dialect::{ArchiveInfo, Dialect};
use crate::entry::{Entry, FileEntry};
use crate::error::{Error, Result};
use crate::texture;
use crate::types::TAGGED_SIZE_MASK;

/// A positioned payload and the number of bytes it is expected to yield
pub(crate) struct Payload<'a, R: Read> {
    pub reader: BlockReader<'a, ByteCursor<R>>,
    pub len: u64,
}

impl<'a, R: Read> Payload<'a, R> {
    fn raw(cursor: &'a mut ByteCursor<R>, len: u64) -> Self {
        Self {
            reader: BlockReader::raw(cursor, len),
            len,
        }
    }

    fn buffered(data: Vec<u8>) -> Self {
        Self {
            len: data.len() as u64,
            reader: BlockReader::buffered(data),
        }
    }

    /// Classify a failure reading this payload.
    ///
    /// Streamed blocks are known to lie within the stream before decoding starts, so a
    /// decoder that fails or runs out of input is looking at a damaged block.
    pub fn error(&self, err: io::Error, path: &str) -> Error {
        match err.kind() {
            ErrorKind::UnexpectedEof | ErrorKind::InvalidInput | ErrorKind::InvalidData
                if self.reader.is_compressed() =>
            {
                Error::CorruptEntry(path.to_owned())
            }
            _ => Error::for_entry(err, path),
        }
    }

    /// Error for a payload that yielded fewer than `len` bytes.
    pub fn ended_early(&self, path: &str, produced: u64) -> Error {
        debug!(path, produced, expected = self.len, "payload ended early");
        if self.reader.is_compressed() {
            Error::CorruptEntry(path.to_owned())
        } else {
            Error::TruncatedArchive(path.to_owned())
        }
    }
}

/// Position the cursor on the payload of `entry`.
///
/// Compressed payloads of the 32-bit layouts, BA2 files and textures are decoded here in
/// full; everything else is streamed by the returned reader.
pub(crate) fn open_payload<'a, R: Read + Seek>(
    cursor: &'a mut ByteCursor<R>,
    info: &ArchiveInfo,
    entry: &Entry,
) -> Result<Payload<'a, R>> {
    let file = match entry {
        Entry::Texture(texture) => {
            return texture::reconstruct(cursor, texture).map(Payload::buffered);
        }
        Entry::General(file) => file,
    };

    trace!(path = %file.full_path, offset = file.offset, size = file.size, "opening payload");

    let payload = match info.dialect {
        Dialect::General | Dialect::Texture | Dialect::UnknownBa2(_) => ba2_payload(cursor, file),
        Dialect::TaggedWide => wide_payload(cursor, file, info.prefixed_names),
        Dialect::Tagged | Dialect::Classic | Dialect::Legacy => {
            narrow_payload(cursor, file, info.prefixed_names)
        }
    };

    payload.map_err(|e| Error::for_entry(e, &file.full_path))
}

fn skip_path_prefix<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> io::Result<u64> {
    let len = cursor.read_u8()?;
    cursor.skip(u64::from(len))?;
    Ok(u64::from(len) + 1)
}

fn corrupt(message: &str) -> io::Error {
    io::Error::new(ErrorKind::InvalidData, message.to_owned())
}

fn narrow_payload<'a, R: Read + Seek>(
    cursor: &'a mut ByteCursor<R>,
    file: &FileEntry,
    prefixed_names: bool,
) -> io::Result<Payload<'a, R>> {
    cursor.seek_to(file.offset)?;
    if prefixed_names {
        skip_path_prefix(cursor)?;
    }

    if !file.compressed {
        return Ok(Payload::raw(cursor, u64::from(file.size)));
    }

    let real_size = match file.real_size {
        0 => cursor.read_u32::<LittleEndian>()?,
        size => size,
    };
    let packed_len = file
        .size
        .checked_sub(4)
        .ok_or_else(|| corrupt("compressed block is shorter than its length field"))?;

    let packed = cursor.read_bytes(packed_len as usize)?;
    inflate_exact(&packed, real_size as usize).map(Payload::buffered)
}

fn wide_payload<'a, R: Read + Seek>(
    cursor: &'a mut ByteCursor<R>,
    file: &FileEntry,
    prefixed_names: bool,
) -> io::Result<Payload<'a, R>> {
    cursor.seek_to(file.offset)?;
    let stored = file.size & TAGGED_SIZE_MASK;
    let mut len = u64::from(stored);

    if prefixed_names {
        let prefix = skip_path_prefix(cursor)?;
        len = len
            .checked_sub(prefix)
            .ok_or_else(|| corrupt("stored length is shorter than the path prefix"))?;
    }

    if !file.compressed || stored == 0 {
        return Ok(Payload::raw(cursor, len));
    }

    let real_size = cursor.read_u32::<LittleEndian>()?;
    len = len
        .checked_sub(4)
        .ok_or_else(|| corrupt("compressed block is shorter than its length field"))?;

    // the decoder can not tell a cut off stream from a corrupt one
    if cursor.remaining() < len {
        return Err(ErrorKind::UnexpectedEof.into());
    }

    Ok(Payload {
        reader: BlockReader::compressed(cursor, len, u64::from(real_size)),
        len: u64::from(real_size),
    })
}

fn ba2_payload<'a, R: Read + Seek>(
    cursor: &'a mut ByteCursor<R>,
    file: &FileEntry,
) -> io::Result<Payload<'a, R>> {
    cursor.seek_to(file.offset)?;

    // records without a stored size hold the bytes verbatim
    if file.size == 0 || (file.compressed && file.compressed_size == 0) {
        return Ok(Payload::raw(cursor, u64::from(file.real_size)));
    }
    if !file.compressed {
        return Ok(Payload::raw(cursor, u64::from(file.size)));
    }

    let packed = cursor.read_bytes(file.compressed_size as usize)?;
    inflate_exact(&packed, file.real_size as usize).map(Payload::buffered)
}

/// Copy a payload into `sink`, returning the number of bytes written.
///
/// Failures reading the payload name `path`; failures writing to the sink are passed on.
pub(crate) fn copy_payload<R: Read>(
    payload: &mut Payload<'_, R>,
    path: &str,
    sink: &mut impl Write,
) -> Result<u64> {
    let mut buffer = [0u8; 16 * 1024];
    let mut written = 0u64;

    loop {
        let read = match payload.reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(payload.error(e, path)),
        };

        sink.write_all(&buffer[..read])?;
        written += read as u64;
    }

    if written < payload.len {
        return Err(payload.ended_early(path, written));
    }

    Ok(written)
}
