//! Footer driven archives without a leading magic.
//!
//! | Location          | Field        | Description                                    |
//! |-------------------|--------------|------------------------------------------------|
//! | end - 8           | Tree size    | 4 bytes: length of the record table            |
//! | end - 4           | Data size    | 4 bytes: must equal the length of the stream   |
//! | data - tree - 8   | File count   | 4 bytes, followed by the records               |
//!
//! Each record is a 4 byte length prefixed path, a compression byte, the decompressed
//! size, the stored size and a 4 byte offset.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek};
use tracing::debug;

use super::{bounded_capacity, ArchiveInfo, Dialect, ParsedArchive};
use crate::cursor::ByteCursor;
use crate::entry::{Entry, FileEntry};
use crate::error::{Error, Result};

/// Smallest possible record: empty path, flag and three integers
const MIN_RECORD_LEN: u64 = 4 + 1 + 12;

/// Parse a legacy archive, rejecting it when the footer disagrees with the stream length.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>, source: &str) -> Result<ParsedArchive> {
    let invalid = || Error::InvalidArchive(source.to_owned());

    if cursor.len() < 8 {
        return Err(invalid());
    }

    cursor.seek_to(cursor.len() - 8)?;
    let tree_size = cursor.read_u32::<LittleEndian>()?;
    let data_size = cursor.read_u32::<LittleEndian>()?;

    if u64::from(data_size) != cursor.len() {
        debug!(data_size, len = cursor.len(), "footer does not match stream length");
        return Err(invalid());
    }

    let record_offset = data_size
        .checked_sub(tree_size)
        .and_then(|v| v.checked_sub(8))
        .ok_or_else(invalid)?;

    cursor.seek_to(record_offset as u64)?;
    let file_count = cursor.read_u32::<LittleEndian>()?;

    let mut entries = Vec::with_capacity(bounded_capacity(
        file_count,
        MIN_RECORD_LEN,
        cursor.remaining(),
    ));
    for _ in 0..file_count {
        let path = cursor.read_u32_prefixed_string::<LittleEndian>()?;
        let compressed = cursor.read_u8()? != 0;
        let real_size = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()?;
        let offset = cursor.read_u32::<LittleEndian>()?;

        let mut file = FileEntry {
            offset: offset as u64,
            size: compressed_size,
            compressed_size,
            real_size,
            compressed,
            ..Default::default()
        };
        file.set_full_path(path);
        entries.push(Entry::General(file));
    }

    Ok(ParsedArchive {
        info: ArchiveInfo::new(Dialect::Legacy, 0, file_count),
        entries,
    })
}
