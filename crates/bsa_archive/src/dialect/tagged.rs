//! Tagged folder archives with magic `BSA\0`.
//!
//! After the 36 byte header come the folder records, then for each folder a length
//! prefixed folder path followed by that folder's file records, and finally one NUL
//! terminated name per file in the same order.
//!
//! Versions `0x67` and `0x68` use 32-bit folder offsets and let bit 30 of a file size
//! invert the archive wide compression default. Version `0x69` widens the folder offset
//! to 64 bits and has no toggle bit.

use binrw::BinRead;
use std::io::{Read, Seek};
use tracing::warn;

use super::{bounded_capacity, ArchiveInfo, Dialect, ParsedArchive, TAGGED_MAGIC, TAGGED_VERSION_WIDE};
use crate::cursor::ByteCursor;
use crate::entry::{Entry, FileEntry, PATH_SEPARATOR};
use crate::error::Result;
use crate::types::{
    FileRecord, FolderRecord, TaggedHeader, TAGGED_COMPRESSED_BY_DEFAULT,
    TAGGED_COMPRESSION_TOGGLE, TAGGED_PREFIXED_NAMES,
};

/// Parse a tagged folder archive of either width.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<ParsedArchive> {
    cursor.seek_to(4)?;
    let header = TaggedHeader::read(cursor)?;
    let wide = header.version == TAGGED_VERSION_WIDE;
    let compressed_by_default = header.archive_flags & TAGGED_COMPRESSED_BY_DEFAULT != 0;
    let prefixed_names = header.archive_flags & TAGGED_PREFIXED_NAMES != 0;

    let folder_len = if wide { 24 } else { 16 };
    let mut folders = Vec::with_capacity(bounded_capacity(
        header.folder_count,
        folder_len,
        cursor.remaining(),
    ));
    for _ in 0..header.folder_count {
        folders.push(FolderRecord::read_args(cursor, (wide,))?);
    }

    let mut files = Vec::with_capacity(bounded_capacity(
        header.file_count,
        16,
        cursor.remaining(),
    ));
    for folder in &folders {
        let folder_path = cursor.read_u8_prefixed_string()?;

        for _ in 0..folder.file_count {
            let record = FileRecord::read(cursor)?;
            let (size, compressed) = file_size(record.size, compressed_by_default, wide);

            files.push(FileEntry {
                hash: record.hash,
                size,
                offset: record.offset as u64,
                compressed,
                folder_path: folder_path.clone(),
                ..Default::default()
            });
        }
    }

    if files.len() != header.file_count as usize {
        warn!(
            declared = header.file_count,
            found = files.len(),
            "folder records disagree with the header file count"
        );
    }

    for file in files.iter_mut() {
        let name = cursor.read_cstring()?;
        let full_path = format!("{}{}{}", file.folder_path, PATH_SEPARATOR, name);
        file.set_full_path(full_path);
    }

    Ok(ParsedArchive {
        info: ArchiveInfo {
            dialect: if wide {
                Dialect::TaggedWide
            } else {
                Dialect::Tagged
            },
            magic: TAGGED_MAGIC,
            version: header.version,
            flags: header.archive_flags,
            file_count: header.file_count,
            compressed_by_default,
            prefixed_names,
        },
        entries: files.into_iter().map(Entry::General).collect(),
    })
}

/// Resolve the stored size and compression of one file record.
///
/// Only the 32-bit variant honours the toggle bit; the 64-bit variant keeps the raw size.
fn file_size(raw: u32, compressed_by_default: bool, wide: bool) -> (u32, bool) {
    if !wide && raw & TAGGED_COMPRESSION_TOGGLE != 0 {
        (raw ^ TAGGED_COMPRESSION_TOGGLE, !compressed_by_default)
    } else {
        (raw, compressed_by_default)
    }
}
