//! BA2 archives with magic `BTDX`.
//!
//! | Offset (bytes) | Field              | Description                                       |
//! |----------------|--------------------|---------------------------------------------------|
//! | 0x0000         | Magic number       | 4 bytes: "BTDX"                                   |
//! | 0x0004         | Version            | 4 bytes                                           |
//! | 0x0008         | Payload tag        | 4 bytes: "GNRL" or "DX10"                         |
//! | 0x000C         | File count         | 4 bytes                                           |
//! | 0x0010         | Name table offset  | 8 bytes: absolute offset of the name table        |
//!
//! The header is followed by one fixed size record per file (`GNRL`) or one texture
//! record plus its chunk descriptors per file (`DX10`). The name table holds one 2 byte
//! length prefixed full path per file, in record order.

use binrw::BinRead;
use byteorder::LittleEndian;
use std::io::{Read, Seek};
use tracing::warn;

use super::{
    bounded_capacity, ArchiveInfo, Dialect, ParsedArchive, BA2_MAGIC, BA2_TAG_GENERAL,
    BA2_TAG_TEXTURE,
};
use crate::cursor::ByteCursor;
use crate::entry::{Entry, FileEntry, TextureChunk, TextureEntry};
use crate::error::{Error, Result};
use crate::types::{Ba2Header, GeneralRecord, TextureRecord};

const GENERAL_RECORD_LEN: u64 = 36;
const TEXTURE_RECORD_LEN: u64 = 24;

/// Parse a BA2 archive of any payload tag.
///
/// Unknown tags do not fail the load: every declared file becomes an empty entry.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<ParsedArchive> {
    cursor.seek_to(4)?;
    let header = Ba2Header::read(cursor)?;
    let count = header.file_count;

    let (dialect, mut entries) = match header.tag {
        BA2_TAG_GENERAL => {
            let mut entries =
                Vec::with_capacity(bounded_capacity(count, GENERAL_RECORD_LEN, cursor.remaining()));
            for _ in 0..count {
                entries.push(general_entry(GeneralRecord::read(cursor)?));
            }
            (Dialect::General, entries)
        }
        BA2_TAG_TEXTURE => {
            let mut entries =
                Vec::with_capacity(bounded_capacity(count, TEXTURE_RECORD_LEN, cursor.remaining()));
            for _ in 0..count {
                entries.push(texture_entry(TextureRecord::read(cursor)?));
            }
            (Dialect::Texture, entries)
        }
        tag => {
            let err = Error::UnsupportedDialect(tag);
            warn!(%err, count, "substituting empty entries");
            // every placeholder still needs at least its name length in the stream
            if bounded_capacity(count, 2, cursor.len()) < count as usize {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
            (Dialect::UnknownBa2(tag), vec![Entry::default(); count as usize])
        }
    };

    if header.name_table_offset == 0 {
        warn!("archive has no name table");
    } else {
        cursor.seek_to(header.name_table_offset)?;
        for entry in entries.iter_mut() {
            let path = cursor.read_u16_prefixed_string::<LittleEndian>()?;
            let file = entry.file_mut();
            let extension = std::mem::take(&mut file.extension);
            file.set_full_path(path);
            if !extension.is_empty() {
                file.extension = extension;
            }
        }
    }

    Ok(ParsedArchive {
        info: ArchiveInfo {
            dialect,
            magic: BA2_MAGIC,
            version: header.version,
            flags: header.tag,
            file_count: count,
            compressed_by_default: false,
            prefixed_names: false,
        },
        entries,
    })
}

/// Normalise a `GNRL` record so that `size` always holds the logical length.
fn general_entry(record: GeneralRecord) -> Entry {
    let compressed = record.real_size != 0;

    Entry::General(FileEntry {
        extension: decode_extension(record.extension),
        hash: combine_hash(record.dir_hash, record.name_hash),
        offset: record.offset,
        compressed,
        compressed_size: if compressed { record.size } else { 0 },
        size: if compressed {
            record.real_size
        } else {
            record.size
        },
        real_size: record.real_size,
        ..Default::default()
    })
}

fn texture_entry(record: TextureRecord) -> Entry {
    let chunks: Vec<TextureChunk> = record
        .chunks
        .iter()
        .map(|chunk| TextureChunk {
            offset: chunk.offset,
            packed_size: chunk.packed_size,
            full_size: chunk.full_size,
            start_mip: chunk.start_mip,
            end_mip: chunk.end_mip,
        })
        .collect();

    let full_size = chunks
        .iter()
        .fold(0u32, |total, chunk| total.saturating_add(chunk.full_size));
    let packed_size = chunks
        .iter()
        .fold(0u32, |total, chunk| total.saturating_add(chunk.packed_size));

    Entry::Texture(TextureEntry {
        file: FileEntry {
            extension: decode_extension(record.extension),
            hash: combine_hash(record.dir_hash, record.name_hash),
            offset: chunks.first().map_or(0, |chunk| chunk.offset),
            size: full_size,
            real_size: full_size,
            compressed_size: packed_size,
            compressed: chunks.iter().any(TextureChunk::is_compressed),
            ..Default::default()
        },
        height: record.height,
        width: record.width,
        mip_count: record.mip_count,
        format: record.format,
        chunks,
    })
}

fn combine_hash(dir_hash: u32, name_hash: u32) -> u64 {
    (u64::from(dir_hash) << 32) | u64::from(name_hash)
}

fn decode_extension(raw: [u8; 4]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
