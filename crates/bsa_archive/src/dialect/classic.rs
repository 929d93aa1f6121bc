//! Classic archives with magic `0x100`.
//!
//! | Offset (bytes)          | Field          | Description                                   |
//! |-------------------------|----------------|-----------------------------------------------|
//! | 0x0000                  | Magic          | 4 bytes: 0x00000100                           |
//! | 0x0004                  | Record offset  | 4 bytes: hash table offset minus 12           |
//! | 0x0008                  | File count     | 4 bytes                                       |
//! | 0x000C                  | Records        | 8 bytes each: size, relative data offset      |
//! | 0x000C + 8n             | Name offsets   | 4 bytes each, relative to the name block      |
//! | 0x000C + 12n            | Names          | NUL terminated full paths, in record order    |
//! | 0x000C + record offset  | Hashes         | 8 bytes each                                  |
//! | hashes + 8n             | Data           |                                               |
//!
//! Files in this dialect are never compressed. Names are read one after another; the name
//! offsets are not used to locate them. Archives cut off before the hash table still load,
//! with every hash left at zero.

use binrw::BinRead;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek};
use tracing::{debug, warn};

use super::{bounded_capacity, ArchiveInfo, Dialect, ParsedArchive, CLASSIC_MAGIC};
use crate::cursor::ByteCursor;
use crate::entry::{Entry, FileEntry};
use crate::error::Result;
use crate::types::{ClassicHeader, ClassicRecord};

const HEADER_LEN: u64 = 12;

/// Parse a classic archive.
pub fn parse<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<ParsedArchive> {
    cursor.seek_to(4)?;
    let header = ClassicHeader::read(cursor)?;
    let count = header.file_count as u64;
    let data_offset = HEADER_LEN + header.record_offset as u64 + count * 8;

    let mut files = Vec::with_capacity(bounded_capacity(
        header.file_count,
        8,
        cursor.remaining(),
    ));
    for _ in 0..header.file_count {
        let record = ClassicRecord::read(cursor)?;
        files.push(FileEntry {
            size: record.size,
            offset: record.offset as u64 + data_offset,
            ..Default::default()
        });
    }

    let name_offsets = (0..header.file_count)
        .map(|_| cursor.read_u32::<LittleEndian>())
        .collect::<std::io::Result<Vec<_>>>()?;

    let name_block = cursor.position();
    for (file, name_offset) in files.iter_mut().zip(name_offsets) {
        let relative = cursor.position() - name_block;
        if u64::from(name_offset) != relative {
            debug!(name_offset, relative, "name offset does not match the name order");
        }
        let path = cursor.read_cstring()?;
        file.set_full_path(path);
    }

    let hash_table = HEADER_LEN + header.record_offset as u64;
    if hash_table.saturating_add(count * 8) > cursor.len() {
        warn!(count, "archive ends before its hash table, leaving hashes empty");
    } else {
        cursor.seek_to(hash_table)?;
        for file in files.iter_mut() {
            file.hash = cursor.read_u64::<LittleEndian>()?;
        }
    }

    Ok(ParsedArchive {
        info: ArchiveInfo::new(Dialect::Classic, CLASSIC_MAGIC, header.file_count),
        entries: files.into_iter().map(Entry::General).collect(),
    })
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::parse;
    use crate::cursor::ByteCursor;
    use crate::error::Result;

    #[test]
    fn read_two_files() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            // Header
            0x00, 0x01, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            // Records
            0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x03, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00,
            // Name offsets
            0x00, 0x00, 0x00, 0x00,
            0x04, 0x00, 0x00, 0x00,
            // Names (8)
            b'a', b'.', b'b', 0x00,
            b'c', b'\\', b'd', 0x00,
            // Hashes
            0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x22, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Data
            b'h', b'i', b'y', b'o', b'u',
        ];

        let mut cursor = ByteCursor::new(Cursor::new(input))?;
        let parsed = parse(&mut cursor)?;

        assert_eq!(parsed.entries.len(), 2);

        let first = parsed.entries[0].file();
        assert_eq!(first.full_path, "a.b");
        assert_eq!(first.offset, 60);
        assert_eq!(first.size, 2);
        assert_eq!(first.hash, 0x11);

        let second = parsed.entries[1].file();
        assert_eq!(second.full_path, "c\\d");
        assert_eq!(second.folder_path, "c");
        assert_eq!(second.offset, 62);
        assert_eq!(second.hash, 0x22);
        assert!(!second.compressed);

        Ok(())
    }

    #[test]
    fn names_follow_record_order() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            // Header
            0x00, 0x01, 0x00, 0x00,
            0x24, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00,
            // Records
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
            // Name offsets, in the opposite order of the names
            0x06, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            // Names (12)
            b'b', b'.', b't', b'x', b't', 0x00,
            b'a', b'.', b't', b'x', b't', 0x00,
            // Hashes
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Data
            b'B', b'A',
        ];

        let mut cursor = ByteCursor::new(Cursor::new(input))?;
        let parsed = parse(&mut cursor)?;

        let names: Vec<_> = parsed.entries.iter().map(|e| e.full_path()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(parsed.entries[0].file().offset, 64);
        assert_eq!(parsed.entries[1].file().hash, 0x02);

        Ok(())
    }

    #[traced_test]
    #[test]
    fn missing_hash_table_still_loads() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            // Header
            0x00, 0x01, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00,
            // Record
            0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            // Name offset
            0x00, 0x00, 0x00, 0x00,
            // Name (4), then the stream ends
            b'a', b'.', b'b', 0x00,
        ];

        let mut cursor = ByteCursor::new(Cursor::new(input))?;
        let parsed = parse(&mut cursor)?;

        assert_eq!(parsed.entries.len(), 1);
        let file = parsed.entries[0].file();
        assert_eq!(file.full_path, "a.b");
        assert_eq!(file.hash, 0);
        assert!(logs_contain("archive ends before its hash table"));

        Ok(())
    }
}
