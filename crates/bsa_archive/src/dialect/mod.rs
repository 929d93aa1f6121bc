//! Detection of the archive layout and one parser per layout.
//!
//! Every parser is a plain function taking the cursor and returning the entries in stored
//! order together with the header values the extraction needs later on.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::{Read, Seek};

use crate::cursor::ByteCursor;
use crate::entry::Entry;
use crate::error::Result;

pub mod ba2;
pub mod classic;
pub mod legacy;
pub mod tagged;

/// Magic of a classic archive
pub const CLASSIC_MAGIC: u32 = 0x0000_0100;

/// Magic of a tagged folder archive, the literal string "BSA\0"
pub const TAGGED_MAGIC: u32 = 0x0041_5342;

/// Magic of a BA2 archive, the literal string "BTDX"
pub const BA2_MAGIC: u32 = 0x5844_5442;

/// Tagged folder version using 64-bit folder offsets
pub const TAGGED_VERSION_WIDE: u32 = 0x69;

/// BA2 payload tag for general files, the literal string "GNRL"
pub const BA2_TAG_GENERAL: u32 = 0x4C52_4E47;

/// BA2 payload tag for textures, the literal string "DX10"
pub const BA2_TAG_TEXTURE: u32 = 0x3031_5844;

/// The binary layouts that share the archive role
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dialect {
    /// No leading magic; the record table is found through an eight byte footer
    Legacy,
    /// Magic `0x100`; flat record table followed by names and hashes
    Classic,
    /// Magic `BSA\0` with 32-bit folder offsets
    Tagged,
    /// Magic `BSA\0` version `0x69` with 64-bit folder offsets
    TaggedWide,
    /// Magic `BTDX` with a `GNRL` payload
    General,
    /// Magic `BTDX` with a `DX10` payload
    Texture,
    /// Magic `BTDX` with an unknown payload tag; entries are empty placeholders
    UnknownBa2(u32),
}

impl Dialect {
    /// Inspect the leading bytes of the stream to pick a dialect.
    pub fn detect<R: Read + Seek>(cursor: &mut ByteCursor<R>) -> Result<Dialect> {
        if cursor.len() < 4 {
            return Ok(Dialect::Legacy);
        }

        cursor.seek_to(0)?;
        let dialect = match cursor.read_u32::<LittleEndian>()? {
            BA2_MAGIC => {
                cursor.seek_to(8)?;
                match cursor.read_u32::<LittleEndian>()? {
                    BA2_TAG_GENERAL => Dialect::General,
                    BA2_TAG_TEXTURE => Dialect::Texture,
                    tag => Dialect::UnknownBa2(tag),
                }
            }
            CLASSIC_MAGIC => Dialect::Classic,
            TAGGED_MAGIC => match cursor.read_u32::<LittleEndian>()? {
                TAGGED_VERSION_WIDE => Dialect::TaggedWide,
                _ => Dialect::Tagged,
            },
            _ => Dialect::Legacy,
        };

        Ok(dialect)
    }

    /// Run the parser belonging to this dialect.
    ///
    /// `source` names the archive in errors.
    pub fn parse<R: Read + Seek>(
        self,
        cursor: &mut ByteCursor<R>,
        source: &str,
    ) -> Result<ParsedArchive> {
        match self {
            Dialect::Legacy => legacy::parse(cursor, source),
            Dialect::Classic => classic::parse(cursor),
            Dialect::Tagged | Dialect::TaggedWide => tagged::parse(cursor),
            Dialect::General | Dialect::Texture | Dialect::UnknownBa2(_) => ba2::parse(cursor),
        }
    }

    /// Whether this dialect belongs to the `BTDX` family
    pub fn is_ba2(&self) -> bool {
        matches!(
            self,
            Dialect::General | Dialect::Texture | Dialect::UnknownBa2(_)
        )
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Legacy => write!(f, "legacy (footer)"),
            Dialect::Classic => write!(f, "classic (0x100)"),
            Dialect::Tagged => write!(f, "BSA"),
            Dialect::TaggedWide => write!(f, "BSA (64-bit)"),
            Dialect::General => write!(f, "BA2 GNRL"),
            Dialect::Texture => write!(f, "BA2 DX10"),
            Dialect::UnknownBa2(tag) => write!(f, "BA2 {tag:#010x}"),
        }
    }
}

/// Header values discovered while loading
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub dialect: Dialect,
    /// Leading magic, zero for the legacy dialect
    pub magic: u32,
    pub version: u32,
    /// Archive flags; for `BTDX` archives this is the payload tag
    pub flags: u32,
    /// File count declared by the header
    pub file_count: u32,
    /// Files are compressed unless their record says otherwise
    pub compressed_by_default: bool,
    /// Data blocks start with a length prefixed copy of the full path
    pub prefixed_names: bool,
}

impl ArchiveInfo {
    pub(crate) fn new(dialect: Dialect, magic: u32, file_count: u32) -> Self {
        Self {
            dialect,
            magic,
            version: 0,
            flags: 0,
            file_count,
            compressed_by_default: false,
            prefixed_names: false,
        }
    }
}

/// Output of a dialect parser
#[derive(Debug, Clone)]
pub struct ParsedArchive {
    pub info: ArchiveInfo,
    pub entries: Vec<Entry>,
}

/// Capacity for `count` records of `record_len` bytes that the stream can actually hold.
pub(crate) fn bounded_capacity(count: u32, record_len: u64, remaining: u64) -> usize {
    let fits = remaining / record_len.max(1);
    (count as u64).min(fits) as usize
}
