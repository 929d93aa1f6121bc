//! Fixed layout structures found on disk.
//!
//! Every structure here is read after the leading four byte magic, which the
//! dialect detection has already consumed. All data is stored in little endian format.

use binrw::{BinRead, BinResult, BinWrite};

/// `BSA\0` archive flag: files are compressed unless their size says otherwise
pub const TAGGED_COMPRESSED_BY_DEFAULT: u32 = 0x0004;

/// `BSA\0` archive flag: each data block starts with the file's full path
pub const TAGGED_PREFIXED_NAMES: u32 = 0x0100;

/// Bit 30 of a `BSA\0` file size inverts the archive wide compression default
pub const TAGGED_COMPRESSION_TOGGLE: u32 = 1 << 30;

/// Low 30 bits of a `BSA\0` file size carry the stored length
pub const TAGGED_SIZE_MASK: u32 = 0x3FFF_FFFF;

/// Header of a classic (`0x100`) archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ClassicHeader {
    /// Offset of the hash table, relative to the end of this header
    pub record_offset: u32,

    /// The number of files stored in the archive
    pub file_count: u32,
}

/// File record of a classic archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ClassicRecord {
    /// Stored size of the file
    pub size: u32,

    /// Offset of the data, relative to the start of the data section
    pub offset: u32,
}

/// Header of a tagged folder (`BSA\0`) archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct TaggedHeader {
    /// Format version, `0x67`, `0x68` or `0x69`
    pub version: u32,

    /// Offset of the folder records, always the header length
    pub record_offset: u32,

    /// Archive wide flags, see [`TAGGED_COMPRESSED_BY_DEFAULT`] and [`TAGGED_PREFIXED_NAMES`]
    pub archive_flags: u32,

    /// The number of folders stored in the archive
    pub folder_count: u32,

    /// The number of files stored in the archive
    pub file_count: u32,

    /// Total length of all folder names
    pub folder_name_length: u32,

    /// Total length of all file names
    pub file_name_length: u32,

    /// Content flags (meshes, textures, ...)
    pub file_flags: u32,
}

#[binrw::parser(reader, endian)]
fn folder_offset(wide: bool) -> BinResult<u64> {
    if wide {
        u64::read_options(reader, endian, ())
    } else {
        u32::read_options(reader, endian, ()).map(u64::from)
    }
}

/// Folder record of a tagged folder archive
///
/// The 64-bit variant pads the file count and widens the offset.
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq)]
#[br(little, import(wide: bool))]
pub struct FolderRecord {
    /// Hash of the folder path
    pub hash: u64,

    /// The number of file records that follow this folder's name
    pub file_count: u32,

    /// Padding present in the 64-bit variant only
    #[br(if(wide))]
    pub padding: u32,

    /// Offset of this folder's name and file records
    #[br(parse_with = folder_offset, args(wide))]
    pub offset: u64,
}

/// File record of a tagged folder archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct FileRecord {
    /// Hash of the file name
    pub hash: u64,

    /// Stored size, possibly carrying [`TAGGED_COMPRESSION_TOGGLE`]
    pub size: u32,

    /// Absolute offset of the data
    pub offset: u32,
}

/// Header of a `BTDX` archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct Ba2Header {
    /// Format version
    pub version: u32,

    /// Payload tag, `GNRL` or `DX10`
    pub tag: u32,

    /// The number of files stored in the archive
    pub file_count: u32,

    /// Absolute offset of the trailing name table
    pub name_table_offset: u64,
}

/// File record of a `GNRL` archive
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct GeneralRecord {
    /// Hash of the file name
    pub name_hash: u32,

    /// Extension, NUL padded
    pub extension: [u8; 4],

    /// Hash of the directory
    pub dir_hash: u32,

    /// Unused flags
    pub flags: u32,

    /// Absolute offset of the data
    pub offset: u64,

    /// Compressed size, or the stored size when `real_size` is zero
    pub size: u32,

    /// Decompressed size, zero when the data is stored as is
    pub real_size: u32,

    /// Always `0xBAADF00D`
    pub align: u32,
}

/// Texture record of a `DX10` archive, followed by its chunk descriptors
#[derive(BinRead, BinWrite, Debug, Default, Clone, PartialEq)]
#[brw(little)]
pub struct TextureRecord {
    /// Hash of the file name
    pub name_hash: u32,

    /// Extension, NUL padded
    pub extension: [u8; 4],

    /// Hash of the directory
    pub dir_hash: u32,

    /// Unknown
    pub unknown: u8,

    /// The number of chunk descriptors that follow
    pub chunk_count: u8,

    /// Length of a single chunk descriptor
    pub chunk_header_length: u16,

    /// Height of the top mip
    pub height: u16,

    /// Width of the top mip
    pub width: u16,

    /// The number of mips
    pub mip_count: u8,

    /// DXGI format
    pub format: u8,

    /// Unknown
    pub unknown_tail: u16,

    /// Chunk descriptors in stored order
    #[br(count = chunk_count)]
    pub chunks: Vec<ChunkRecord>,
}

/// One chunk descriptor of a texture record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub struct ChunkRecord {
    /// Absolute offset of the chunk data
    pub offset: u64,

    /// Compressed size, zero when stored as is
    pub packed_size: u32,

    /// Decompressed size
    pub full_size: u32,

    /// First mip covered by this chunk
    pub start_mip: u16,

    /// Last mip covered by this chunk
    pub end_mip: u16,

    /// Always `0xBAADF00D`
    pub align: u32,
}
