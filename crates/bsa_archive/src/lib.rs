//! This library handles reading from and extracting the **BSA** and **BA2** archives used by
//! the games built on Bethesda's engines.
//!
//! # Archive Format Documentation
//!
//! Over the years five incompatible layouts have been shipped under the same role. The
//! first four bytes of a file decide which one is in use:
//!
//! | Magic (LE u32) | Dialect                 | Module                      |
//! |----------------|-------------------------|-----------------------------|
//! | `0x00000100`   | Classic                 | [`dialect::classic`]        |
//! | `BSA\0`        | Tagged folder           | [`dialect::tagged`]         |
//! | `BTDX`         | BA2, `GNRL` or `DX10`   | [`dialect::ba2`]            |
//! | anything else  | Legacy, footer driven   | [`dialect::legacy`]         |
//!
//! ## Entries
//!
//! Whatever the layout, every archived file is described by an [`Entry`]: its full path
//! (segments separated by `\`), the offset of the stored data, the stored and decompressed
//! sizes, and whether the data is zlib compressed. Textures of `DX10` archives carry their
//! dimensions, DXGI format and mip chunks in addition; they are rebuilt into `.dds` files
//! when extracted.
//!
//! ## Compression
//!
//! Compressed data is a zlib stream. Depending on the layout it is preceded by a four byte
//! decompressed length and, when the archive sets the matching flag, by a length prefixed
//! copy of the file's full path.
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.bsa`, `.ba2`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod compression;
pub mod cursor;
pub mod dialect;
pub mod entry;
pub mod error;
mod extract;
pub mod read;
pub mod texture;
pub mod tree;
pub mod types;

pub use dialect::{ArchiveInfo, Dialect};
pub use entry::{Entry, FileEntry, TextureChunk, TextureEntry};
pub use read::{Archive, EntryReader, ExtractOptions, ExtractSummary};
pub use tree::{ArchiveNode, ArchiveTree, NodeId};
