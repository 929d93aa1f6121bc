//! Rebuilding `.dds` files from the chunks of a `DX10` archive.
//!
//! A texture is written as the four byte magic `DDS `, a 124 byte header with an embedded
//! 32 byte pixel format, and then the chunk payloads in stored order.
//!
//! | DXGI code | Format          | Linear size | Pixel format                 |
//! |-----------|-----------------|-------------|------------------------------|
//! | 61        | R8_UNORM        | w * h       | RGB, 8 bit, red mask `0xFF`  |
//! | 71        | BC1_UNORM       | w * h / 2   | FourCC `DXT1`                |
//! | 74        | BC2_UNORM       | w * h       | FourCC `DXT3`                |
//! | 77        | BC3_UNORM       | w * h       | FourCC `DXT5`                |
//! | 83        | BC5_UNORM       | w * h       | FourCC `DXT5`                |
//! | 87        | B8G8R8A8_UNORM  | w * h * 4   | RGBA, 32 bit                 |
//! | 98        | BC7_UNORM       | w * h       | FourCC `BC7\0`               |
//!
//! BC7 has no FourCC of its own and would need the extended DX10 header. The `BC7\0`
//! code is kept because existing tools recognise it.

use binrw::{binrw, BinWrite};
use std::io::{Cursor, Read, Seek, Write};
use tracing::{instrument, trace, warn};

use crate::compression::inflate_exact;
use crate::cursor::ByteCursor;
use crate::entry::TextureEntry;
use crate::error::{Error, Result};

/// Size of [`DdsHeader`] without the magic
pub const DDS_HEADER_SIZE: u32 = 124;

/// Size of [`DdsPixelFormat`]
pub const DDS_PIXEL_FORMAT_SIZE: u32 = 32;

/// `DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT`
pub const DDSD_TEXTURE: u32 = 0x0000_1007;
pub const DDSD_MIPMAPCOUNT: u32 = 0x0002_0000;
pub const DDSD_LINEARSIZE: u32 = 0x0008_0000;

pub const DDSCAPS_TEXTURE: u32 = 0x0000_1000;
/// `DDSCAPS_COMPLEX | DDSCAPS_MIPMAP`
pub const DDSCAPS_MIPMAP: u32 = 0x0040_0008;

pub const DDPF_FOURCC: u32 = 0x04;
pub const DDPF_RGB: u32 = 0x40;
/// `DDPF_RGB | DDPF_ALPHAPIXELS`
pub const DDPF_RGBA: u32 = 0x41;

/// Pixel formats that can be given a header
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelFormat {
    R8,
    Bc1,
    Bc2,
    Bc3,
    Bc5,
    B8G8R8A8,
    Bc7,
}

impl PixelFormat {
    /// Map a DXGI format code, `None` for anything without a known header.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            61 => Some(PixelFormat::R8),
            71 => Some(PixelFormat::Bc1),
            74 => Some(PixelFormat::Bc2),
            77 => Some(PixelFormat::Bc3),
            83 => Some(PixelFormat::Bc5),
            87 => Some(PixelFormat::B8G8R8A8),
            98 => Some(PixelFormat::Bc7),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PixelFormat::R8 => 61,
            PixelFormat::Bc1 => 71,
            PixelFormat::Bc2 => 74,
            PixelFormat::Bc3 => 77,
            PixelFormat::Bc5 => 83,
            PixelFormat::B8G8R8A8 => 87,
            PixelFormat::Bc7 => 98,
        }
    }

    /// Value written to `pitch_or_linear_size` for the top level image
    pub fn linear_size(self, width: u16, height: u16) -> u32 {
        let pixels = u32::from(width) * u32::from(height);
        match self {
            PixelFormat::Bc1 => pixels / 2,
            PixelFormat::B8G8R8A8 => pixels.wrapping_mul(4),
            PixelFormat::R8
            | PixelFormat::Bc2
            | PixelFormat::Bc3
            | PixelFormat::Bc5
            | PixelFormat::Bc7 => pixels,
        }
    }

    pub fn pixel_format(self) -> DdsPixelFormat {
        let base = DdsPixelFormat {
            size: DDS_PIXEL_FORMAT_SIZE,
            ..Default::default()
        };

        match self {
            PixelFormat::Bc1 => base.with_four_cc(*b"DXT1"),
            PixelFormat::Bc2 => base.with_four_cc(*b"DXT3"),
            PixelFormat::Bc3 | PixelFormat::Bc5 => base.with_four_cc(*b"DXT5"),
            PixelFormat::Bc7 => base.with_four_cc(*b"BC7\0"),
            PixelFormat::B8G8R8A8 => DdsPixelFormat {
                flags: DDPF_RGBA,
                rgb_bit_count: 32,
                r_bit_mask: 0x00FF_0000,
                g_bit_mask: 0x0000_FF00,
                b_bit_mask: 0x0000_00FF,
                a_bit_mask: 0xFF00_0000,
                ..base
            },
            PixelFormat::R8 => DdsPixelFormat {
                flags: DDPF_RGB,
                rgb_bit_count: 8,
                r_bit_mask: 0xFF,
                ..base
            },
        }
    }
}

/// `DDS_PIXELFORMAT`
#[binrw]
#[brw(little)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub four_cc: u32,
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

impl DdsPixelFormat {
    fn with_four_cc(self, code: [u8; 4]) -> Self {
        Self {
            flags: DDPF_FOURCC,
            four_cc: u32::from_le_bytes(code),
            ..self
        }
    }
}

/// `DDS_HEADER`, preceded on disk by the magic `DDS `
#[binrw]
#[brw(little, magic = b"DDS ")]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mip_map_count: u32,
    pub reserved1: [u32; 11],
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub reserved2: [u32; 3],
}

impl DdsHeader {
    /// Header describing `texture`, `None` when its format is not supported.
    pub fn for_texture(texture: &TextureEntry) -> Option<Self> {
        let format = PixelFormat::from_code(texture.format)?;

        Some(Self {
            size: DDS_HEADER_SIZE,
            flags: DDSD_TEXTURE | DDSD_LINEARSIZE | DDSD_MIPMAPCOUNT,
            height: u32::from(texture.height),
            width: u32::from(texture.width),
            pitch_or_linear_size: format.linear_size(texture.width, texture.height),
            mip_map_count: u32::from(texture.mip_count),
            pixel_format: format.pixel_format(),
            caps: DDSCAPS_TEXTURE | DDSCAPS_MIPMAP,
            ..Default::default()
        })
    }
}

/// Rebuild the `.dds` file of `texture`.
///
/// Unsupported formats produce an empty buffer. Chunks are appended in stored order.
#[instrument(skip_all, fields(path = %texture.file.full_path, format = texture.format))]
pub(crate) fn reconstruct<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    texture: &TextureEntry,
) -> Result<Vec<u8>> {
    let Some(header) = DdsHeader::for_texture(texture) else {
        warn!("unsupported texture format, skipping");
        return Ok(Vec::new());
    };

    let path = &texture.file.full_path;
    let mut output = Cursor::new(Vec::new());
    header.write(&mut output)?;

    for chunk in &texture.chunks {
        trace!(?chunk, "copying chunk");
        let data = read_chunk(cursor, chunk.offset, chunk.packed_size, chunk.full_size)
            .map_err(|e| Error::for_entry(e, path))?;
        output.write_all(&data)?;
    }

    Ok(output.into_inner())
}

fn read_chunk<R: Read + Seek>(
    cursor: &mut ByteCursor<R>,
    offset: u64,
    packed_size: u32,
    full_size: u32,
) -> std::io::Result<Vec<u8>> {
    cursor.seek_to(offset)?;
    if packed_size == 0 {
        return cursor.read_bytes(full_size as usize);
    }

    let packed = cursor.read_bytes(packed_size as usize)?;
    inflate_exact(&packed, full_size as usize)
}

#[cfg(test)]
mod test {
    use binrw::BinRead;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use super::{DdsHeader, PixelFormat, DDPF_FOURCC, DDPF_RGBA};
    use crate::entry::TextureEntry;

    fn texture(format: u8) -> TextureEntry {
        TextureEntry {
            width: 256,
            height: 128,
            mip_count: 9,
            format,
            ..Default::default()
        }
    }

    #[test]
    fn every_code_maps_back() {
        for code in [61, 71, 74, 77, 83, 87, 98] {
            let format = PixelFormat::from_code(code).unwrap();
            assert_eq!(format.code(), code);
        }
        assert_eq!(PixelFormat::from_code(28), None);
    }

    #[test]
    fn linear_sizes() {
        assert_eq!(PixelFormat::Bc1.linear_size(256, 128), 16384);
        assert_eq!(PixelFormat::Bc3.linear_size(256, 128), 32768);
        assert_eq!(PixelFormat::Bc7.linear_size(256, 128), 32768);
        assert_eq!(PixelFormat::B8G8R8A8.linear_size(256, 128), 131072);
        assert_eq!(PixelFormat::R8.linear_size(256, 128), 32768);
    }

    #[test]
    fn header_is_128_bytes() {
        use binrw::BinWrite;

        let header = DdsHeader::for_texture(&texture(71)).unwrap();
        let mut out = Cursor::new(Vec::new());
        header.write(&mut out).unwrap();

        let bytes = out.into_inner();
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[..4], b"DDS ");
        assert_eq!(&bytes[84..88], b"DXT1");

        let read_back = DdsHeader::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(read_back, header);
    }

    #[test]
    fn bc5_shares_dxt5() {
        let header = DdsHeader::for_texture(&texture(83)).unwrap();
        assert_eq!(header.pixel_format.flags, DDPF_FOURCC);
        assert_eq!(header.pixel_format.four_cc, u32::from_le_bytes(*b"DXT5"));
        assert_eq!(header.mip_map_count, 9);
        assert_eq!(header.flags, 0x000A_1007);
        assert_eq!(header.caps, 0x0040_1008);
    }

    #[test]
    fn bgra_masks() {
        let header = DdsHeader::for_texture(&texture(87)).unwrap();
        let format = header.pixel_format;
        assert_eq!(format.flags, DDPF_RGBA);
        assert_eq!(format.rgb_bit_count, 32);
        assert_eq!(format.r_bit_mask, 0x00FF_0000);
        assert_eq!(format.a_bit_mask, 0xFF00_0000);
        assert_eq!(format.four_cc, 0);
    }

    #[test]
    fn unknown_format_has_no_header() {
        assert_eq!(DdsHeader::for_texture(&texture(0)), None);
    }
}
