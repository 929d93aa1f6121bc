//! In-memory archive builders shared by the integration tests.
#![allow(dead_code)]

use byteorder::{LittleEndian as LE, WriteBytesExt};
use flate2::{write::ZlibEncoder, Compression};
use std::io::Write;

/// One file to place into a built archive
#[derive(Debug, Clone)]
pub struct TestFile {
    pub path: String,
    pub data: Vec<u8>,
    pub compressed: bool,
}

impl TestFile {
    pub fn stored(path: &str, data: &[u8]) -> Self {
        Self {
            path: path.to_owned(),
            data: data.to_vec(),
            compressed: false,
        }
    }

    pub fn packed(path: &str, data: &[u8]) -> Self {
        Self {
            compressed: true,
            ..Self::stored(path, data)
        }
    }
}

/// One mip chunk of a built texture
#[derive(Debug, Clone)]
pub struct TestChunk {
    pub data: Vec<u8>,
    pub compressed: bool,
}

/// One texture to place into a built `DX10` archive
#[derive(Debug, Clone)]
pub struct TestTexture {
    pub path: String,
    pub width: u16,
    pub height: u16,
    pub mip_count: u8,
    pub format: u8,
    pub chunks: Vec<TestChunk>,
}

impl TestTexture {
    /// Every chunk concatenated in stored order
    pub fn pixels(&self) -> Vec<u8> {
        self.chunks.iter().flat_map(|c| c.data.clone()).collect()
    }
}

/// Header options of a `BSA\0` archive
#[derive(Debug, Clone, Copy)]
pub struct TaggedOptions {
    pub version: u32,
    pub compressed_by_default: bool,
    pub prefixed_names: bool,
}

impl Default for TaggedOptions {
    fn default() -> Self {
        Self {
            version: 0x68,
            compressed_by_default: false,
            prefixed_names: false,
        }
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Bytes of a file as they sit in the archive
fn stored_bytes(file: &TestFile) -> Vec<u8> {
    if file.compressed {
        deflate(&file.data)
    } else {
        file.data.clone()
    }
}

fn split(path: &str) -> (&str, &str) {
    match path.rfind('\\') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Footer driven archive: data, record table, then tree size and total size.
pub fn legacy(files: &[TestFile]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut records = Vec::new();
    records.write_u32::<LE>(files.len() as u32).unwrap();

    for file in files {
        let offset = out.len() as u32;
        let stored = stored_bytes(file);
        out.extend_from_slice(&stored);

        records.write_u32::<LE>(file.path.len() as u32).unwrap();
        records.extend_from_slice(file.path.as_bytes());
        records.write_u8(file.compressed as u8).unwrap();
        records.write_u32::<LE>(file.data.len() as u32).unwrap();
        records.write_u32::<LE>(stored.len() as u32).unwrap();
        records.write_u32::<LE>(offset).unwrap();
    }

    let tree_size = records.len() as u32;
    out.extend_from_slice(&records);
    let total = out.len() as u32 + 8;
    out.write_u32::<LE>(tree_size).unwrap();
    out.write_u32::<LE>(total).unwrap();
    out
}

/// Classic `0x100` archive. The layout has no compression.
pub fn classic(files: &[TestFile]) -> Vec<u8> {
    assert!(files.iter().all(|f| !f.compressed), "classic archives are never compressed");

    let count = files.len();
    let mut names = Vec::new();
    let mut name_offsets = Vec::new();
    for file in files {
        name_offsets.push(names.len() as u32);
        names.extend_from_slice(file.path.as_bytes());
        names.push(0);
    }

    let mut out = Vec::new();
    out.write_u32::<LE>(0x100).unwrap();
    out.write_u32::<LE>((count * 12 + names.len()) as u32).unwrap();
    out.write_u32::<LE>(count as u32).unwrap();

    let mut data_offset = 0u32;
    for file in files {
        out.write_u32::<LE>(file.data.len() as u32).unwrap();
        out.write_u32::<LE>(data_offset).unwrap();
        data_offset += file.data.len() as u32;
    }
    for offset in name_offsets {
        out.write_u32::<LE>(offset).unwrap();
    }
    out.extend_from_slice(&names);
    for (i, _) in files.iter().enumerate() {
        out.write_u64::<LE>(0x1000 + i as u64).unwrap();
    }
    for file in files {
        out.extend_from_slice(&file.data);
    }
    out
}

/// Tagged `BSA\0` archive of either width. Files are grouped by folder in order of
/// first appearance, so the parsed order can differ from `files`.
pub fn tagged(files: &[TestFile], options: TaggedOptions) -> Vec<u8> {
    let wide = options.version == 0x69;

    let mut folders: Vec<(&str, Vec<&TestFile>)> = Vec::new();
    for file in files {
        let (folder, _) = split(&file.path);
        match folders.iter_mut().find(|(name, _)| *name == folder) {
            Some((_, members)) => members.push(file),
            None => folders.push((folder, vec![file])),
        }
    }

    let folder_record_len = if wide { 24 } else { 16 };
    let folder_names_len: usize = folders.iter().map(|(name, _)| name.len() + 1).sum();
    let file_names_len: usize = files.iter().map(|f| split(&f.path).1.len() + 1).sum();
    let blocks_len: usize = folders
        .iter()
        .map(|(name, members)| 1 + name.len() + 1 + 16 * members.len())
        .sum();
    let blocks_start = 36 + folders.len() * folder_record_len;
    let data_start = blocks_start + blocks_len + file_names_len;

    let mut archive_flags = 0x3;
    if options.compressed_by_default {
        archive_flags |= 0x4;
    }
    if options.prefixed_names {
        archive_flags |= 0x100;
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"BSA\0");
    out.write_u32::<LE>(options.version).unwrap();
    out.write_u32::<LE>(36).unwrap();
    out.write_u32::<LE>(archive_flags).unwrap();
    out.write_u32::<LE>(folders.len() as u32).unwrap();
    out.write_u32::<LE>(files.len() as u32).unwrap();
    out.write_u32::<LE>(folder_names_len as u32).unwrap();
    out.write_u32::<LE>(file_names_len as u32).unwrap();
    out.write_u32::<LE>(0).unwrap();

    let mut block_offset = blocks_start;
    for (i, (name, members)) in folders.iter().enumerate() {
        out.write_u64::<LE>(0x2000 + i as u64).unwrap();
        out.write_u32::<LE>(members.len() as u32).unwrap();
        if wide {
            out.write_u32::<LE>(0).unwrap();
            out.write_u64::<LE>(block_offset as u64).unwrap();
        } else {
            out.write_u32::<LE>(block_offset as u32).unwrap();
        }
        block_offset += 1 + name.len() + 1 + 16 * members.len();
    }

    let mut data = Vec::new();
    let mut names = Vec::new();
    for (name, members) in &folders {
        out.write_u8(name.len() as u8 + 1).unwrap();
        out.extend_from_slice(name.as_bytes());
        out.write_u8(0).unwrap();

        for (i, file) in members.iter().enumerate() {
            if wide {
                assert_eq!(
                    file.compressed, options.compressed_by_default,
                    "the 64-bit layout can not toggle compression per file"
                );
            }

            let offset = data_start + data.len();
            let mut block = Vec::new();
            if options.prefixed_names {
                block.write_u8(file.path.len() as u8).unwrap();
                block.extend_from_slice(file.path.as_bytes());
            }

            let mut payload = Vec::new();
            if file.compressed {
                payload.write_u32::<LE>(file.data.len() as u32).unwrap();
            }
            payload.extend_from_slice(&stored_bytes(file));
            block.extend_from_slice(&payload);

            let mut size = (if wide { block.len() } else { payload.len() }) as u32;
            if !wide && file.compressed != options.compressed_by_default {
                size |= 1 << 30;
            }

            out.write_u64::<LE>(0x3000 + i as u64).unwrap();
            out.write_u32::<LE>(size).unwrap();
            out.write_u32::<LE>(offset as u32).unwrap();

            data.extend_from_slice(&block);
            names.extend_from_slice(split(&file.path).1.as_bytes());
            names.push(0);
        }
    }

    out.extend_from_slice(&names);
    assert_eq!(out.len(), data_start);
    out.extend_from_slice(&data);
    out
}

fn ba2_header(out: &mut Vec<u8>, tag: &[u8; 4], count: usize, name_table_offset: u64) {
    out.extend_from_slice(b"BTDX");
    out.write_u32::<LE>(1).unwrap();
    out.extend_from_slice(tag);
    out.write_u32::<LE>(count as u32).unwrap();
    out.write_u64::<LE>(name_table_offset).unwrap();
}

fn name_table(out: &mut Vec<u8>, paths: impl Iterator<Item = impl AsRef<str>>) {
    for path in paths {
        let path = path.as_ref();
        out.write_u16::<LE>(path.len() as u16).unwrap();
        out.extend_from_slice(path.as_bytes());
    }
}

fn extension(path: &str) -> [u8; 4] {
    let mut raw = [0u8; 4];
    if let Some(i) = path.rfind('.') {
        for (slot, byte) in raw.iter_mut().zip(path[i + 1..].bytes()) {
            *slot = byte;
        }
    }
    raw
}

/// `BTDX` archive with a `GNRL` payload
pub fn general(files: &[TestFile]) -> Vec<u8> {
    let data_start = 24 + 36 * files.len();
    let stored: Vec<Vec<u8>> = files.iter().map(stored_bytes).collect();
    let name_table_offset = data_start + stored.iter().map(Vec::len).sum::<usize>();

    let mut out = Vec::new();
    ba2_header(&mut out, b"GNRL", files.len(), name_table_offset as u64);

    let mut offset = data_start;
    for (i, (file, bytes)) in files.iter().zip(&stored).enumerate() {
        out.write_u32::<LE>(0x4000 + i as u32).unwrap();
        out.extend_from_slice(&extension(&file.path));
        out.write_u32::<LE>(0x5000).unwrap();
        out.write_u32::<LE>(0).unwrap();
        out.write_u64::<LE>(offset as u64).unwrap();
        out.write_u32::<LE>(bytes.len() as u32).unwrap();
        out.write_u32::<LE>(if file.compressed { file.data.len() as u32 } else { 0 })
            .unwrap();
        out.write_u32::<LE>(0xBAAD_F00D).unwrap();
        offset += bytes.len();
    }

    for bytes in &stored {
        out.extend_from_slice(bytes);
    }
    name_table(&mut out, files.iter().map(|f| f.path.as_str()));
    out
}

/// `BTDX` archive with a `DX10` payload
pub fn texture(textures: &[TestTexture]) -> Vec<u8> {
    let records_len: usize = textures.iter().map(|t| 24 + 24 * t.chunks.len()).sum();
    let data_start = 24 + records_len;

    let stored: Vec<Vec<Vec<u8>>> = textures
        .iter()
        .map(|t| {
            t.chunks
                .iter()
                .map(|c| if c.compressed { deflate(&c.data) } else { c.data.clone() })
                .collect()
        })
        .collect();
    let data_len: usize = stored.iter().flatten().map(Vec::len).sum();

    let mut out = Vec::new();
    ba2_header(&mut out, b"DX10", textures.len(), (data_start + data_len) as u64);

    let mut offset = data_start;
    for (i, (texture, chunks)) in textures.iter().zip(&stored).enumerate() {
        out.write_u32::<LE>(0x6000 + i as u32).unwrap();
        out.extend_from_slice(b"dds\0");
        out.write_u32::<LE>(0x7000).unwrap();
        out.write_u8(0).unwrap();
        out.write_u8(texture.chunks.len() as u8).unwrap();
        out.write_u16::<LE>(24).unwrap();
        out.write_u16::<LE>(texture.height).unwrap();
        out.write_u16::<LE>(texture.width).unwrap();
        out.write_u8(texture.mip_count).unwrap();
        out.write_u8(texture.format).unwrap();
        out.write_u16::<LE>(0x0800).unwrap();

        for (mip, (chunk, bytes)) in texture.chunks.iter().zip(chunks).enumerate() {
            out.write_u64::<LE>(offset as u64).unwrap();
            out.write_u32::<LE>(if chunk.compressed { bytes.len() as u32 } else { 0 })
                .unwrap();
            out.write_u32::<LE>(chunk.data.len() as u32).unwrap();
            out.write_u16::<LE>(mip as u16).unwrap();
            out.write_u16::<LE>(mip as u16).unwrap();
            out.write_u32::<LE>(0xBAAD_F00D).unwrap();
            offset += bytes.len();
        }
    }

    for bytes in stored.iter().flatten() {
        out.extend_from_slice(bytes);
    }
    name_table(&mut out, textures.iter().map(|t| t.path.as_str()));
    out
}

/// `BTDX` archive with an arbitrary payload tag and nothing but a name table
pub fn ba2_with_tag(tag: &[u8; 4], paths: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    ba2_header(&mut out, tag, paths.len(), 24);
    name_table(&mut out, paths.iter());
    out
}

/// A mix of stored and compressed files spread over a few folders
pub fn sample_files() -> Vec<TestFile> {
    vec![
        TestFile::stored("meshes\\armor\\iron.nif", b"iron cuirass mesh"),
        TestFile::packed("meshes\\armor\\steel.nif", &b"steel ".repeat(40)),
        TestFile::packed("textures\\sky\\clouds.dds", &[0xAB; 300]),
        TestFile::stored("sound\\fx\\step.wav", b"RIFF....WAVE"),
        TestFile::packed("meshes\\clutter\\bowl.nif", b"a small wooden bowl"),
    ]
}
