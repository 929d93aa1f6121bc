//! Dialect independent description of archived files

/// Separator used inside archive paths
pub const PATH_SEPARATOR: char = '\\';

/// Metadata of one archived file.
///
/// Offsets point into the stream the entry was parsed from; an entry is meaningless
/// for any other archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    /// Folder path and name joined with [`PATH_SEPARATOR`]
    pub full_path: String,
    /// Everything before the last separator of `full_path`
    pub folder_path: String,
    /// Everything after the last separator of `full_path`
    pub name: String,
    /// Extension without the leading dot
    pub extension: String,
    /// Absolute offset of the stored data
    pub offset: u64,
    /// Stored or logical size, depending on the dialect
    pub size: u32,
    /// Compressed size, zero when unknown or unused
    pub compressed_size: u32,
    /// Decompressed size, zero when it has to be read at extraction time
    pub real_size: u32,
    /// Whether the stored data is zlib compressed
    pub compressed: bool,
    /// Folder/name hash, not guaranteed to be unique
    pub hash: u64,
}

impl FileEntry {
    /// Set `full_path` and derive folder, name and extension from it.
    pub fn set_full_path(&mut self, full_path: impl Into<String>) {
        self.full_path = full_path.into();
        let (folder, name) = split_path(&self.full_path);
        self.folder_path = folder.to_owned();
        self.name = name.to_owned();
        self.extension = extension(&self.name).to_owned();
    }
}

/// One mip range of a texture's pixel data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureChunk {
    pub offset: u64,
    /// Zero when the chunk is stored as is
    pub packed_size: u32,
    pub full_size: u32,
    pub start_mip: u16,
    pub end_mip: u16,
}

impl TextureChunk {
    pub fn is_compressed(&self) -> bool {
        self.packed_size != 0
    }
}

/// A texture stored in a `DX10` archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureEntry {
    pub file: FileEntry,
    pub height: u16,
    pub width: u16,
    pub mip_count: u8,
    /// DXGI format code, see [`crate::texture::PixelFormat`]
    pub format: u8,
    pub chunks: Vec<TextureChunk>,
}

/// An archived file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Any file extracted as a single payload
    General(FileEntry),
    /// A texture rebuilt from chunks behind a synthesized DDS header
    Texture(TextureEntry),
}

impl Entry {
    /// Common metadata of this entry
    pub fn file(&self) -> &FileEntry {
        match self {
            Entry::General(file) => file,
            Entry::Texture(texture) => &texture.file,
        }
    }

    pub(crate) fn file_mut(&mut self) -> &mut FileEntry {
        match self {
            Entry::General(file) => file,
            Entry::Texture(texture) => &mut texture.file,
        }
    }

    pub fn full_path(&self) -> &str {
        &self.file().full_path
    }

    pub fn name(&self) -> &str {
        &self.file().name
    }

    /// Size shown to users: the decompressed size if known, the stored size otherwise
    pub fn display_size(&self) -> u64 {
        let file = self.file();
        if file.real_size > 0 {
            file.real_size as u64
        } else {
            file.size as u64
        }
    }
}

impl Default for Entry {
    fn default() -> Self {
        Entry::General(FileEntry::default())
    }
}

impl From<FileEntry> for Entry {
    fn from(value: FileEntry) -> Self {
        Entry::General(value)
    }
}

impl From<TextureEntry> for Entry {
    fn from(value: TextureEntry) -> Self {
        Entry::Texture(value)
    }
}

/// Split an archive path into folder and name at the last separator.
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind(PATH_SEPARATOR) {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

/// Text after the last `.`, or an empty string.
pub fn extension(path: &str) -> &str {
    match path.rfind('.') {
        Some(index) if index + 1 < path.len() => &path[index + 1..],
        _ => "",
    }
}
