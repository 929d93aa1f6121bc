//! Types for reading archives
//!

use bon::Builder;
use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    fs::{self, File, OpenOptions},
    io::{self, BufReader, BufWriter, Read, Seek, Write},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info, instrument, warn};

use crate::{
    cursor::ByteCursor,
    dialect::{ArchiveInfo, Dialect, ParsedArchive},
    entry::Entry,
    error::{Error, FileNotFoundError, Result},
    extract::{copy_payload, open_payload, Payload},
    tree::ArchiveTree,
};

/// A struct for reading the contents of one entry
///
/// Read failures carry an [`Error`] naming the entry: [`Error::TruncatedArchive`] with
/// [`io::ErrorKind::UnexpectedEof`] and [`Error::CorruptEntry`] with
/// [`io::ErrorKind::InvalidData`]. A payload that ends before [`EntryReader::size`] bytes
/// is reported the same way.
pub struct EntryReader<'a, R: Read + Seek> {
    entry: &'a Entry,
    payload: Payload<'a, R>,
    produced: u64,
}

impl<R: Read + Seek> Debug for EntryReader<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EntryReader({:#?})", self.entry)
    }
}

/// Methods for retrieving information on archive entries
impl<R: Read + Seek> EntryReader<'_, R> {
    /// Get the full path of the file inside the archive
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this path directly when extracting an archive.
    /// It may contain an absolute path or break out of the current directory
    /// (`..\runtime`). Use [`entry_destination`] to map it under a directory.
    pub fn full_path(&self) -> &str {
        self.entry.full_path()
    }

    /// Get the name of the file
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Number of bytes this reader will produce
    pub fn size(&self) -> u64 {
        self.payload.len
    }

    /// Get the size of the file, in bytes, in the archive. Zero when unknown.
    pub fn compressed_size(&self) -> u64 {
        u64::from(self.entry.file().compressed_size)
    }

    /// Get the starting offset of the stored data
    pub fn offset(&self) -> u64 {
        self.entry.file().offset
    }

    /// Get the metadata of the entry
    pub fn entry(&self) -> &Entry {
        self.entry
    }
}

impl<R: Read + Seek> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let path = self.entry.full_path();
        let read = match self.payload.reader.read(buf) {
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Err(e),
            Err(e) => return Err(self.payload.error(e, path).into()),
        };

        self.produced += read as u64;
        if read == 0 && !buf.is_empty() && self.produced < self.payload.len {
            return Err(self.payload.ended_early(path, self.produced).into());
        }
        Ok(read)
    }
}

/// Options for extracting files to disk
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct ExtractOptions {
    /// Replace files that already exist in the destination
    #[builder(default)]
    pub overwrite: bool,
}

/// Outcome of [`Archive::extract_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub extracted: usize,
    pub failed: usize,
}

/// Archive reader for every supported dialect
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_archive_contents(reader: impl Read + Seek) -> bsa_archive::error::Result<()> {
///     let mut archive = bsa_archive::Archive::new(reader, "Skyrim - Misc.bsa")?;
///
///     for i in 0..archive.len() {
///         let mut file = archive.by_index(i)?;
///         println!("Filename: {}", file.full_path());
///         std::io::copy(&mut file, &mut std::io::sink())?;
///     }
///
///     Ok(())
/// }
/// ```
///
/// Every read moves the single cursor of the archive, which is why reading needs
/// `&mut self`. Open the file again for parallel extraction.
pub struct Archive<R> {
    cursor: ByteCursor<R>,
    source: String,
    info: ArchiveInfo,
    entries: Arc<[Entry]>,
    index: IndexMap<Box<str>, usize>,
    tree: Arc<ArchiveTree>,
}

impl<R> Debug for Archive<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Archive")
            .field("source", &self.source)
            .field("info", &self.info)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<R> Archive<R> {
    /// Header values discovered while loading
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    pub fn dialect(&self) -> Dialect {
        self.info.dialect
    }

    /// Name of the archive, as shown at the root of the tree
    pub fn name(&self) -> &str {
        &self.tree.root().name
    }

    /// Number of entries contained in this archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in stored order.
    ///
    /// Clone the [`Arc`] to keep iterating while extracting.
    pub fn entries(&self) -> &Arc<[Entry]> {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Folder tree over the entries, safe to share between threads
    pub fn tree(&self) -> &Arc<ArchiveTree> {
        &self.tree
    }

    /// Returns an iterator over all the full paths in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::full_path)
    }

    /// Get the index of an entry by full path, if it's present.
    ///
    /// When several entries share a path the first one wins.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Total decompressed size of the files in the archive, if it can be known.
    pub fn decompressed_size(&self) -> Option<u128> {
        let mut total = 0u128;
        for entry in self.entries.iter() {
            total = total.checked_add(entry.display_size() as u128)?;
        }
        Some(total)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }
}

impl Archive<BufReader<File>> {
    /// Open and load the archive at `path`.
    #[instrument(skip_all, err)]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file = File::open(path)?;
        Self::load(BufReader::new(file), name, path.display().to_string())
    }
}

impl<R: Read + Seek> Archive<R> {
    /// Read an archive from `reader`; `name` is used for the tree root and in errors.
    pub fn new(reader: R, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = name.clone();
        Self::load(reader, name, source)
    }

    fn load(reader: R, name: String, source: String) -> Result<Self> {
        let mut cursor = ByteCursor::new(reader)?;
        let parsed = Self::parse(&mut cursor, &source)?;
        let (info, entries, index, tree) = Self::assemble(parsed, name);

        Ok(Self {
            cursor,
            source,
            info,
            entries,
            index,
            tree,
        })
    }

    fn parse(cursor: &mut ByteCursor<R>, source: &str) -> Result<ParsedArchive> {
        let parsed = Dialect::detect(cursor)
            .and_then(|dialect| dialect.parse(cursor, source))
            .map_err(|e| e.truncated(source))?;

        info!(
            source,
            dialect = %parsed.info.dialect,
            entries = parsed.entries.len(),
            "archive loaded"
        );

        Ok(parsed)
    }

    #[allow(clippy::type_complexity)]
    fn assemble(
        parsed: ParsedArchive,
        name: String,
    ) -> (
        ArchiveInfo,
        Arc<[Entry]>,
        IndexMap<Box<str>, usize>,
        Arc<ArchiveTree>,
    ) {
        let entries: Arc<[Entry]> = parsed.entries.into();

        let mut index = IndexMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            index.entry(Box::from(entry.full_path())).or_insert(i);
        }

        let tree = Arc::new(ArchiveTree::build(name, Arc::clone(&entries)));
        (parsed.info, entries, index, tree)
    }

    /// Parse the stream again, replacing entries and tree wholesale.
    ///
    /// On failure the archive keeps its previous contents.
    #[instrument(skip(self), fields(source = %self.source), err)]
    pub fn reload(&mut self) -> Result<()> {
        let parsed = Self::parse(&mut self.cursor, &self.source)?;
        let name = self.tree.root().name.clone();
        let (info, entries, index, tree) = Self::assemble(parsed, name);

        self.info = info;
        self.entries = entries;
        self.index = index;
        self.tree = tree;
        Ok(())
    }

    /// Search for an entry by full path
    pub fn by_name(&mut self, name: &str) -> Result<EntryReader<'_, R>> {
        let Some(index) = self.index_for_name(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a reader over the contents of an entry by index
    pub fn by_index(&mut self, file_number: usize) -> Result<EntryReader<'_, R>> {
        let entry = self
            .entries
            .get(file_number)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file_number)))?;

        Ok(EntryReader {
            entry,
            payload: open_payload(&mut self.cursor, &self.info, entry)?,
            produced: 0,
        })
    }

    /// Write the contents of `entry` to `sink`, returning the number of bytes written.
    ///
    /// `entry` must belong to this archive.
    #[instrument(skip_all, fields(path = entry.full_path()), err)]
    pub fn extract(&mut self, entry: &Entry, sink: &mut impl Write) -> Result<u64> {
        let mut payload = open_payload(&mut self.cursor, &self.info, entry)?;
        let written = copy_payload(&mut payload, entry.full_path(), sink)?;
        debug!(written, "extracted");
        Ok(written)
    }

    /// Write the contents of `entry` to the file at `destination`, creating parent
    /// directories as needed. An existing file is replaced.
    pub fn extract_to_path(&mut self, entry: &Entry, destination: impl AsRef<Path>) -> Result<u64> {
        self.extract_to_file(entry, destination.as_ref(), true)
    }

    fn extract_to_file(&mut self, entry: &Entry, destination: &Path, overwrite: bool) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = if overwrite {
            File::create(destination)?
        } else {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(destination)?
        };

        let mut writer = BufWriter::new(file);
        let result = self.extract(entry, &mut writer).and_then(|written| {
            writer.flush()?;
            Ok(written)
        });

        if result.is_err() {
            drop(writer);
            if let Err(e) = fs::remove_file(destination) {
                warn!(destination = %destination.display(), %e, "unable to remove partial file");
            }
        }

        result
    }

    /// Extract every entry below `destination`, continuing past entries that fail.
    #[instrument(skip(self, destination), fields(source = %self.source, destination = %destination.as_ref().display()))]
    pub fn extract_all(
        &mut self,
        destination: impl AsRef<Path>,
        options: ExtractOptions,
    ) -> Result<ExtractSummary> {
        let root = destination.as_ref();
        fs::create_dir_all(root)?;

        let entries = Arc::clone(&self.entries);
        let mut summary = ExtractSummary::default();

        for entry in entries.iter() {
            let result = entry_destination(root, entry.full_path())
                .and_then(|path| self.extract_to_file(entry, &path, options.overwrite));

            match result {
                Ok(_) => summary.extracted += 1,
                Err(e) => {
                    warn!(path = entry.full_path(), error = %e, "unable to extract entry");
                    summary.failed += 1;
                }
            }
        }

        info!(
            extracted = summary.extracted,
            failed = summary.failed,
            "extraction finished"
        );
        Ok(summary)
    }
}

/// Map an archive path below `root`.
///
/// Both `\` and `/` separate segments. Empty, `.`, `..` and root segments are dropped, so
/// the result never leaves `root`.
pub fn entry_destination(root: &Path, full_path: &str) -> Result<PathBuf> {
    let mut destination = root.to_path_buf();
    let mut depth = 0;

    for segment in full_path.split(['\\', '/']) {
        for component in Path::new(segment).components() {
            if let Component::Normal(name) = component {
                destination.push(name);
                depth += 1;
            }
        }
    }

    if depth == 0 {
        return Err(Error::InvalidEntryPath(full_path.to_owned()));
    }

    Ok(destination)
}
