use crate::{entry::Entry, error::VfsError, file::File};
use std::collections::HashMap;

/// The root marker used for the top of an embedded tree.
pub const ROOT: &str = "/";

/// An immutable, in-memory file tree.
///
/// Built once, usually by generated code through [`FileSystem::builder`], and only read
/// afterwards. Every lookup takes `&self`, so a single instance can be shared by any
/// number of threads without locking.
#[derive(Debug, Clone, Default)]
pub struct FileSystem {
    dirs: HashMap<String, Vec<String>>,
    entries: HashMap<String, Entry>,
    compressed: bool,
}
impl FileSystem {
    pub fn builder() -> FileSystemBuilder {
        FileSystemBuilder::default()
    }

    /// Opens the entry at `path`.
    ///
    /// Files get a private cursor, so handles to the same path never share a read
    /// position. On a compressed filesystem the handle yields the decoded bytes.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] when nothing is embedded at `path`.
    /// - [`VfsError::Decompress`] when the stored gzip stream is corrupt.
    pub fn open(&self, path: &str) -> Result<File<'_>, VfsError> {
        let entry = self.stat(path)?;

        File::open(self, entry)
    }

    /// Looks up the entry at `path` without opening it.
    pub fn stat(&self, path: &str) -> Result<&Entry, VfsError> {
        self.entries.get(path).ok_or_else(|| {
            log::debug!("embedded lookup miss: {}", path);

            VfsError::NotFound {
                path: path.to_string(),
            }
        })
    }

    /// Lists up to `count` children of the directory at `path`, starting at `start`.
    ///
    /// The listing keeps the order the generator recorded. Asking past the end is not
    /// an error, the result is just shorter, or empty.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::NotFound`] when `path` has no listing, or when a listed child
    /// has no entry of its own.
    pub fn read_dir(&self, path: &str, start: usize, count: usize) -> Result<Vec<&Entry>, VfsError> {
        let children = self.dirs.get(path).ok_or_else(|| VfsError::NotFound {
            path: path.to_string(),
        })?;

        let end = start.saturating_add(count).min(children.len());
        let start = start.min(end);

        children[start..end]
            .iter()
            .map(|name| self.stat(&join_path(path, name)))
            .collect()
    }

    /// Reads the whole (decoded) content of the file at `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        let entry = self.stat(path)?;

        if entry.is_dir() {
            return Err(VfsError::InvalidOperation {
                path: path.to_string(),
                operation: "read a directory as a file",
            });
        }

        Ok(self.contents(entry)?.into_owned())
    }

    /// Whether every file's stored data is a gzip stream.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All embedded paths, files and directories alike, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn contents<'a>(
        &self,
        entry: &'a Entry,
    ) -> Result<std::borrow::Cow<'a, [u8]>, VfsError> {
        use std::{borrow::Cow, io::Read};

        if !self.compressed {
            return Ok(Cow::Borrowed(entry.data()));
        }

        let mut decoded = Vec::new();
        flate2::read::GzDecoder::new(entry.data())
            .read_to_end(&mut decoded)
            .map_err(|source| VfsError::Decompress {
                path: entry.path().to_string(),
                source,
            })?;

        Ok(Cow::Owned(decoded))
    }
}

/// Assembles a [`FileSystem`]. Entries are keyed by their own path.
#[derive(Debug, Default)]
pub struct FileSystemBuilder {
    fs: FileSystem,
}
impl FileSystemBuilder {
    pub fn compressed(mut self, compressed: bool) -> Self {
        self.fs.compressed = compressed;
        self
    }

    /// Records the listing of the directory at `path`. `children` are names, not paths.
    pub fn dir(mut self, path: &str, children: &[&str]) -> Self {
        self.fs.dirs.insert(
            path.to_string(),
            children.iter().map(|name| name.to_string()).collect(),
        );
        self
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.fs.entries.insert(entry.path().to_string(), entry);
        self
    }

    pub fn build(self) -> FileSystem {
        log::debug!(
            "embedded filesystem ready: {} entries, {} directories, compressed={}",
            self.fs.entries.len(),
            self.fs.dirs.len(),
            self.fs.compressed
        );

        self.fs
    }
}

pub(crate) fn join_path(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileMode;
    use std::io::{Read, Write};

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// `/` holding `b.txt` ("hi") and the empty directory `c`.
    fn sample(compressed: bool) -> FileSystem {
        let data = if compressed { gzip(b"hi") } else { b"hi".to_vec() };

        FileSystem::builder()
            .compressed(compressed)
            .dir("/", &["b.txt", "c"])
            .dir("/c", &[])
            .entry(Entry::dir("/", FileMode::from_bits(0o755), 10, 1))
            .entry(Entry::file("/b.txt", FileMode::from_bits(0o644), 20, 2, data))
            .entry(Entry::dir("/c", FileMode::from_bits(0o755), 30, 3))
            .build()
    }

    #[test]
    fn open_reads_file_content() {
        let fs = sample(false);
        let mut content = String::new();

        fs.open("/b.txt").unwrap().read_to_string(&mut content).unwrap();

        assert_eq!(content, "hi");
        assert!(!fs.is_compressed());
    }

    #[test]
    fn open_decodes_compressed_content() {
        let fs = sample(true);
        let mut content = String::new();

        fs.open("/b.txt").unwrap().read_to_string(&mut content).unwrap();

        assert_eq!(content, "hi");
        assert!(fs.is_compressed());
        assert_eq!(fs.read("/b.txt").unwrap(), b"hi");
        // stored size is the gzip stream, not the decoded bytes
        assert_ne!(fs.stat("/b.txt").unwrap().size(), 2);
    }

    #[test]
    fn open_unknown_path_is_not_found() {
        let fs = sample(false);

        assert!(fs.open("/missing").unwrap_err().is_not_found());
        assert!(fs.open("b.txt").unwrap_err().is_not_found());
    }

    #[test]
    fn read_dir_lists_children_in_recorded_order() {
        let fs = sample(false);
        let names: Vec<_> = fs.read_dir("/", 0, 2).unwrap().iter().map(|e| e.name()).collect();

        assert_eq!(names, ["b.txt", "c"]);
        assert!(fs.read_dir("/c", 0, 10).unwrap().is_empty());
    }

    #[test]
    fn read_dir_clamps_past_the_end() {
        let fs = sample(false);

        assert_eq!(fs.read_dir("/", 1, 100).unwrap().len(), 1);
        assert!(fs.read_dir("/", 2, 1).unwrap().is_empty());
        assert!(fs.read_dir("/", 7, usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn read_dir_of_unknown_or_file_path_is_not_found() {
        let fs = sample(false);

        assert!(fs.read_dir("/nope", 0, 1).unwrap_err().is_not_found());
        assert!(fs.read_dir("/b.txt", 0, 1).unwrap_err().is_not_found());
    }

    #[test]
    fn read_dir_reports_dangling_children() {
        let fs = FileSystem::builder()
            .dir("/", &["ghost"])
            .entry(Entry::dir("/", FileMode::from_bits(0o755), 0, 0))
            .build();

        match fs.read_dir("/", 0, 1) {
            Err(VfsError::NotFound { path }) => assert_eq!(path, "/ghost"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn reading_a_directory_is_invalid() {
        let fs = sample(false);

        assert!(matches!(
            fs.read("/c"),
            Err(VfsError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn corrupt_gzip_fails_on_open() {
        let fs = FileSystem::builder()
            .compressed(true)
            .entry(Entry::file("/x", FileMode::from_bits(0o644), 0, 0, b"not gzip".as_slice()))
            .build();

        assert!(matches!(fs.open("/x"), Err(VfsError::Decompress { .. })));
    }

    #[test]
    fn concurrent_readers_do_not_share_cursors() {
        let fs = sample(true);

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    let mut first = fs.open("/b.txt").unwrap();
                    let mut second = fs.open("/b.txt").unwrap();
                    let mut byte = [0u8; 1];

                    first.read_exact(&mut byte).unwrap();
                    assert_eq!(&byte, b"h");

                    let mut all = Vec::new();
                    second.read_to_end(&mut all).unwrap();
                    assert_eq!(all, b"hi");
                });
            }
        });
    }

    #[test]
    fn paths_cover_every_entry() {
        let fs = sample(false);
        let mut paths: Vec<_> = fs.paths().collect();
        paths.sort();

        assert_eq!(paths, ["/", "/b.txt", "/c"]);
        assert_eq!(fs.len(), 3);
        assert!(!fs.is_empty());
    }
}
