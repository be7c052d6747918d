use crate::{entry::Entry, error::VfsError, filesystem::FileSystem};
use std::{
    borrow::Cow,
    io::{self, Cursor, Read, Seek, SeekFrom},
};

/// A handle returned by [`FileSystem::open`].
///
/// File handles own a private read cursor. Directory handles cannot be read or sought
/// but can list their children. The handle borrows the filesystem that issued it.
#[derive(Debug)]
pub struct File<'a> {
    fs: &'a FileSystem,
    entry: &'a Entry,
    cursor: Option<Cursor<Cow<'a, [u8]>>>,
}
impl<'a> File<'a> {
    pub(crate) fn open(fs: &'a FileSystem, entry: &'a Entry) -> Result<Self, VfsError> {
        let cursor = if entry.is_dir() {
            None
        } else {
            Some(Cursor::new(fs.contents(entry)?))
        };

        Ok(Self { fs, entry, cursor })
    }

    pub fn stat(&self) -> &'a Entry {
        self.entry
    }

    pub fn is_dir(&self) -> bool {
        self.entry.is_dir()
    }

    /// Lists children of this directory, see [`FileSystem::read_dir`].
    pub fn read_dir(&self, start: usize, count: usize) -> Result<Vec<&'a Entry>, VfsError> {
        if !self.is_dir() {
            return Err(self.invalid("list a regular file"));
        }

        self.fs.read_dir(self.entry.path(), start, count)
    }

    /// Releases the cursor. The handle cannot be used afterwards.
    pub fn close(self) {
        log::trace!("closed {}", self.entry.path());
    }

    fn invalid(&self, operation: &'static str) -> VfsError {
        VfsError::InvalidOperation {
            path: self.entry.path().to_string(),
            operation,
        }
    }

    fn cursor(&mut self, operation: &'static str) -> io::Result<&mut Cursor<Cow<'a, [u8]>>> {
        let entry = self.entry;

        self.cursor.as_mut().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                VfsError::InvalidOperation {
                    path: entry.path().to_string(),
                    operation,
                },
            )
        })
    }
}
impl Read for File<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor("read a directory")?.read(buf)
    }
}
impl Seek for File<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor("seek in a directory")?.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Entry, FileMode, FileSystem, VfsError};
    use std::io::{ErrorKind, Read, Seek, SeekFrom};

    fn sample() -> FileSystem {
        FileSystem::builder()
            .dir("/", &["hello.txt", "docs"])
            .dir("/docs", &[])
            .entry(Entry::dir("/", FileMode::from_bits(0o755), 0, 0))
            .entry(Entry::dir("/docs", FileMode::from_bits(0o755), 0, 0))
            .entry(Entry::file(
                "/hello.txt",
                FileMode::from_bits(0o644),
                0,
                0,
                b"hello world".as_slice(),
            ))
            .build()
    }

    #[test]
    fn seek_repositions_the_cursor() {
        let fs = sample();
        let mut file = fs.open("/hello.txt").unwrap();
        let mut tail = String::new();

        assert_eq!(file.seek(SeekFrom::Start(6)).unwrap(), 6);
        file.read_to_string(&mut tail).unwrap();
        assert_eq!(tail, "world");

        assert_eq!(file.seek(SeekFrom::End(-5)).unwrap(), 6);
        assert_eq!(file.seek(SeekFrom::Current(-6)).unwrap(), 0);
    }

    #[test]
    fn seek_before_start_is_invalid_input() {
        let fs = sample();
        let mut file = fs.open("/hello.txt").unwrap();

        let err = file.seek(SeekFrom::Current(-1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = file.seek(SeekFrom::End(-12)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn reading_after_end_returns_zero() {
        let fs = sample();
        let mut file = fs.open("/hello.txt").unwrap();
        let mut buf = [0u8; 64];

        assert_eq!(file.read(&mut buf).unwrap(), 11);
        assert_eq!(file.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn directory_handles_reject_read_and_seek() {
        let fs = sample();
        let mut dir = fs.open("/docs").unwrap();
        let mut buf = [0u8; 4];

        assert_eq!(dir.read(&mut buf).unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(
            dir.seek(SeekFrom::Start(0)).unwrap_err().kind(),
            ErrorKind::Unsupported
        );
        assert!(dir.stat().is_dir());
        assert_eq!(dir.stat().name(), "docs");
    }

    #[test]
    fn directory_handles_list_children() {
        let fs = sample();
        let root = fs.open("/").unwrap();
        let names: Vec<_> = root.read_dir(0, 10).unwrap().iter().map(|e| e.name()).collect();

        assert_eq!(names, ["hello.txt", "docs"]);
        root.close();
    }

    #[test]
    fn file_handles_cannot_list() {
        let fs = sample();
        let file = fs.open("/hello.txt").unwrap();

        assert!(matches!(
            file.read_dir(0, 1),
            Err(VfsError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn reopening_starts_from_the_beginning() {
        let fs = sample();
        let mut first = fs.open("/hello.txt").unwrap();
        let mut buf = [0u8; 5];
        first.read_exact(&mut buf).unwrap();
        first.close();

        let mut again = String::new();
        fs.open("/hello.txt").unwrap().read_to_string(&mut again).unwrap();
        assert_eq!(again, "hello world");
    }
}
