use std::{
    borrow::Cow,
    fmt,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Unix style mode bits: file type in the upper bits, permissions in the lower twelve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(u32);
impl FileMode {
    pub const TYPE_MASK: u32 = 0o170000;
    pub const DIR: u32 = 0o040000;
    pub const REGULAR: u32 = 0o100000;

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_dir(self) -> bool {
        self.0 & Self::TYPE_MASK == Self::DIR
    }

    pub const fn is_file(self) -> bool {
        self.0 & Self::TYPE_MASK == Self::REGULAR
    }

    pub const fn permissions(self) -> u32 {
        self.0 & 0o7777
    }

    const fn with_type(self, kind: u32) -> Self {
        Self((self.0 & !Self::TYPE_MASK) | kind)
    }
}
impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RWX: [char; 3] = ['r', 'w', 'x'];

        let kind = if self.is_dir() {
            'd'
        } else if self.is_file() {
            '-'
        } else {
            '?'
        };
        write!(f, "{}", kind)?;

        for bit in (0..9).rev() {
            if self.0 & (1 << bit) != 0 {
                write!(f, "{}", RWX[2 - bit % 3])?;
            } else {
                write!(f, "-")?;
            }
        }

        Ok(())
    }
}

/// One embedded file or directory.
///
/// `data` is whatever the generator stored, so on a compressed filesystem it is the
/// gzip stream rather than the original bytes. Use [`FileSystem::open`](crate::FileSystem::open)
/// to read decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: String,
    mode: FileMode,
    mtime_secs: i64,
    mtime_nanos: u32,
    data: Cow<'static, [u8]>,
}
impl Entry {
    /// A regular file. The type bits of `mode` are forced to [`FileMode::REGULAR`].
    pub fn file(
        path: impl Into<String>,
        mode: FileMode,
        mtime_secs: i64,
        mtime_nanos: u32,
        data: impl Into<Cow<'static, [u8]>>,
    ) -> Self {
        Self {
            path: path.into(),
            mode: mode.with_type(FileMode::REGULAR),
            mtime_secs,
            mtime_nanos,
            data: data.into(),
        }
    }

    /// A directory. The type bits of `mode` are forced to [`FileMode::DIR`].
    pub fn dir(path: impl Into<String>, mode: FileMode, mtime_secs: i64, mtime_nanos: u32) -> Self {
        Self {
            path: path.into(),
            mode: mode.with_type(FileMode::DIR),
            mtime_secs,
            mtime_nanos,
            data: Cow::Borrowed(&[]),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Final path segment, or `/` for the root.
    pub fn name(&self) -> &str {
        match self.path.trim_end_matches('/').rsplit('/').next() {
            Some(name) if !name.is_empty() => name,
            _ => "/",
        }
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    /// Seconds and nanoseconds since the unix epoch, as captured at generation time.
    pub fn mtime(&self) -> (i64, u32) {
        (self.mtime_secs, self.mtime_nanos)
    }

    pub fn mod_time(&self) -> SystemTime {
        let nanos = Duration::from_nanos(u64::from(self.mtime_nanos));

        if self.mtime_secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(self.mtime_secs.unsigned_abs()) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(self.mtime_secs.unsigned_abs()) + nanos
        }
    }

    /// Length of the stored data; zero for directories.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_force_type_bits() {
        let file = Entry::file("/a.txt", FileMode::from_bits(0o644), 0, 0, b"x".as_slice());
        let dir = Entry::dir("/d", FileMode::from_bits(0o100755), 0, 0);

        assert!(file.mode().is_file());
        assert_eq!(file.mode().permissions(), 0o644);
        assert!(dir.is_dir());
        assert_eq!(dir.mode().bits(), 0o040755);
        assert_eq!(dir.size(), 0);
    }

    #[test]
    fn name_is_final_segment() {
        let root = Entry::dir("/", FileMode::from_bits(0o755), 0, 0);
        let nested = Entry::file("/css/site.css", FileMode::from_bits(0o644), 0, 0, vec![1u8, 2]);

        assert_eq!(root.name(), "/");
        assert_eq!(nested.name(), "site.css");
        assert_eq!(nested.size(), 2);
    }

    #[test]
    fn mod_time_keeps_sub_second_precision() {
        let entry = Entry::dir("/", FileMode::from_bits(0o755), 1_700_000_000, 250);
        let since = entry.mod_time().duration_since(UNIX_EPOCH).unwrap();

        assert_eq!(since.as_secs(), 1_700_000_000);
        assert_eq!(since.subsec_nanos(), 250);
        assert_eq!(entry.mtime(), (1_700_000_000, 250));
    }

    #[test]
    fn mod_time_before_epoch() {
        let entry = Entry::dir("/", FileMode::from_bits(0o755), -2, 500_000_000);
        let before = UNIX_EPOCH.duration_since(entry.mod_time()).unwrap();

        assert_eq!(before, Duration::from_millis(1500));
    }

    #[test]
    fn mode_renders_like_ls() {
        assert_eq!(FileMode::from_bits(0o040755).to_string(), "drwxr-xr-x");
        assert_eq!(FileMode::from_bits(0o100640).to_string(), "-rw-r-----");
    }
}
