use crate::{
    errors::{FileOperation, IoError, NonUtf8PathError},
    utils::{normalize_path, parent_key},
};
use indexmap::IndexMap;
use miette::Diagnostic;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Error, Diagnostic)]
pub enum CollectError {
    #[error("I/O error within collect domain")]
    #[diagnostic(code(embedgen::collect::io))]
    Io(#[from] IoError),

    #[error("nothing to embed at '{}'", path.display())]
    #[diagnostic(
        code(embedgen::collect::not_found),
        help("Paths are resolved relative to the current working directory")
    )]
    NotFound { path: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    NonUtf8Path(#[from] NonUtf8PathError),

    #[error("unable to walk directory tree at '{}'", path.display())]
    #[diagnostic(
        code(embedgen::collect::walk),
        help("Unreadable directories, broken symlinks and symlink loops abort the walk")
    )]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Accumulates one or more real directory trees ahead of serialization.
///
/// Keys are normalized, un-stripped paths (see [`normalize_path`]). `dirs` maps each
/// directory to the names of its children in walk order; `files` holds the live
/// metadata of every registered path, directories included.
///
/// After an error the collector may hold a partial tree and should be discarded.
#[derive(Debug, Default)]
pub struct TreeCollector {
    dirs: IndexMap<String, Vec<String>>,
    files: IndexMap<String, fs::Metadata>,
}
impl TreeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `path` and, for a directory, everything below it.
    ///
    /// Siblings are visited sorted by file name so repeated runs over the same tree
    /// produce the same output. Symlinks are followed. A root is only listed in its
    /// parent when that parent was registered by an earlier call.
    ///
    /// # Errors
    ///
    /// - [`CollectError::NotFound`] when `path` does not exist.
    /// - [`CollectError::Walk`] when a directory below `path` cannot be read.
    /// - [`CollectError::NonUtf8Path`] when a name cannot be represented as a string.
    pub fn add_path(&mut self, path: impl AsRef<Path>) -> Result<(), CollectError> {
        let source = path.as_ref();
        let root = normalize_path(source)?;
        let root_path = PathBuf::from(&root);

        let metadata = fs::metadata(&root_path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                CollectError::NotFound {
                    path: source.to_path_buf(),
                }
            } else {
                IoError::new(FileOperation::Stat, root_path.clone(), error).into()
            }
        })?;

        let is_dir = metadata.is_dir();
        self.register(root.clone(), metadata);

        if !is_dir {
            return Ok(());
        }

        let walker = WalkDir::new(&root_path)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|error| CollectError::Walk {
                path: error
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root_path.clone()),
                source: error,
            })?;

            let metadata = entry.metadata().map_err(|error| CollectError::Walk {
                path: entry.path().to_path_buf(),
                source: error,
            })?;

            if !metadata.is_dir() && !metadata.is_file() {
                log::warn!("skipping special file: {}", entry.path().display());
                continue;
            }

            self.register(normalize_path(entry.path())?, metadata);
        }

        log::info!(
            "collected '{}': {} paths registered so far",
            root,
            self.files.len()
        );

        Ok(())
    }

    fn register(&mut self, key: String, metadata: fs::Metadata) {
        if let Some(parent) = parent_key(&key) {
            if let Some(listing) = self.dirs.get_mut(&parent) {
                let name = key.rsplit('/').next().unwrap_or(&key);

                if !listing.iter().any(|existing| existing == name) {
                    listing.push(name.to_string());
                }
            }
        }

        if metadata.is_dir() {
            self.dirs.entry(key.clone()).or_default();
        }

        log::debug!(
            "registered {} {}",
            if metadata.is_dir() { "dir " } else { "file" },
            key
        );

        self.files.insert(key, metadata);
    }

    /// Directory key to child names, in registration order.
    pub fn dirs(&self) -> &IndexMap<String, Vec<String>> {
        &self.dirs
    }

    /// Every registered key with the metadata captured during the walk.
    pub fn files(&self) -> &IndexMap<String, fs::Metadata> {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
