//! Runtime half of `embedgen`: a read-only, in-memory file tree that generated code
//! rebuilds on first use.
//!
//! A generated module exposes one static of type [`FileSystem`]:
//!
//! ```
//! use embedfs::{Entry, FileMode, FileSystem};
//! use std::io::Read;
//!
//! let fs = FileSystem::builder()
//!     .dir("/", &["b.txt"])
//!     .entry(Entry::dir("/", FileMode::from_bits(0o755), 0, 0))
//!     .entry(Entry::file("/b.txt", FileMode::from_bits(0o644), 0, 0, b"hi".as_slice()))
//!     .build();
//!
//! let mut text = String::new();
//! fs.open("/b.txt")?.read_to_string(&mut text).unwrap();
//! assert_eq!(text, "hi");
//! # Ok::<(), embedfs::VfsError>(())
//! ```
mod entry;
mod error;
mod file;
mod filesystem;

pub use entry::{Entry, FileMode};
pub use error::VfsError;
pub use file::File;
pub use filesystem::{FileSystem, FileSystemBuilder, ROOT};

// Generated modules declare their filesystem through this re-export.
#[doc(hidden)]
pub use lazy_static::lazy_static;
