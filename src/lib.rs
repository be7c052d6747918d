//! Build-time generator for embedded, read-only filesystems.
//!
//! `embedgen` walks directory trees and emits a Rust module that rebuilds them as an
//! [`embedfs::FileSystem`], with file contents stored as byte statics and optionally
//! gzip-compressed. Use [`Generator`] from a build script, or the `embedgen` binary.

mod api;
mod canon;
mod collector;
mod config;
pub mod errors;
mod preview;
mod serializer;
mod transactions;
mod utils;

pub use api::{generate, preview, write_output, EmbedgenError, Generator};
pub use canon::canonicalize;
pub use collector::{CollectError, TreeCollector};
pub use config::{Config, ConfigError, CONFIG_FILE_NAME};
pub use serializer::{
    blob_ident, materialize, serialize, Options, SerializeError, DEFAULT_NAMESPACE,
    DEFAULT_RUNTIME_CRATE, DEFAULT_VARIABLE,
};
pub use utils::normalize_path;
