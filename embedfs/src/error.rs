use miette::Diagnostic;
use thiserror::Error;

/// Failures returned by lookups against an embedded [`FileSystem`](crate::FileSystem).
///
/// None of these are fatal to the host program; callers decide what a miss means.
#[derive(Debug, Error, Diagnostic)]
pub enum VfsError {
    #[error("no embedded entry at '{path}'")]
    #[diagnostic(
        code(embedfs::not_found),
        help("Embedded paths are absolute and slash separated, e.g. '/index.html'")
    )]
    NotFound { path: String },

    #[error("cannot {operation} '{path}'")]
    #[diagnostic(code(embedfs::invalid_operation))]
    InvalidOperation {
        path: String,
        operation: &'static str,
    },

    #[error("embedded data for '{path}' is not a valid gzip stream")]
    #[diagnostic(
        code(embedfs::decompress),
        help("The generated source may be stale or hand edited, regenerate it")
    )]
    Decompress {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
impl VfsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
