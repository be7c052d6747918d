use crate::{
    errors::{FileFormat, FileOperation, IoError, ParseError},
    serializer::Options,
};
use miette::Diagnostic;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "embedgen.toml";

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error within config domain")]
    #[diagnostic(code(embedgen::config::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),
}

/// Contents of an `embedgen.toml`. Every key is optional and relative paths are
/// resolved against the working directory, like paths given on the command line.
///
/// ```toml
/// roots = ["public"]
/// output = "src/assets.rs"
/// strip_prefix = "public"
/// compress = true
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files and directories to embed, in order.
    pub roots: Vec<PathBuf>,
    /// Where to write the generated source; stdout when absent.
    pub output: Option<PathBuf>,
    #[serde(flatten)]
    pub options: Options,
}
impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::Read, path.to_path_buf(), error))?;

        let parsed = toml::from_str(&content)
            .map_err(|error| ParseError::new(FileFormat::Toml, path.to_path_buf(), error))?;

        log::debug!("loaded config from {}", path.display());

        Ok(parsed)
    }
}
