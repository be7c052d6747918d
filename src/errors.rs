use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("inspecting a path")]
    Stat,
    #[error("reading a file")]
    Read,
    #[error("compressing a file")]
    Compress,
    #[error("writing a file")]
    Write,
    #[error("creating a directory")]
    Mkdir,
}
#[derive(Debug, Error, Diagnostic)]
#[error("I/O error: {operation} on path '{path}'")]
#[diagnostic(
    code(embedgen::io),
    help("Check file permissions, disk space, or that the path is correct.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: std::path::PathBuf,
    #[source]
    pub source: std::io::Error,
}
impl IoError {
    pub fn new(operation: FileOperation, path: std::path::PathBuf, error: std::io::Error) -> Self {
        Self {
            operation,
            path,
            source: error,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum FileFormat {
    #[error("toml")]
    Toml,
}
#[derive(Debug, Error, Diagnostic)]
#[error("Parsing error: {file_format} on '{path}'")]
#[diagnostic(code(embedgen::parse), help("Review file"))]
pub struct ParseError {
    pub file_format: FileFormat,
    pub path: std::path::PathBuf,
    #[source]
    pub source: toml::de::Error,
}
impl ParseError {
    pub fn new(file_format: FileFormat, path: std::path::PathBuf, error: toml::de::Error) -> Self {
        Self {
            file_format,
            path,
            source: error,
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
#[error("path '{}' is not valid UTF-8", path.display())]
#[diagnostic(
    code(embedgen::non_utf8_path),
    help("Embedded paths become string literals, rename the file to use UTF-8")
)]
pub struct NonUtf8PathError {
    pub path: std::path::PathBuf,
}
