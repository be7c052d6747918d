use crate::{
    canon::canonicalize,
    collector::TreeCollector,
    errors::{FileOperation, IoError, NonUtf8PathError},
    utils::{join_emitted, join_key, normalize_path, strip_key},
};
use embedfs::{Entry, FileMode, FileSystem};
use flate2::{write::GzEncoder, Compression};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::{
    collections::HashSet,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};
use tera::{Context, Tera};
use thiserror::Error;

pub const DEFAULT_NAMESPACE: &str = "assets";
pub const DEFAULT_VARIABLE: &str = "ASSETS";
pub const DEFAULT_RUNTIME_CRATE: &str = "::embedfs";

const TEMPLATE_NAME: &str = "embed.rs";
const TEMPLATE: &str = include_str!("../templates/embed.rs.tera");

#[derive(Debug, Error, Diagnostic)]
pub enum SerializeError {
    #[error("I/O error within serialize domain")]
    #[diagnostic(code(embedgen::serialize::io))]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NonUtf8Path(#[from] NonUtf8PathError),

    #[error("'{name}' is not a valid {kind}")]
    #[diagnostic(
        code(embedgen::serialize::invalid_identifier),
        help("Namespace and variable must be Rust identifiers, the runtime crate a path like '::embedfs'")
    )]
    InvalidIdentifier { kind: &'static str, name: String },

    #[error("'{first}' and '{second}' both become '{path}' after stripping the prefix")]
    #[diagnostic(
        code(embedgen::serialize::path_collision),
        help("Embed the colliding roots separately or choose a different strip prefix")
    )]
    PathCollision {
        path: String,
        first: String,
        second: String,
    },

    #[error("strip prefix '{prefix}' separates '{path}' from its parent directory")]
    #[diagnostic(
        code(embedgen::serialize::prefix_splits_tree),
        help("The strip prefix must be an ancestor of, or equal to, the embedded roots")
    )]
    PrefixSplitsTree { prefix: String, path: String },

    #[error("Error occurred attempting to render generated source")]
    #[diagnostic(code(embedgen::serialize::render))]
    Render {
        #[source]
        source: tera::Error,
    },

    #[error("generated source does not parse")]
    #[diagnostic(
        code(embedgen::serialize::canonicalize),
        help("This is a bug in embedgen, please report it with the options used")
    )]
    Canonicalize {
        #[source]
        source: syn::Error,
    },
}

/// Knobs for the emitted module. Empty strings fall back to the `DEFAULT_*` values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Name of the generated module.
    pub namespace: String,
    /// Name of the generated `FileSystem` static.
    pub variable: String,
    /// Store file data gzip-compressed.
    pub compress: bool,
    /// Path prefix removed from every embedded path.
    pub strip_prefix: String,
    /// Path to the `embedfs` crate as seen from the generated code.
    pub runtime_crate: String,
}
impl Options {
    pub fn namespace(&self) -> &str {
        or_default(&self.namespace, DEFAULT_NAMESPACE)
    }

    pub fn variable(&self) -> &str {
        or_default(&self.variable, DEFAULT_VARIABLE)
    }

    pub fn runtime_crate(&self) -> &str {
        or_default(&self.runtime_crate, DEFAULT_RUNTIME_CRATE)
    }

    fn validate(&self) -> Result<(), SerializeError> {
        lazy_static::lazy_static! {
            static ref IDENT_REGEX: regex::Regex =
                regex::Regex::new(r"^(?:[A-Za-z][A-Za-z0-9_]*|_[A-Za-z0-9_]+)$")
                    .expect("a valid regex pattern");
            static ref CRATE_PATH_REGEX: regex::Regex = regex::Regex::new(
                r"(?x)
                ^(?:::)?                          # optional leading '::'
                [A-Za-z_][A-Za-z0-9_]*            # first segment
                (?:::[A-Za-z_][A-Za-z0-9_]*)*$    # further segments
                "
            )
            .expect("a valid regex pattern");
        }

        let checks = [
            ("module name", self.namespace(), &*IDENT_REGEX, true),
            ("variable name", self.variable(), &*IDENT_REGEX, true),
            ("runtime crate path", self.runtime_crate(), &*CRATE_PATH_REGEX, false),
        ];

        for (kind, name, regex, single) in checks {
            // syn rejects keywords such as `type`, `crate` and `Self`
            let is_keyword = single && syn::parse_str::<syn::Ident>(name).is_err();

            if !regex.is_match(name) || is_keyword {
                return Err(SerializeError::InvalidIdentifier {
                    kind,
                    name: name.to_string(),
                });
            }
        }

        Ok(())
    }
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Identifier of the static holding the bytes of the file collected at `path`.
///
/// `path` is the original, un-stripped key, hashed with SHA-1 and rendered as 40
/// uppercase hex digits, so the name depends on the path alone and never on content.
pub fn blob_ident(variable: &str, path: &str) -> String {
    format!("__{}_{:X}", variable, Sha1::digest(path.as_bytes()))
}

/// Emitted form of a collected tree: stripped paths, captured metadata and file bytes.
#[derive(Debug)]
pub(crate) struct Plan {
    pub compressed: bool,
    pub dirs: Vec<PlannedDir>,
    pub entries: Vec<PlannedEntry>,
}

impl Plan {
    /// Entries no directory lists: the tops of the embedded roots, in collection order.
    pub fn tops(&self) -> Vec<&PlannedEntry> {
        let listed: HashSet<String> = self
            .dirs
            .iter()
            .flat_map(|dir| dir.children.iter().map(|name| join_emitted(&dir.path, name)))
            .collect();

        self.entries
            .iter()
            .filter(|entry| !listed.contains(&entry.path))
            .collect()
    }
}

#[derive(Debug)]
pub(crate) struct PlannedDir {
    pub path: String,
    pub children: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct PlannedEntry {
    pub path: String,
    /// Key the collector registered, before stripping.
    pub source: String,
    pub mode: u32,
    pub mtime: (i64, u32),
    /// `None` for directories.
    pub data: Option<Vec<u8>>,
}

/// Resolves `collector` against `options`, reading (and compressing) every file.
pub(crate) fn plan(collector: &TreeCollector, options: &Options) -> Result<Plan, SerializeError> {
    options.validate()?;

    let prefix = normalize_path(Path::new(&options.strip_prefix))?;
    let mut emitted: IndexMap<String, &str> = IndexMap::new();
    let mut entries = Vec::with_capacity(collector.len());

    for (key, metadata) in collector.files() {
        let path = strip_key(key, &prefix);

        if let Some(first) = emitted.insert(path.clone(), key) {
            return Err(SerializeError::PathCollision {
                path,
                first: first.to_string(),
                second: key.clone(),
            });
        }

        let data = if metadata.is_dir() {
            None
        } else {
            Some(read_content(key, options.compress)?)
        };

        entries.push(PlannedEntry {
            path,
            source: key.clone(),
            mode: mode_bits(metadata),
            mtime: mtime(key, metadata)?,
            data,
        });
    }

    let mut dirs = Vec::with_capacity(collector.dirs().len());

    for (key, children) in collector.dirs() {
        let path = strip_key(key, &prefix);

        for name in children {
            let child = strip_key(&join_key(key, name), &prefix);

            if child != join_emitted(&path, name) {
                return Err(SerializeError::PrefixSplitsTree {
                    prefix: options.strip_prefix.clone(),
                    path: child,
                });
            }
        }

        dirs.push(PlannedDir {
            path,
            children: children.clone(),
        });
    }

    let plan = Plan {
        compressed: options.compress,
        dirs,
        entries,
    };

    for top in plan.tops() {
        if top.path != embedfs::ROOT {
            log::warn!(
                "'{}' is embedded as '{}', so '{}' cannot list it; set a strip prefix to re-root it",
                top.source,
                top.path,
                embedfs::ROOT
            );
        }
    }

    Ok(plan)
}

fn read_content(key: &str, compress: bool) -> Result<Vec<u8>, IoError> {
    let path = PathBuf::from(key);
    let data = fs::read(&path).map_err(|error| IoError::new(FileOperation::Read, path.clone(), error))?;

    if !compress {
        return Ok(data);
    }

    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(&data)
        .and_then(|()| encoder.finish())
        .map_err(|error| IoError::new(FileOperation::Compress, path, error))
}

#[cfg(unix)]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;

    metadata.mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &fs::Metadata) -> u32 {
    if metadata.is_dir() {
        FileMode::DIR | 0o755
    } else if metadata.permissions().readonly() {
        FileMode::REGULAR | 0o444
    } else {
        FileMode::REGULAR | 0o644
    }
}

/// Seconds and nanoseconds since the epoch, flooring for timestamps before it.
fn mtime(key: &str, metadata: &fs::Metadata) -> Result<(i64, u32), IoError> {
    let modified = metadata
        .modified()
        .map_err(|error| IoError::new(FileOperation::Stat, PathBuf::from(key), error))?;

    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(after) => (after.as_secs() as i64, after.subsec_nanos()),
        Err(before) => {
            let before = before.duration();
            let secs = -(before.as_secs() as i64);

            match before.subsec_nanos() {
                0 => (secs, 0),
                nanos => (secs - 1, 1_000_000_000 - nanos),
            }
        }
    })
}

#[derive(Debug, Serialize)]
struct BlobView {
    ident: String,
    literal: String,
}

#[derive(Debug, Serialize)]
struct DirView {
    path: String,
    children: Vec<String>,
}

#[derive(Debug, Serialize)]
struct EntryView {
    path: String,
    mode: String,
    secs: i64,
    nanos: u32,
    blob: Option<String>,
}

fn str_literal(value: &str) -> String {
    format!("{:?}", value)
}

fn bytes_literal(data: &[u8]) -> String {
    format!("b\"{}\"", data.escape_ascii())
}

/// Renders `plan` into canonical Rust source.
pub(crate) fn render(plan: &Plan, options: &Options) -> Result<String, SerializeError> {
    let variable = options.variable();
    let mut blobs = Vec::new();
    let mut entries = Vec::with_capacity(plan.entries.len());

    for entry in &plan.entries {
        let blob = entry.data.as_ref().map(|data| {
            let ident = blob_ident(variable, &entry.source);
            log::debug!("embedding {} ({} bytes) as {}", entry.path, data.len(), ident);

            blobs.push(BlobView {
                ident: ident.clone(),
                literal: bytes_literal(data),
            });

            ident
        });

        entries.push(EntryView {
            path: str_literal(&entry.path),
            mode: format!("0o{:o}", entry.mode),
            secs: entry.mtime.0,
            nanos: entry.mtime.1,
            blob,
        });
    }

    let dirs: Vec<DirView> = plan
        .dirs
        .iter()
        .map(|dir| DirView {
            path: str_literal(&dir.path),
            children: dir.children.iter().map(|name| str_literal(name)).collect(),
        })
        .collect();

    let mut context = Context::new();
    context.insert("namespace", options.namespace());
    context.insert("variable", variable);
    context.insert("runtime", options.runtime_crate());
    context.insert("compressed", &plan.compressed);
    context.insert("blobs", &blobs);
    context.insert("dirs", &dirs);
    context.insert("entries", &entries);

    let mut tera = Tera::default();
    tera.autoescape_on(vec![]);
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .map_err(|source| SerializeError::Render { source })?;

    let rendered = tera
        .render(TEMPLATE_NAME, &context)
        .map_err(|source| SerializeError::Render { source })?;

    canonicalize(&rendered).map_err(|source| SerializeError::Canonicalize { source })
}

/// Builds the runtime filesystem straight from `plan`, without going through source.
pub(crate) fn build(plan: Plan) -> FileSystem {
    let mut builder = FileSystem::builder().compressed(plan.compressed);

    for dir in &plan.dirs {
        let children: Vec<&str> = dir.children.iter().map(String::as_str).collect();
        builder = builder.dir(&dir.path, &children);
    }

    for entry in plan.entries {
        let mode = FileMode::from_bits(entry.mode);
        let (secs, nanos) = entry.mtime;

        builder = builder.entry(match entry.data {
            Some(data) => Entry::file(entry.path, mode, secs, nanos, data),
            None => Entry::dir(entry.path, mode, secs, nanos),
        });
    }

    builder.build()
}

/// Emits Rust source that rebuilds the collected tree as an `embedfs::FileSystem`.
///
/// File content is read from disk now, not during the walk. The result is a single
/// module named after [`Options::namespace`] holding one static per file, the
/// filesystem static and its initializer.
///
/// # Errors
///
/// Returns a [`SerializeError`] if an option is not a valid identifier, stripping makes
/// paths collide or detach, a file cannot be read, or the output fails to parse.
pub fn serialize(collector: &TreeCollector, options: &Options) -> Result<String, SerializeError> {
    let plan = plan(collector, options)?;

    log::info!(
        "serializing {} entries into module '{}' (compressed={})",
        plan.entries.len(),
        options.namespace(),
        plan.compressed
    );

    render(&plan, options)
}

/// The filesystem [`serialize`] would produce, built in-process.
pub fn materialize(collector: &TreeCollector, options: &Options) -> Result<FileSystem, SerializeError> {
    Ok(build(plan(collector, options)?))
}
