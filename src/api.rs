use crate::{
    collector::{CollectError, TreeCollector},
    config::{Config, ConfigError},
    errors::{FileOperation, IoError},
    preview::{preview_as_tree, render_tree},
    serializer::{self, Options, SerializeError},
    transactions::{Active, RollbackOperation, Transaction},
};
use embedfs::FileSystem;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum EmbedgenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Collect(#[from] CollectError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error while writing generated source")]
    #[diagnostic(code(embedgen::output::io))]
    Io(#[from] IoError),

    #[error("no paths to embed")]
    #[diagnostic(
        code(embedgen::no_roots),
        help("Pass one or more paths, or list them under `roots` in embedgen.toml")
    )]
    NoRoots,
}

/// Collects paths and turns them into an embedded filesystem module.
///
/// This is the entry point for build scripts:
///
/// ```no_run
/// use embedgen::{Generator, Options};
///
/// let out = std::env::var("OUT_DIR").unwrap();
/// let mut generator = Generator::new(Options {
///     strip_prefix: "public".to_string(),
///     compress: true,
///     ..Options::default()
/// });
/// generator.add("public").unwrap();
///
/// let file = std::fs::File::create(format!("{}/assets.rs", out)).unwrap();
/// generator.write_to(file).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Generator {
    collector: TreeCollector,
    options: Options,
}
impl Generator {
    pub fn new(options: Options) -> Self {
        Self {
            collector: TreeCollector::new(),
            options,
        }
    }

    /// Registers `path` and everything below it. See [`TreeCollector::add_path`].
    pub fn add(&mut self, path: impl AsRef<Path>) -> Result<&mut Self, EmbedgenError> {
        self.collector.add_path(path)?;

        Ok(self)
    }

    pub fn collector(&self) -> &TreeCollector {
        &self.collector
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Emits the generated source for everything added so far.
    pub fn render(&self) -> Result<String, EmbedgenError> {
        Ok(serializer::serialize(&self.collector, &self.options)?)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), EmbedgenError> {
        let source = self.render()?;

        writer
            .write_all(source.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|error| IoError::new(FileOperation::Write, PathBuf::from("<writer>"), error))?;

        Ok(())
    }

    /// The filesystem the generated source builds, constructed in-process.
    pub fn filesystem(&self) -> Result<FileSystem, EmbedgenError> {
        Ok(serializer::materialize(&self.collector, &self.options)?)
    }

    /// The post-strip tree as plain text, one entry per line.
    pub fn tree(&self) -> Result<String, EmbedgenError> {
        let plan = serializer::plan(&self.collector, &self.options)?;

        Ok(render_tree(&plan))
    }

    pub fn preview(&self) -> Result<(), EmbedgenError> {
        let plan = serializer::plan(&self.collector, &self.options)?;

        preview_as_tree(&plan);

        Ok(())
    }
}

fn collect(config: &Config) -> Result<Generator, EmbedgenError> {
    if config.roots.is_empty() {
        return Err(EmbedgenError::NoRoots);
    }

    let mut generator = Generator::new(config.options.clone());

    for root in &config.roots {
        log::debug!("collecting {}", root.display());
        generator.add(root)?;
    }

    Ok(generator)
}

/// Collects every root in `config` and returns the generated source.
///
/// # Errors
///
/// Returns an [`EmbedgenError`] if:
///
/// - `config` names no roots.
/// - A root is missing or a directory below it cannot be walked.
/// - An option is invalid, stripping makes paths collide, or a file cannot be read.
pub fn generate(config: &Config) -> Result<String, EmbedgenError> {
    collect(config)?.render()
}

/// Prints the tree `generate` would embed, after prefix stripping.
pub fn preview(config: &Config) -> Result<(), EmbedgenError> {
    collect(config)?.preview()
}

/// Writes `contents` to `path`, creating missing parent directories.
///
/// The text goes to a hidden sibling first and is renamed over `path` once complete.
/// If any step fails, the temporary file and every directory this call created are
/// removed, so a failed write never leaves a truncated output behind.
pub fn write_output(path: &Path, contents: &str) -> Result<(), EmbedgenError> {
    let mut trx = Transaction::<Active>::new();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_directory(&mut trx, parent)?;
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.embedgen-tmp", name));

    fs::write(&tmp, contents).map_err(|error| IoError::new(FileOperation::Write, tmp.clone(), error))?;
    trx.add_operation(RollbackOperation::RemoveFile(tmp.clone()));

    fs::rename(&tmp, path).map_err(|error| IoError::new(FileOperation::Write, path.to_path_buf(), error))?;

    log::info!("wrote {} bytes to {}", contents.len(), path.display());

    trx.commit();

    Ok(())
}

/// Creates `path` and any missing ancestors, registering only the top-most directory
/// this call created for rollback.
fn create_directory(trx: &mut Transaction<Active>, path: &Path) -> Result<(), IoError> {
    let top_missing = path
        .ancestors()
        .take_while(|ancestor| !ancestor.as_os_str().is_empty() && !ancestor.exists())
        .last()
        .map(Path::to_path_buf);

    fs::create_dir_all(path).map_err(|error| IoError::new(FileOperation::Mkdir, path.into(), error))?;

    if let Some(top) = top_missing {
        log::debug!("created {}", top.display());
        trx.add_operation(RollbackOperation::RemoveDir(top));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_output_creates_parents() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("gen/nested/assets.rs");

        write_output(&target, "pub mod assets {}\n").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "pub mod assets {}\n");
        assert!(!tmp.path().join("gen/nested/.assets.rs.embedgen-tmp").exists());
    }

    #[test]
    fn failed_write_leaves_no_temporary_file() {
        let tmp = tempfile::tempdir().unwrap();
        // renaming a file over a directory fails
        let target = tmp.path().join("gen/assets.rs");
        fs::create_dir_all(target.join("occupied")).unwrap();

        assert!(write_output(&target, "x").is_err());
        assert!(!tmp.path().join("gen/.assets.rs.embedgen-tmp").exists());
        assert!(target.join("occupied").is_dir());
    }

    #[test]
    fn rollback_removes_only_new_directories() {
        let tmp = tempfile::tempdir().unwrap();

        {
            let mut trx = Transaction::<Active>::new();
            create_directory(&mut trx, &tmp.path().join("a/b/c")).unwrap();
            assert!(tmp.path().join("a/b/c").is_dir());
        }

        assert!(!tmp.path().join("a").exists());
        assert!(tmp.path().exists());
    }

    #[test]
    fn generate_requires_roots() {
        assert!(matches!(
            generate(&Config::default()),
            Err(EmbedgenError::NoRoots)
        ));
    }

    #[test]
    fn generator_renders_and_materializes() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("robots.txt"), "User-agent: *\n").unwrap();
        let root = crate::utils::normalize_path(tmp.path()).unwrap();

        let mut generator = Generator::new(Options {
            strip_prefix: root,
            ..Options::default()
        });
        generator.add(tmp.path()).unwrap();

        let fs = generator.filesystem().unwrap();
        assert_eq!(fs.read("/robots.txt").unwrap(), b"User-agent: *\n");

        let mut out = Vec::new();
        generator.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), generator.render().unwrap());
    }

    #[test]
    fn generator_tree_shows_stripped_layout() {
        colored::control::set_override(false);

        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("css")).unwrap();
        fs::write(tmp.path().join("css/site.css"), "body{}").unwrap();
        fs::write(tmp.path().join("index.html"), "<p>hi</p>").unwrap();
        let root = crate::utils::normalize_path(tmp.path()).unwrap();

        let mut generator = Generator::new(Options {
            strip_prefix: root.clone(),
            ..Options::default()
        });
        generator.add(tmp.path()).unwrap().add(tmp.path().join("css")).unwrap();

        assert_eq!(generator.options().strip_prefix, root);
        assert_eq!(generator.collector().len(), 4);
        assert_eq!(
            generator.tree().unwrap(),
            "└── /\n    ├── css\n    │   └── site.css (6 bytes)\n    └── index.html (9 bytes)\n"
        );
    }
}
