use crate::errors::NonUtf8PathError;
use std::path::{Component, Path};

/// Key used for the current directory when a normalized path would be empty.
pub const CURRENT_DIR: &str = ".";

/// Turns a filesystem path into the slash separated key the collector works with.
///
/// `.` segments are dropped, `..` pops the previous segment and absolute paths keep a
/// leading `/`. Leading `..` segments of a relative path are kept. An empty result
/// becomes [`CURRENT_DIR`].
pub fn normalize_path(source: &Path) -> Result<String, NonUtf8PathError> {
    let mut segments: Vec<&str> = Vec::new();
    let mut prefix = String::new();

    for component in source.components() {
        match component {
            // Skip the current-dir marker "."
            Component::CurDir => {}

            // For "..", pop the last segment if possible
            Component::ParentDir => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if prefix.is_empty() => segments.push(".."),
                _ => {}
            },

            Component::RootDir => prefix.push('/'),

            Component::Prefix(drive) => {
                let drive = drive.as_os_str().to_str().ok_or_else(|| NonUtf8PathError {
                    path: source.to_path_buf(),
                })?;
                prefix.insert_str(0, drive);
            }

            Component::Normal(segment) => {
                segments.push(segment.to_str().ok_or_else(|| NonUtf8PathError {
                    path: source.to_path_buf(),
                })?);
            }
        }
    }

    let joined = format!("{}{}", prefix, segments.join("/"));

    if joined.is_empty() {
        Ok(CURRENT_DIR.to_string())
    } else {
        Ok(joined)
    }
}

/// Parent of a normalized key, `None` for the filesystem root and [`CURRENT_DIR`].
pub fn parent_key(key: &str) -> Option<String> {
    if key == CURRENT_DIR || key == "/" {
        return None;
    }

    match key.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(index) => Some(key[..index].to_string()),
        None => Some(CURRENT_DIR.to_string()),
    }
}

/// Appends `name` to a normalized key.
pub fn join_key(parent: &str, name: &str) -> String {
    if parent == CURRENT_DIR {
        name.to_string()
    } else if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Removes `prefix` from `key` on a segment boundary and re-roots the result at `/`.
///
/// Both arguments are normalized keys. A key equal to the prefix becomes the root
/// marker; a key outside the prefix keeps its own segments.
pub fn strip_key(key: &str, prefix: &str) -> String {
    let prefix = prefix.trim_end_matches('/');

    let rest = if prefix.is_empty() || prefix == CURRENT_DIR {
        key
    } else if key == prefix {
        ""
    } else {
        match key.strip_prefix(prefix) {
            Some(rest) if rest.starts_with('/') => rest,
            _ => key,
        }
    };

    match rest {
        "" | CURRENT_DIR => embedfs::ROOT.to_string(),
        rest if rest.starts_with('/') => rest.to_string(),
        rest => format!("/{}", rest),
    }
}

/// The final segment of an emitted (stripped) path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub fn join_emitted(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_drops_dots_and_resolves_parents() {
        assert_eq!(normalize_path(Path::new("./a/./b/../c")).unwrap(), "a/c");
        assert_eq!(normalize_path(Path::new("a/")).unwrap(), "a");
        assert_eq!(normalize_path(Path::new(".")).unwrap(), ".");
        assert_eq!(normalize_path(Path::new("")).unwrap(), ".");
        assert_eq!(normalize_path(Path::new("../x/./y")).unwrap(), "../x/y");
        assert_eq!(normalize_path(Path::new("a/../../x")).unwrap(), "../x");
    }

    #[test]
    fn parent_key_walks_up_one_segment() {
        assert_eq!(parent_key("a/b.txt").as_deref(), Some("a"));
        assert_eq!(parent_key("b.txt").as_deref(), Some("."));
        assert_eq!(parent_key("/srv").as_deref(), Some("/"));
        assert_eq!(parent_key("."), None);
        assert_eq!(parent_key("/"), None);
    }

    #[cfg(unix)]
    #[test]
    fn normalize_keeps_absolute_root() {
        assert_eq!(normalize_path(Path::new("/srv/www/")).unwrap(), "/srv/www");
        assert_eq!(normalize_path(Path::new("/")).unwrap(), "/");
    }

    #[test]
    fn join_key_handles_current_dir_and_root() {
        assert_eq!(join_key(".", "a.txt"), "a.txt");
        assert_eq!(join_key("/", "srv"), "/srv");
        assert_eq!(join_key("a/b", "c"), "a/b/c");
    }

    #[test]
    fn strip_whole_segment_collapses_to_root() {
        assert_eq!(strip_key("a", "a"), "/");
        assert_eq!(strip_key("a/b.txt", "a"), "/b.txt");
        assert_eq!(strip_key("a/c/d", "a/c"), "/d");
    }

    #[test]
    fn strip_respects_segment_boundaries() {
        assert_eq!(strip_key("ab/x", "a"), "/ab/x");
        assert_eq!(strip_key("other", "a"), "/other");
    }

    #[test]
    fn strip_without_prefix_roots_relative_keys() {
        assert_eq!(strip_key("a/b", ""), "/a/b");
        assert_eq!(strip_key("a/b", "."), "/a/b");
        assert_eq!(strip_key(".", "."), "/");
        assert_eq!(strip_key("/srv/x", ""), "/srv/x");
        assert_eq!(strip_key("/srv/x", "/"), "/srv/x");
        assert_eq!(strip_key("/srv/x", "/srv"), "/x");
    }

    #[test]
    fn base_name_of_emitted_paths() {
        assert_eq!(base_name("/css/site.css"), "site.css");
        assert_eq!(base_name("/top"), "top");
    }
}
