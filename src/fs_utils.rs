use crate::error::{Result, TreeplateError};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Lexically normalizes a path: drops `.` segments and redundant separators,
/// collapses `name/..` pairs. Leading `..` segments of a relative path are kept.
/// The filesystem is never consulted.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Resolves a directory given relative to `root_dir`, normalized
#[must_use]
pub fn resolve_subdir(root_dir: &Path, subdir: &Path) -> PathBuf {
    normalize_path(&root_dir.join(subdir))
}

/// Maps `input_path` beneath `input_root` onto the same relative location
/// beneath `output_root`
///
/// # Errors
///
/// Returns `TreeplateError::OutsideInputRoot` if `input_path` is not under `input_root`.
pub fn mirror_path(input_root: &Path, output_root: &Path, input_path: &Path) -> Result<PathBuf> {
    let relative =
        input_path
            .strip_prefix(input_root)
            .map_err(|_| TreeplateError::OutsideInputRoot {
                path: input_path.to_path_buf(),
            })?;

    Ok(normalize_path(&output_root.join(relative)))
}

/// Creates every missing parent directory of `path`
///
/// # Errors
///
/// Returns `TreeplateError::FileIo` naming the directory that could not be created.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| TreeplateError::file_io(parent, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path_basic() {
        assert_eq!(normalize_path(Path::new("/a/./b//c")), PathBuf::from("/a/b/c"));
        assert_eq!(normalize_path(Path::new("/a/b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize_path(Path::new("a/b/")), PathBuf::from("a/b"));
    }

    #[test]
    fn test_normalize_path_parent_edges() {
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize_path(Path::new("/a/../../b")), PathBuf::from("/b"));
        assert_eq!(normalize_path(Path::new("../a")), PathBuf::from("../a"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_path(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn test_resolve_subdir() {
        assert_eq!(
            resolve_subdir(Path::new("/workspace"), Path::new("./config")),
            PathBuf::from("/workspace/config")
        );
        assert_eq!(
            resolve_subdir(Path::new("/workspace/"), Path::new("a/../input")),
            PathBuf::from("/workspace/input")
        );
        assert_eq!(
            resolve_subdir(Path::new("."), Path::new("./output")),
            PathBuf::from("output")
        );
    }

    #[test]
    fn test_mirror_path() {
        let out = mirror_path(
            Path::new("/root/input"),
            Path::new("/root/output"),
            Path::new("/root/input/a/b.txt"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/root/output/a/b.txt"));

        let out = mirror_path(
            Path::new("input"),
            Path::new("./out/"),
            Path::new("input/x.txt"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("out/x.txt"));
    }

    #[test]
    fn test_mirror_path_outside_root() {
        let result = mirror_path(
            Path::new("/root/input"),
            Path::new("/root/output"),
            Path::new("/root/inputs/x.txt"),
        );
        assert!(matches!(
            result,
            Err(TreeplateError::OutsideInputRoot { .. })
        ));
    }

    #[test]
    fn test_ensure_parent_dir_creates_nested() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a/b/c/file.txt");

        ensure_parent_dir(&target).unwrap();
        assert!(temp_dir.path().join("a/b/c").is_dir());
        assert!(!target.exists());

        // Idempotent
        ensure_parent_dir(&target).unwrap();
    }

    #[test]
    fn test_ensure_parent_dir_blocked_by_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("blocker"), "x").unwrap();

        let result = ensure_parent_dir(&temp_dir.path().join("blocker/file.txt"));
        assert!(matches!(result, Err(TreeplateError::FileIo { .. })));
    }

    #[test]
    fn test_ensure_parent_dir_bare_file_name() {
        ensure_parent_dir(Path::new("file.txt")).unwrap();
    }
}
