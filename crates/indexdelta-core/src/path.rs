//! Portable relative path keys.

use std::path::{Component, Path};

use crate::error::FilesystemError;

/// Compute the POSIX-style path of `path` relative to `root`.
///
/// Components are joined with `/` regardless of the host separator, so
/// manifests written on one platform match scans taken on another. No case
/// folding is applied.
pub fn relative_posix_path(root: &Path, path: &Path) -> Result<String, FilesystemError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| FilesystemError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                if !key.is_empty() {
                    key.push('/');
                }
                key.push_str(&part.to_string_lossy());
            }
            Component::CurDir => {}
            _ => {
                return Err(FilesystemError::OutsideRoot {
                    path: path.to_path_buf(),
                    root: root.to_path_buf(),
                });
            }
        }
    }

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_path_uses_forward_slashes() {
        let root = Path::new("/repo");
        let path = Path::new("/repo").join("src").join("lib").join("a.js");
        assert_eq!(relative_posix_path(root, &path).unwrap(), "src/lib/a.js");
    }

    #[test]
    fn test_top_level_file() {
        let key = relative_posix_path(Path::new("/repo"), Path::new("/repo/a.js")).unwrap();
        assert_eq!(key, "a.js");
    }

    #[test]
    fn test_case_is_preserved() {
        let key = relative_posix_path(Path::new("/repo"), Path::new("/repo/Src/A.js")).unwrap();
        assert_eq!(key, "Src/A.js");
    }

    #[test]
    fn test_outside_root_is_error() {
        let err = relative_posix_path(Path::new("/repo"), Path::new("/other/a.js")).unwrap_err();
        assert!(matches!(err, FilesystemError::OutsideRoot { .. }));
    }

    #[test]
    fn test_parent_components_are_rejected() {
        let err =
            relative_posix_path(Path::new("/repo"), Path::new("/repo/../etc/passwd")).unwrap_err();
        assert!(matches!(err, FilesystemError::OutsideRoot { .. }));
    }
}
