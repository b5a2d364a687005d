use std::path::{Component, Path};

use crate::error::{Error, Result};

/// Extension trait for Path to provide checks used when materializing output
pub trait PathExt {
    /// Converts a path to a string slice, returning an error if the path contains invalid Unicode characters.
    ///
    /// # Examples
    /// ```
    /// use kiln::ext::PathExt;
    /// use std::path::Path;
    ///
    /// let path = Path::new("test");
    /// assert_eq!(path.to_str_checked().unwrap(), "test");
    /// ```
    fn to_str_checked(&self) -> Result<&str>;

    /// Whether the path is relative and stays inside the directory it is joined onto:
    /// no root, no prefix, no `..` and at least one normal component.
    ///
    /// # Examples
    /// ```
    /// use kiln::ext::PathExt;
    /// use std::path::Path;
    ///
    /// assert!(Path::new("cmd/api/main.go").is_contained_relative());
    /// assert!(!Path::new("../escape.txt").is_contained_relative());
    /// ```
    fn is_contained_relative(&self) -> bool;

    /// The path with `/` separators regardless of platform.
    fn to_slash_string(&self) -> String;
}

impl PathExt for Path {
    fn to_str_checked(&self) -> Result<&str> {
        self.to_str().ok_or_else(|| {
            Error::Other(anyhow::anyhow!(
                "Path '{}' contains invalid Unicode characters",
                self.display()
            ))
        })
    }

    fn is_contained_relative(&self) -> bool {
        let mut has_normal = false;
        for component in self.components() {
            match component {
                Component::Normal(_) => has_normal = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return false
                }
            }
        }
        has_normal
    }

    fn to_slash_string(&self) -> String {
        self.components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_to_str_checked_valid() {
        let path = Path::new("valid_path");
        assert_eq!(path.to_str_checked().unwrap(), "valid_path");
    }

    #[test]
    fn rejects_escaping_and_absolute_paths() {
        assert!(!Path::new("/etc/passwd").is_contained_relative());
        assert!(!Path::new("a/../../b").is_contained_relative());
        assert!(!Path::new("").is_contained_relative());
        assert!(!Path::new(".").is_contained_relative());
    }

    #[test]
    fn accepts_nested_relative_paths() {
        assert!(Path::new("internal/middleware/auth.go").is_contained_relative());
        assert!(Path::new("./Makefile").is_contained_relative());
    }

    #[test]
    fn slash_string_drops_current_dir() {
        assert_eq!(Path::new("./a/b.txt").to_slash_string(), "a/b.txt");
    }
}
