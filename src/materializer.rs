//! Writing rendered output to disk.
//!
//! Every file is written to a temporary sibling and renamed into place, so a
//! failed run never leaves a truncated file behind.

use indexmap::IndexMap;
use log::debug;
use rayon::prelude::*;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ext::PathExt;

/// One file ready to be written, relative to the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFile {
    /// Where the content came from, for error messages
    pub origin: String,
    /// Relative path with `/` separators
    pub destination: String,
    pub contents: Vec<u8>,
    pub executable: bool,
}

/// Ensures the output directory is absent or empty, unless `force` is set.
pub fn get_output_dir<P: AsRef<Path>>(output_dir: P, force: bool) -> Result<PathBuf> {
    let output_dir = output_dir.as_ref();
    if output_dir.exists() && !force {
        let mut entries =
            std::fs::read_dir(output_dir).map_err(|e| Error::filesystem(output_dir, e))?;
        if entries.next().is_some() {
            return Err(Error::OutputDirectoryExistsError {
                output_dir: output_dir.display().to_string(),
            });
        }
    }
    Ok(output_dir.to_path_buf())
}

/// Checks a rendered destination and returns it in `/` form.
///
/// It must be relative, must not climb out with `..` and must not contain an
/// empty segment, which is what a conditional path segment leaves when it
/// renders to nothing.
pub fn check_destination(origin: &str, destination: &str) -> Result<String> {
    let unsafe_destination = || Error::UnsafeDestination {
        template: origin.to_string(),
        destination: destination.to_string(),
    };
    let normalized = destination.replace('\\', "/");
    let trimmed = normalized.strip_prefix("./").unwrap_or(&normalized);
    if trimmed.split('/').any(|segment| segment.trim().is_empty()) {
        return Err(unsafe_destination());
    }
    let path = Path::new(trimmed);
    if !path.is_contained_relative() {
        return Err(unsafe_destination());
    }
    Ok(path.to_slash_string())
}

/// Fails when two files would land on the same destination.
pub fn check_duplicates(files: &[RenderedFile]) -> Result<()> {
    let mut seen: IndexMap<&str, &str> = IndexMap::with_capacity(files.len());
    for file in files {
        if let Some(first) = seen.insert(&file.destination, &file.origin) {
            return Err(Error::DuplicateDestination {
                first: first.to_string(),
                second: file.origin.clone(),
                destination: file.destination.clone(),
            });
        }
    }
    Ok(())
}

/// Writes `contents` to `root/relative` through a temporary file in the same
/// directory, then sets permissions.
pub fn write_atomic(root: &Path, relative: &str, contents: &[u8], executable: bool) -> Result<PathBuf> {
    let target = root.join(relative);
    let parent = target.parent().unwrap_or(root);
    std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::filesystem(parent, e))?;
    temp.write_all(contents).map_err(|e| Error::filesystem(&target, e))?;
    temp.as_file().sync_all().map_err(|e| Error::filesystem(&target, e))?;
    set_permissions(temp.path(), executable).map_err(|e| Error::filesystem(&target, e))?;
    temp.persist(&target).map_err(|e| Error::filesystem(&target, e.error))?;

    debug!("Wrote {}", target.display());
    Ok(target)
}

#[cfg(unix)]
fn set_permissions(path: &Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o755 } else { 0o644 };
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}

/// Writes all files on `pool`. Returns the written paths in input order.
pub fn write_all(root: &Path, files: &[RenderedFile], pool: &rayon::ThreadPool) -> Result<Vec<PathBuf>> {
    pool.install(|| {
        files
            .par_iter()
            .map(|file| write_atomic(root, &file.destination, &file.contents, file.executable))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file(origin: &str, destination: &str) -> RenderedFile {
        RenderedFile {
            origin: origin.into(),
            destination: destination.into(),
            contents: b"package main\n".to_vec(),
            executable: false,
        }
    }

    #[test]
    fn output_dir_must_be_missing_or_empty() {
        let dir = TempDir::new().unwrap();
        assert!(get_output_dir(dir.path(), false).is_ok());
        assert!(get_output_dir(dir.path().join("new"), false).is_ok());

        std::fs::write(dir.path().join("existing.txt"), "x").unwrap();
        let err = get_output_dir(dir.path(), false).unwrap_err();
        assert!(matches!(err, Error::OutputDirectoryExistsError { .. }));
        assert!(get_output_dir(dir.path(), true).is_ok());
    }

    #[test]
    fn destinations_are_checked() {
        assert_eq!(check_destination("a", "./cmd/api/main.go").unwrap(), "cmd/api/main.go");
        assert!(check_destination("a", "../main.go").is_err());
        assert!(check_destination("a", "/etc/passwd").is_err());
        assert!(check_destination("a", "internal//auth.go").is_err());
        assert!(check_destination("a", "").is_err());
        assert!(matches!(
            check_destination("auth.go.tmpl", "internal/ /auth.go").unwrap_err(),
            Error::UnsafeDestination { ref template, .. } if template == "auth.go.tmpl"
        ));
    }

    #[test]
    fn duplicates_name_both_sources() {
        let err = check_duplicates(&[file("a.tmpl", "main.go"), file("b.tmpl", "main.go")]).unwrap_err();
        match err {
            Error::DuplicateDestination { first, second, destination } => {
                assert_eq!((first.as_str(), second.as_str()), ("a.tmpl", "b.tmpl"));
                assert_eq!(destination, "main.go");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(check_duplicates(&[file("a", "x"), file("b", "y")]).is_ok());
    }

    #[test]
    fn writes_nested_files_in_parallel() {
        let dir = TempDir::new().unwrap();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
        let files = vec![file("a", "cmd/api/main.go"), file("b", "internal/auth/auth.go")];
        let written = write_all(dir.path(), &files, &pool).unwrap();
        assert_eq!(written[0], dir.path().join("cmd/api/main.go"));
        assert_eq!(std::fs::read_to_string(&written[1]).unwrap(), "package main\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("cmd/api")).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_set() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let script = write_atomic(dir.path(), "scripts/run.sh", b"#!/bin/sh\n", true).unwrap();
        let plain = write_atomic(dir.path(), "README.md", b"# api\n", false).unwrap();
        assert_eq!(std::fs::metadata(script).unwrap().permissions().mode() & 0o777, 0o755);
        assert_eq!(std::fs::metadata(plain).unwrap().permissions().mode() & 0o777, 0o644);
    }

    #[test]
    fn overwrites_existing_file_atomically() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("go.mod"), "old").unwrap();
        write_atomic(dir.path(), "go.mod", b"new", false).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("go.mod")).unwrap(), "new");
    }
}
