//! Directory traversal: container listing and subdirectory navigation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::NavError;
use crate::tracks::ContainerRef;

const CONTAINER_EXTENSION: &str = "mkv";

fn is_container(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CONTAINER_EXTENSION))
}

/// Matroska files under `root`, ordered by path segment.
///
/// Symlinks are not followed. An unreadable root is logged and yields an
/// empty list.
pub fn list_containers(root: &Path, recurse: bool) -> Vec<ContainerRef> {
    let mut walker = WalkDir::new(root).follow_links(false).sort_by_file_name();

    // Non-recursive = only the root directory.
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut containers: Vec<ContainerRef> = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() && is_container(entry.path()) {
            containers.push(ContainerRef::new(entry.into_path(), root));
        }
    }

    containers.sort_by(|a, b| a.path.components().cmp(b.path.components()));
    debug!(
        "Found {} container(s) in {} (recurse={})",
        containers.len(),
        root.display(),
        recurse
    );
    containers
}

/// Names of the immediate subdirectories of `dir`, sorted. Symlinks are
/// excluded, hidden directories are not.
pub fn list_subdirectories(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

/// Resolve `name` below `root` and check it can be listed.
pub fn enter_subdirectory(root: &Path, name: &str) -> Result<PathBuf, NavError> {
    let path = root.join(name);

    let metadata = fs::metadata(&path).map_err(|e| nav_error(&path, e))?;
    if !metadata.is_dir() {
        return Err(NavError::NotADirectory(path));
    }

    fs::read_dir(&path).map_err(|e| nav_error(&path, e))?;
    Ok(path)
}

/// The directory one level up, if there is one.
pub fn parent_directory(dir: &Path) -> Option<PathBuf> {
    dir.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

fn nav_error(path: &Path, e: std::io::Error) -> NavError {
    match e.kind() {
        ErrorKind::NotFound => NavError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => NavError::PermissionDenied(path.to_path_buf()),
        _ => NavError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn names(containers: &[ContainerRef]) -> Vec<&str> {
        containers.iter().map(|c| c.display_name.as_str()).collect()
    }

    #[test]
    fn empty_directory_has_no_containers() {
        let temp = TempDir::new().unwrap();
        assert!(list_containers(temp.path(), true).is_empty());
    }

    #[test]
    fn only_matroska_files_are_listed() {
        let temp = TempDir::new().unwrap();
        temp.child("b.mkv").touch().unwrap();
        temp.child("A.MKV").touch().unwrap();
        temp.child("c.mp4").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();
        temp.child("mkv").touch().unwrap();

        let found = list_containers(temp.path(), false);
        assert_eq!(names(&found), vec!["A.MKV", "b.mkv"]);
        assert_eq!(found[1].path, temp.path().join("b.mkv"));
    }

    #[test]
    fn recursion_is_opt_in() {
        let temp = TempDir::new().unwrap();
        temp.child("top.mkv").touch().unwrap();
        temp.child("Season 1/e01.mkv").touch().unwrap();
        temp.child("Season 1/e02.mkv").touch().unwrap();
        temp.child("Season 1/extras/x.mkv").touch().unwrap();

        assert_eq!(names(&list_containers(temp.path(), false)), vec!["top.mkv"]);
        assert_eq!(
            names(&list_containers(temp.path(), true)),
            vec![
                "Season 1/e01.mkv",
                "Season 1/e02.mkv",
                "Season 1/extras/x.mkv",
                "top.mkv"
            ]
        );
    }

    #[test]
    fn directory_named_like_a_container_is_ignored() {
        let temp = TempDir::new().unwrap();
        temp.child("weird.mkv").create_dir_all().unwrap();
        assert!(list_containers(temp.path(), false).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_files_are_skipped() {
        let temp = TempDir::new().unwrap();
        temp.child("real.mkv").touch().unwrap();
        std::os::unix::fs::symlink(temp.path().join("real.mkv"), temp.path().join("link.mkv"))
            .unwrap();

        assert_eq!(names(&list_containers(temp.path(), false)), vec!["real.mkv"]);
    }

    #[test]
    fn missing_root_yields_empty_list() {
        assert!(list_containers(Path::new("/definitely/not/a/dir"), true).is_empty());
    }

    #[test]
    fn subdirectories_are_sorted_and_include_hidden() {
        let temp = TempDir::new().unwrap();
        temp.child("b").create_dir_all().unwrap();
        temp.child("a").create_dir_all().unwrap();
        temp.child(".hidden").create_dir_all().unwrap();
        temp.child("file.mkv").touch().unwrap();

        assert_eq!(list_subdirectories(temp.path()), vec![".hidden", "a", "b"]);
    }

    #[test]
    fn entering_subdirectories() {
        let temp = TempDir::new().unwrap();
        temp.child("shows").create_dir_all().unwrap();
        temp.child("movie.mkv").touch().unwrap();

        assert_eq!(
            enter_subdirectory(temp.path(), "shows"),
            Ok(temp.path().join("shows"))
        );
        assert_eq!(
            enter_subdirectory(temp.path(), "movie.mkv"),
            Err(NavError::NotADirectory(temp.path().join("movie.mkv")))
        );
        assert_eq!(
            enter_subdirectory(temp.path(), "gone"),
            Err(NavError::NotFound(temp.path().join("gone")))
        );
    }

    #[test]
    fn parent_of_nested_directory() {
        assert_eq!(
            parent_directory(Path::new("/media/shows")),
            Some(PathBuf::from("/media"))
        );
        assert_eq!(parent_directory(Path::new("/")), None);
        assert_eq!(parent_directory(Path::new("shows")), None);
    }
}
