//! Config file discovery.
//!
//! Each [`SearchPath`] resolves to one directory. The directories are checked
//! for `{dir}/{file_name}` from the **highest-priority end** (last in the list)
//! and the first file found is the one the store reads and later writes back
//! to. Missing files are skipped; any other I/O error is propagated.

use std::path::{Path, PathBuf};

use crate::error::ConfbindError;
use crate::types::SearchPath;

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Resolve every search path, keeping priority order and dropping the
/// unresolvable ones.
pub fn expand_search_paths(search_paths: &[SearchPath], app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .collect()
}

/// Find and read the highest-priority `{dir}/{file_name}`.
pub fn find_config_file(
    dirs: &[PathBuf],
    file_name: &str,
) -> Result<Option<(PathBuf, String)>, ConfbindError> {
    for dir in dirs.iter().rev() {
        let file_path = dir.join(file_name);
        if let Some(content) = read_if_exists(&file_path)? {
            return Ok(Some((file_path, content)));
        }
    }
    Ok(None)
}

/// Read a file, mapping "not found" to `None`.
pub fn read_if_exists(path: &Path) -> Result<Option<String>, ConfbindError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfbindError::IoError {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_explicit_path() {
        let p = PathBuf::from("/tmp/aai");
        let resolved = resolve_search_path(&SearchPath::Path(p.clone()), "ignored");
        assert_eq!(resolved, Some(p));
    }

    #[test]
    fn resolve_home_subdir() {
        if let Some(dir) = resolve_search_path(&SearchPath::Home(".aai"), "aai") {
            assert!(dir.ends_with(".aai"));
        }
    }

    #[test]
    fn no_file_exists() {
        let dir = TempDir::new().unwrap();
        let dirs = vec![dir.path().to_path_buf()];
        assert!(find_config_file(&dirs, "config.toml").unwrap().is_none());
    }

    #[test]
    fn highest_priority_file_wins() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("config.toml"), "provider = \"low\"\n").unwrap();
        fs::write(dir2.path().join("config.toml"), "provider = \"high\"\n").unwrap();

        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
        let (path, content) = find_config_file(&dirs, "config.toml").unwrap().unwrap();
        assert_eq!(path, dir2.path().join("config.toml"));
        assert!(content.contains("high"));
    }

    #[test]
    fn falls_back_to_lower_priority() {
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        fs::write(dir1.path().join("config.toml"), "provider = \"fallback\"\n").unwrap();

        let dirs = vec![dir1.path().to_path_buf(), dir2.path().to_path_buf()];
        let (_, content) = find_config_file(&dirs, "config.toml").unwrap().unwrap();
        assert!(content.contains("fallback"));
    }

    #[test]
    fn expand_keeps_order() {
        let a = PathBuf::from("/a");
        let b = PathBuf::from("/b");
        let dirs = expand_search_paths(
            &[SearchPath::Path(a.clone()), SearchPath::Path(b.clone())],
            "aai",
        );
        assert_eq!(dirs, vec![a, b]);
    }

    #[test]
    fn directory_in_place_of_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("config.toml")).unwrap();
        let result = read_if_exists(&dir.path().join("config.toml"));
        assert!(matches!(result, Err(ConfbindError::IoError { .. })));
    }
}
