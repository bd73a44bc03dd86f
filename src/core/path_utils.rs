/*
 * This module provides utility functions for path manipulation, focusing on
 * retrieving and ensuring the existence of application-specific directories:
 * the base data directory plus the `previews` cache and `collections`
 * subdirectories used by the stores. It centralizes directory logic so the
 * individual managers do not each reimplement creation and logging.
 */
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const PREVIEWS_SUBFOLDER_NAME: &str = "previews";
pub const COLLECTIONS_SUBFOLDER_NAME: &str = "collections";

/*
 * Retrieves the application's local data directory, creating it if needed.
 * The path is derived without an organization qualifier, placing it directly
 * under the user's local application data structure (e.g. AppData/Local on
 * Windows, ~/.local/share on Linux).
 *
 * Returns `None` if the directory could not be determined or created.
 */
pub fn get_base_app_data_dir(app_name: &str) -> Option<PathBuf> {
    log::trace!("PathUtils: Attempting to get base app data dir for '{app_name}'");
    ProjectDirs::from("", "", app_name).and_then(|proj_dirs| {
        let data_path = proj_dirs.data_local_dir();
        if !data_path.exists() {
            if let Err(e) = fs::create_dir_all(data_path) {
                log::error!("PathUtils: Failed to create base app data directory {data_path:?}: {e}");
                return None;
            }
            log::debug!("PathUtils: Created base app data directory: {data_path:?}");
        } else {
            log::trace!("PathUtils: Base app data directory already exists: {data_path:?}");
        }
        Some(data_path.to_path_buf())
    })
}

/*
 * Ensures a named subdirectory exists under a base directory, creating it if
 * needed. Used for the `previews` and `collections` folders. Returns `None`
 * on creation failure, which callers treat as "no storage available".
 */
pub fn ensure_subdir(base: &Path, name: &str) -> Option<PathBuf> {
    let subdir = base.join(name);
    if !subdir.exists() {
        if let Err(e) = fs::create_dir_all(&subdir) {
            log::error!("PathUtils: Failed to create subdirectory {subdir:?}: {e}");
            return None;
        }
        log::debug!("PathUtils: Created subdirectory: {subdir:?}");
    }
    Some(subdir)
}

/*
 * Writes `bytes` to `target` through a sibling temp file renamed into place
 * on success, so a failure mid-write never corrupts the previous contents.
 * Used by both the working-list and collection writers.
 */
pub fn write_atomically(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "write".to_string());
    let temp_path = parent.join(format!(".{file_name}.tmp"));

    if let Err(e) = fs::write(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomically_replaces_existing_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("doc.json");
        fs::write(&target, b"old").unwrap();

        write_atomically(&target, b"new").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp file should be renamed away");
    }

    #[test]
    fn test_ensure_subdir_creates_if_not_exists() {
        let dir = tempdir().unwrap();

        let subdir = ensure_subdir(dir.path(), PREVIEWS_SUBFOLDER_NAME);

        assert!(subdir.is_some(), "Subdirectory should be determined");
        let subdir = subdir.unwrap();
        assert!(subdir.exists(), "Subdirectory should be created");
        assert!(subdir.is_dir());
        assert_eq!(subdir.file_name().unwrap_or_default(), PREVIEWS_SUBFOLDER_NAME);
    }

    #[test]
    fn test_ensure_subdir_returns_existing() {
        let dir = tempdir().unwrap();

        let first = ensure_subdir(dir.path(), COLLECTIONS_SUBFOLDER_NAME).unwrap();
        let second = ensure_subdir(dir.path(), COLLECTIONS_SUBFOLDER_NAME).unwrap();

        assert_eq!(first, second, "Should return the same existing path");
    }

    #[test]
    fn test_get_base_app_data_dir_creates_if_not_exists() {
        // Highly unique app name to avoid collision with actual user data or
        // other test runs.
        let unique_app_name = format!("TestApp_PrintStation_PathUtils_{}", rand::random::<u128>());
        if let Some(proj_dirs) = ProjectDirs::from("", "", &unique_app_name) {
            let path_to_check = proj_dirs.data_local_dir();
            if path_to_check.exists() {
                fs::remove_dir_all(path_to_check).expect("Pre-test cleanup failed");
            }
        }

        let path_opt = get_base_app_data_dir(&unique_app_name);

        assert!(path_opt.is_some(), "Should return a path for a new app name");
        let path = path_opt.unwrap();
        assert!(path.exists(), "Directory should have been created at {path:?}");
        assert!(path.is_dir());

        // Cleanup the created directory.
        if let Some(proj_dirs) = ProjectDirs::from("", "", &unique_app_name) {
            let dir_to_remove = proj_dirs.data_local_dir();
            if dir_to_remove.exists() {
                if let Err(e) = fs::remove_dir_all(dir_to_remove) {
                    eprintln!("Test cleanup error for {}: {e}", path.display());
                }
            }
        }
    }
}
