/*
 * This module persists the Working List (the user's full catalog of tracked
 * PDF files) as a single JSON document holding the ordered array of
 * absolute path strings. The document is rewritten in full after every
 * mutation (add, remove, sort), through a sibling temp file renamed over the
 * target so a failed write never corrupts the previous state.
 *
 * A trait (`WorkingListStoreOperations`) abstracts the storage for the app
 * logic layer and for mocking in tests; `CoreWorkingListStore` is the file
 * system implementation. Existence filtering of loaded paths is explicitly
 * NOT this module's job; the caller decides what to do with entries that
 * no longer resolve on disk.
 */
use crate::core::path_utils;
use serde_json;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

pub const WORKING_LIST_FILENAME: &str = "pdf_list.json";

#[derive(Debug)]
pub enum WorkingListError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl From<io::Error> for WorkingListError {
    fn from(err: io::Error) -> Self {
        WorkingListError::Io(err)
    }
}

impl From<serde_json::Error> for WorkingListError {
    fn from(err: serde_json::Error) -> Self {
        WorkingListError::Serde(err)
    }
}

impl std::fmt::Display for WorkingListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkingListError::Io(e) => write!(f, "Working list I/O error: {e}"),
            WorkingListError::Serde(e) => write!(f, "Working list serialization error: {e}"),
        }
    }
}

impl std::error::Error for WorkingListError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkingListError::Io(e) => Some(e),
            WorkingListError::Serde(e) => Some(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkingListError>;

pub trait WorkingListStoreOperations: Send + Sync {
    fn save(&self, paths: &[PathBuf]) -> Result<()>;
    fn load(&self) -> Vec<PathBuf>;
}

pub struct CoreWorkingListStore {
    data_dir: PathBuf,
}

impl CoreWorkingListStore {
    pub fn new(data_dir: PathBuf) -> Self {
        CoreWorkingListStore { data_dir }
    }

    fn list_file_path(&self) -> PathBuf {
        self.data_dir.join(WORKING_LIST_FILENAME)
    }
}

impl WorkingListStoreOperations for CoreWorkingListStore {
    /*
     * Writes the full ordered list of paths. Called after every add, remove
     * and sort, so the document always mirrors the in-memory Working List.
     */
    fn save(&self, paths: &[PathBuf]) -> Result<()> {
        let file_path = self.list_file_path();
        let bytes = serde_json::to_vec(&paths)?;
        path_utils::write_atomically(&file_path, &bytes)?;
        log::debug!(
            "CoreWorkingListStore: Saved {} entries to {file_path:?}.",
            paths.len()
        );
        Ok(())
    }

    /*
     * Reads the document back. A missing file is a normal first launch and
     * yields an empty list; malformed JSON is logged and also yields an
     * empty list (the document will be rewritten wholesale on the next
     * mutation).
     */
    fn load(&self) -> Vec<PathBuf> {
        let file_path = self.list_file_path();
        if !file_path.exists() {
            log::debug!("CoreWorkingListStore: No saved list at {file_path:?}, starting empty.");
            return Vec::new();
        }

        let file = match File::open(&file_path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("CoreWorkingListStore: Cannot open {file_path:?}: {e}");
                return Vec::new();
            }
        };
        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, Vec<PathBuf>>(reader) {
            Ok(paths) => {
                log::debug!(
                    "CoreWorkingListStore: Loaded {} entries from {file_path:?}.",
                    paths.len()
                );
                paths
            }
            Err(e) => {
                log::warn!(
                    "CoreWorkingListStore: Malformed working list {file_path:?} ({e}), starting empty."
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempdir().unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());
        let paths = vec![
            PathBuf::from("/docs/zeta.pdf"),
            PathBuf::from("/docs/alpha.pdf"),
            PathBuf::from("/docs/mid.pdf"),
        ];

        store.save(&paths).unwrap();
        let loaded = store.load();

        assert_eq!(loaded, paths);
    }

    #[test]
    fn test_load_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_malformed_json_returns_empty() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(WORKING_LIST_FILENAME), b"{not json").unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());

        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_document() {
        let dir = tempdir().unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());

        store.save(&[PathBuf::from("/docs/a.pdf")]).unwrap();
        store.save(&[PathBuf::from("/docs/b.pdf")]).unwrap();

        assert_eq!(store.load(), vec![PathBuf::from("/docs/b.pdf")]);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());

        store.save(&[PathBuf::from("/docs/a.pdf")]).unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp file should be renamed away");
    }

    #[test]
    fn test_wire_format_is_array_of_path_strings() {
        let dir = tempdir().unwrap();
        let store = CoreWorkingListStore::new(dir.path().to_path_buf());
        store
            .save(&[PathBuf::from("/docs/a.pdf"), PathBuf::from("/docs/b.pdf")])
            .unwrap();

        let raw = fs::read_to_string(dir.path().join(WORKING_LIST_FILENAME)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();

        assert!(parsed.is_array());
        assert_eq!(parsed[0], "/docs/a.pdf");
        assert_eq!(parsed[1], "/docs/b.pdf");
    }
}
