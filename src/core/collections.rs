/*
 * This module is responsible for managing collections: named, persisted
 * snapshots of the Working List. Each collection is one JSON document
 * (`<name>.pdfcol`) inside the collections directory, holding the ordered
 * `(path, name)` file entries, a save timestamp, and a format version tag.
 * It provides mechanisms to save, load, delete and list these documents.
 *
 * It includes a trait for collection operations (`CollectionManagerOperations`)
 * to facilitate testing and dependency injection, and a concrete
 * implementation (`CoreCollectionManager`). Deciding what to do with entries
 * whose files have since vanished is the caller's concern; this module only
 * validates the document format.
 */
use crate::core::models::{COLLECTION_FORMAT_VERSION, Collection, CollectionEntry};
use crate::core::path_utils;
use serde_json;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

pub const COLLECTION_FILE_EXTENSION: &str = "pdfcol";

const DATE_SAVED_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug)]
pub enum CollectionError {
    Io(io::Error),
    Serde(serde_json::Error),
    MissingVersion(PathBuf),
    CollectionNotFound(PathBuf),
}

impl From<io::Error> for CollectionError {
    fn from(err: io::Error) -> Self {
        CollectionError::Io(err)
    }
}

impl From<serde_json::Error> for CollectionError {
    fn from(err: serde_json::Error) -> Self {
        CollectionError::Serde(err)
    }
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionError::Io(e) => write!(f, "Collection I/O error: {e}"),
            CollectionError::Serde(e) => {
                write!(f, "Collection serialization/deserialization error: {e}")
            }
            CollectionError::MissingVersion(path) => {
                write!(f, "Invalid collection file format (no version field): {path:?}")
            }
            CollectionError::CollectionNotFound(path) => {
                write!(f, "Collection not found: {path:?}")
            }
        }
    }
}

impl std::error::Error for CollectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectionError::Io(e) => Some(e),
            CollectionError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CollectionError>;

pub trait CollectionManagerOperations: Send + Sync {
    fn save_collection(&self, target: &Path, entries: &[CollectionEntry]) -> Result<PathBuf>;
    fn load_collection(&self, path: &Path) -> Result<Collection>;
    fn delete_collection(&self, path: &Path) -> Result<()>;
    fn list_collections(&self) -> Result<Vec<String>>;
    /// Resolves a display name (as returned by `list_collections`) to the
    /// backing file path inside the collections directory.
    fn collection_path_for_name(&self, name: &str) -> PathBuf;
}

pub struct CoreCollectionManager {
    collections_dir: PathBuf,
}

impl CoreCollectionManager {
    pub fn new(collections_dir: PathBuf) -> Self {
        CoreCollectionManager { collections_dir }
    }

    fn with_extension(target: &Path) -> PathBuf {
        let already_tagged = target
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(COLLECTION_FILE_EXTENSION))
            .unwrap_or(false);
        if already_tagged {
            target.to_path_buf()
        } else {
            let mut name = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            name.push('.');
            name.push_str(COLLECTION_FILE_EXTENSION);
            target.with_file_name(name)
        }
    }

    fn timestamp_now() -> String {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        now.format(DATE_SAVED_FORMAT).unwrap_or_else(|e| {
            log::warn!("CoreCollectionManager: Failed to format save timestamp: {e}");
            String::new()
        })
    }
}

impl CollectionManagerOperations for CoreCollectionManager {
    /*
     * Serializes the given entries as a new collection document at `target`,
     * appending the `.pdfcol` extension if absent. The document is stamped
     * with the current local time and the format version, and written
     * atomically. Returns the final path (extension included).
     */
    fn save_collection(&self, target: &Path, entries: &[CollectionEntry]) -> Result<PathBuf> {
        let file_path = Self::with_extension(target);
        let collection = Collection {
            files: entries.to_vec(),
            date_saved: Self::timestamp_now(),
            version: COLLECTION_FORMAT_VERSION.to_string(),
        };

        let bytes = serde_json::to_vec_pretty(&collection)?;
        path_utils::write_atomically(&file_path, &bytes)?;
        log::debug!(
            "CoreCollectionManager: Saved collection with {} entries to {file_path:?}.",
            collection.files.len()
        );
        Ok(file_path)
    }

    /*
     * Reads and validates one collection document. A document without a
     * `version` field is rejected as a format error before any field-level
     * deserialization, matching the format contract; malformed JSON aborts
     * the load likewise. No filesystem-existence check of the referenced
     * files happens here.
     */
    fn load_collection(&self, path: &Path) -> Result<Collection> {
        log::trace!("CoreCollectionManager: Loading collection from {path:?}");
        if !path.exists() {
            return Err(CollectionError::CollectionNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let value: serde_json::Value = serde_json::from_reader(reader)?;
        if value.get("version").is_none() {
            return Err(CollectionError::MissingVersion(path.to_path_buf()));
        }

        let collection: Collection = serde_json::from_value(value)?;
        log::debug!(
            "CoreCollectionManager: Loaded collection ({} entries, saved {}) from {path:?}.",
            collection.files.len(),
            collection.date_saved
        );
        Ok(collection)
    }

    /*
     * Removes the backing file. Unlike the cache sweeps this is not
     * best-effort: a failed delete is returned to the caller for reporting,
     * since the user explicitly asked for the destruction and cannot undo it.
     */
    fn delete_collection(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(CollectionError::CollectionNotFound(path.to_path_buf()));
        }
        fs::remove_file(path)?;
        log::debug!("CoreCollectionManager: Deleted collection {path:?}.");
        Ok(())
    }

    /*
     * Lists the display names (extension stripped) of every `.pdfcol` file
     * in the collections directory, sorted case-insensitively ascending.
     */
    fn list_collections(&self) -> Result<Vec<String>> {
        if !self.collections_dir.exists() {
            log::debug!(
                "CoreCollectionManager: Collections directory {:?} not found, returning empty list.",
                self.collections_dir
            );
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry_result in fs::read_dir(&self.collections_dir)? {
            let entry = entry_result?;
            let path = entry.path();
            if path.is_file()
                && let Some(ext) = path.extension()
                && ext == COLLECTION_FILE_EXTENSION
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort_by_key(|name| name.to_lowercase());
        Ok(names)
    }

    fn collection_path_for_name(&self, name: &str) -> PathBuf {
        self.collections_dir
            .join(format!("{name}.{COLLECTION_FILE_EXTENSION}"))
    }
}
