use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/*
 * Domain types shared across the core. A `PdfReference` is the runtime
 * representation of one tracked file; it is not serialized directly. The
 * working-list document stores bare paths and collection documents store
 * `CollectionEntry` pairs, which keeps the on-disk formats independent of
 * whatever runtime state this struct grows later.
 */

/*
 * One tracked PDF file: its filesystem path plus the display name shown in
 * lists (the path's basename). Uniqueness is by path; two references with
 * the same basename in different directories are distinct entries.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfReference {
    pub path: PathBuf,
    pub name: String,
}

impl PdfReference {
    pub fn new(path: PathBuf) -> Self {
        let name = display_name_for(&path);
        PdfReference { path, name }
    }
}

/// Basename of `path` as shown in lists; falls back to the full path text
/// for paths without a final component.
pub fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Case-insensitive `.pdf` extension check, applied before a file is allowed
/// into the working list.
pub fn path_has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/*
 * One `(path, display-name)` pair inside a persisted collection document.
 * Field names are the on-disk JSON keys.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub path: PathBuf,
    pub name: String,
}

impl From<&PdfReference> for CollectionEntry {
    fn from(reference: &PdfReference) -> Self {
        CollectionEntry {
            path: reference.path.clone(),
            name: reference.name.clone(),
        }
    }
}

/// Version tag written into every collection document. Loading rejects
/// documents without a `version` field.
pub const COLLECTION_FORMAT_VERSION: &str = "1.0";

/*
 * A named, persisted snapshot of the working list: the ordered file entries,
 * the save timestamp (`YYYY-MM-DD HH:MM:SS`) and the format version tag.
 * Serialized one document per collection file.
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub files: Vec<CollectionEntry>,
    pub date_saved: String,
    pub version: String,
}

/// How a loaded collection is applied to the working list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionLoadMode {
    /// Clear the working list, then add the collection's files.
    Replace,
    /// Keep the working list and add the collection's files after it.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}
