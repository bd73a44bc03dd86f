/*
 * This module consolidates the core, presentation-agnostic logic of the
 * application. It re-exports the key data structures and the abstractions
 * (`WorkingListStoreOperations`, `CollectionManagerOperations`,
 * `PreviewCacheOperations`, `ConfigManagerOperations`, `PageRasterizer`)
 * for list persistence, collection management, thumbnail caching,
 * configuration and print merging, plus path and progress utilities.
 */
pub mod collections;
pub mod config;
pub mod models;
pub mod path_utils;
pub mod preview_cache;
pub mod print_merge;
pub mod progress;
pub mod rasterizer;
pub mod session_data;
pub mod working_list;

// Re-export key structures and enums
pub use models::{
    Collection, CollectionEntry, CollectionLoadMode, PdfReference, SortOrder, display_name_for,
    path_has_pdf_extension,
};

pub use session_data::SessionData;

pub use working_list::{CoreWorkingListStore, WorkingListStoreOperations};

#[cfg(test)]
pub use working_list::WorkingListError;

pub use collections::{
    COLLECTION_FILE_EXTENSION, CollectionError, CollectionManagerOperations, CoreCollectionManager,
};

pub use preview_cache::{CorePreviewCache, PreviewCacheOperations};

pub use rasterizer::{PageRasterizer, PdfiumRasterizer, RasterizeError};

pub use print_merge::{MergeError, MergeFailure, PrintJob, build_printable, page_count};

pub use config::{ConfigManagerOperations, CoreConfigManager, PrintSettings};

pub use progress::{BatchProgress, SilentProgress};
