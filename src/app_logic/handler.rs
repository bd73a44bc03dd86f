/*
 * Manages the application state and the operations behind every user
 * action, independent of any presentation layer. `SessionController` owns
 * the runtime `SessionData` (Working List + Selection) and depends on the
 * core operations traits for persistence, previews and configuration, so
 * every collaborator can be mocked in tests. Each operation returns an
 * explicit report; expected failures (missing files, broken documents) are
 * carried per-item inside the reports rather than raised.
 */
use crate::core::{
    BatchProgress, CollectionEntry, CollectionLoadMode, CollectionManagerOperations,
    ConfigManagerOperations, MergeError, MergeFailure, PdfReference, PreviewCacheOperations,
    PrintJob, PrintSettings, SessionData, SortOrder, WorkingListStoreOperations, build_printable,
    collections, display_name_for, path_has_pdf_extension,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Previews older than this are swept opportunistically at startup.
const PREVIEW_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Why a file offered to `add_files` was not added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRejection {
    NotFound,
    WrongExtension,
    PreviewFailed,
    Duplicate,
}

#[derive(Debug, Default)]
pub struct AddReport {
    pub added: Vec<PathBuf>,
    pub rejected: Vec<(String, AddRejection)>,
    pub cancelled: bool,
}

#[derive(Debug, Default)]
pub struct CollectionLoadReport {
    /// Entries added to the Working List.
    pub added: usize,
    /// Display names of referenced files that no longer exist on disk.
    pub missing: Vec<String>,
}

/// Outcome of a print request; the caller decides how each variant is
/// surfaced.
#[derive(Debug)]
pub enum PrintOutcome {
    NoFilesSelected,
    Cancelled,
    /// An artifact was produced; `failed` lists any skipped sources.
    Completed(PrintJob),
    /// Every source failed; nothing to print.
    AllSourcesFailed(Vec<MergeFailure>),
    Error(String),
}

pub struct SessionController {
    session: SessionData,
    working_list_store: Arc<dyn WorkingListStoreOperations>,
    collection_manager: Arc<dyn CollectionManagerOperations>,
    preview_cache: Box<dyn PreviewCacheOperations>,
    config_manager: Arc<dyn ConfigManagerOperations>,
    print_settings: PrintSettings,
}

impl SessionController {
    pub fn new(
        working_list_store: Arc<dyn WorkingListStoreOperations>,
        collection_manager: Arc<dyn CollectionManagerOperations>,
        preview_cache: Box<dyn PreviewCacheOperations>,
        config_manager: Arc<dyn ConfigManagerOperations>,
    ) -> Self {
        SessionController {
            session: SessionData::new(),
            working_list_store,
            collection_manager,
            preview_cache,
            config_manager,
            print_settings: PrintSettings::default(),
        }
    }

    pub fn session(&self) -> &SessionData {
        &self.session
    }

    pub fn print_settings(&self) -> PrintSettings {
        self.print_settings
    }

    pub fn preview_cache(&self) -> &dyn PreviewCacheOperations {
        self.preview_cache.as_ref()
    }

    fn persist_working_list(&self) {
        if let Err(e) = self.working_list_store.save(&self.session.working_paths()) {
            // Persistence is best-effort mid-session; the next successful
            // save rewrites the whole document anyway.
            log::warn!("SessionController: Failed to save working list: {e}");
        }
    }

    /*
     * Restores the previous session: loads the print settings and the saved
     * Working List. Each path is passed through the preview cache before
     * being accepted; paths that vanished from disk are silently skipped,
     * preserving the order of the remainder. Ends with the opportunistic
     * age sweep of the preview cache. Returns the number of entries
     * restored.
     */
    pub fn startup(&mut self) -> usize {
        self.print_settings = self.config_manager.load_print_settings();

        let mut restored = 0;
        for path in self.working_list_store.load() {
            if !path.exists() {
                log::debug!("SessionController: Skipping vanished entry {path:?}.");
                continue;
            }
            if !self.preview_cache.ensure_preview(&path) {
                log::warn!("SessionController: Dropping entry without preview {path:?}.");
                continue;
            }
            if self.session.add_file(PdfReference::new(path)) {
                restored += 1;
            }
        }

        self.preview_cache.clear_older_than(PREVIEW_MAX_AGE);
        log::info!("SessionController: Restored {restored} working-list entries.");
        restored
    }

    /*
     * Adds files to the Working List. Per item: the file must exist, carry
     * the `.pdf` extension, render a preview, and not already be tracked.
     * Rejections are reported by display name and reason while the batch
     * continues. Cancellation is honored between items; whatever was added
     * before the checkpoint stays. The list document is persisted once at
     * the end, even when cancelled.
     */
    pub fn add_files(&mut self, paths: &[PathBuf], progress: &mut dyn BatchProgress) -> AddReport {
        let mut report = AddReport::default();

        for (index, path) in paths.iter().enumerate() {
            if progress.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let name = display_name_for(path);

            if !path.exists() {
                report.rejected.push((name.clone(), AddRejection::NotFound));
            } else if !path_has_pdf_extension(path) {
                report.rejected.push((name.clone(), AddRejection::WrongExtension));
            } else if !self.preview_cache.ensure_preview(path) {
                report.rejected.push((name.clone(), AddRejection::PreviewFailed));
            } else if !self.session.add_file(PdfReference::new(path.clone())) {
                report.rejected.push((name.clone(), AddRejection::Duplicate));
            } else {
                report.added.push(path.clone());
            }
            progress.report(index + 1, paths.len(), &name);
        }

        self.persist_working_list();
        report
    }

    pub fn remove_files(&mut self, paths: &[PathBuf]) -> usize {
        let removed = self.session.remove_files(paths);
        if removed > 0 {
            self.persist_working_list();
        }
        removed
    }

    pub fn sort_files(&mut self, order: SortOrder) {
        self.session.sort_files(order);
        self.persist_working_list();
    }

    /*
     * Stages Working-List entries for printing. Paths not in the Working
     * List are ignored; the Selection only ever references tracked files.
     * Returns how many entries were newly staged.
     */
    pub fn add_to_selection(&mut self, paths: &[PathBuf]) -> usize {
        let mut staged = 0;
        for path in paths {
            let reference = self
                .session
                .working_list()
                .iter()
                .find(|r| r.path == *path)
                .cloned();
            match reference {
                Some(reference) => {
                    if self.session.add_to_selection(reference) {
                        staged += 1;
                    }
                }
                None => {
                    log::debug!("SessionController: Ignoring untracked selection path {path:?}.")
                }
            }
        }
        staged
    }

    pub fn remove_from_selection(&mut self, paths: &[PathBuf]) -> usize {
        self.session.remove_from_selection(paths)
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
    }

    /// Snapshots the current Working List as a collection at `target`.
    pub fn save_collection(&self, target: &Path) -> collections::Result<PathBuf> {
        let entries: Vec<CollectionEntry> = self
            .session
            .working_list()
            .iter()
            .map(CollectionEntry::from)
            .collect();
        self.collection_manager.save_collection(target, &entries)
    }

    /*
     * Loads a collection into the Working List. Format errors (malformed
     * JSON, missing version tag) abort before the list is touched. With
     * `Replace` the list is cleared first; with `Append` entries join the
     * existing list under the usual duplicate check. Files that exist get
     * their previews generated eagerly; files that do not are reported by
     * display name. This is the only load path that reports missing files.
     */
    pub fn load_collection(
        &mut self,
        path: &Path,
        mode: CollectionLoadMode,
    ) -> collections::Result<CollectionLoadReport> {
        let collection = self.collection_manager.load_collection(path)?;

        if mode == CollectionLoadMode::Replace {
            self.session.clear_working_list();
        }

        let mut report = CollectionLoadReport::default();
        for entry in collection.files {
            if entry.path.exists() {
                self.preview_cache.ensure_preview(&entry.path);
                let added = self.session.add_file(PdfReference {
                    path: entry.path,
                    name: entry.name,
                });
                if added {
                    report.added += 1;
                }
            } else {
                report.missing.push(entry.name);
            }
        }

        self.persist_working_list();
        Ok(report)
    }

    pub fn delete_collection(&self, path: &Path) -> collections::Result<()> {
        self.collection_manager.delete_collection(path)
    }

    pub fn list_collections(&self) -> collections::Result<Vec<String>> {
        self.collection_manager.list_collections()
    }

    pub fn collection_path_for_name(&self, name: &str) -> PathBuf {
        self.collection_manager.collection_path_for_name(name)
    }

    /*
     * Builds the printable artifact from the current Selection, in
     * selection order, honoring the configured duplex padding. The caller
     * decides how to surface partial failures and where to send the
     * artifact.
     */
    pub fn print_selection(&self, progress: &mut dyn BatchProgress) -> PrintOutcome {
        let selection = self.session.selection_paths();
        if selection.is_empty() {
            return PrintOutcome::NoFilesSelected;
        }

        match build_printable(&selection, self.print_settings.pad_for_duplex, progress) {
            Ok(job) => PrintOutcome::Completed(job),
            Err(MergeError::Cancelled) => PrintOutcome::Cancelled,
            Err(MergeError::NothingToPrint(failed)) => PrintOutcome::AllSourcesFailed(failed),
            Err(e) => PrintOutcome::Error(e.to_string()),
        }
    }

    pub fn set_pad_for_duplex(&mut self, enabled: bool) {
        self.print_settings.pad_for_duplex = enabled;
        if let Err(e) = self.config_manager.save_print_settings(&self.print_settings) {
            log::warn!("SessionController: Failed to save print settings: {e}");
        }
    }

    /*
     * End-of-session housekeeping: previews no longer referenced by the
     * Working List are removed, and the list document gets a final save.
     */
    pub fn shutdown(&mut self) {
        self.preview_cache
            .clear_unreferenced(&self.session.working_paths());
        self.persist_working_list();
    }
}
