/*
 * This module defines SessionData, the mutable state of an active session:
 * the ordered Working List (every tracked file) and the ordered Selection
 * (the subset staged for printing). Both are process-local and single-owner;
 * the app logic layer holds the single instance and mutates it in response
 * to user actions. The Selection is never persisted and starts empty every
 * launch, while the Working List is written out by the store after each
 * mutation.
 */
use crate::core::models::{PdfReference, SortOrder};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct SessionData {
    working_list: Vec<PdfReference>,
    selection: Vec<PdfReference>,
}

impl SessionData {
    pub fn new() -> Self {
        SessionData {
            working_list: Vec::new(),
            selection: Vec::new(),
        }
    }

    pub fn working_list(&self) -> &[PdfReference] {
        &self.working_list
    }

    pub fn selection(&self) -> &[PdfReference] {
        &self.selection
    }

    pub fn working_paths(&self) -> Vec<PathBuf> {
        self.working_list.iter().map(|r| r.path.clone()).collect()
    }

    pub fn selection_paths(&self) -> Vec<PathBuf> {
        self.selection.iter().map(|r| r.path.clone()).collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.working_list.iter().any(|r| r.path == path)
    }

    /*
     * Appends a file to the Working List unless its path is already present.
     * The membership test precedes the insertion, so the list never holds
     * duplicate paths. Returns whether the file was added.
     */
    pub fn add_file(&mut self, reference: PdfReference) -> bool {
        if self.contains(&reference.path) {
            log::debug!(
                "SessionData: Skipping duplicate working-list entry {:?}",
                reference.path
            );
            return false;
        }
        self.working_list.push(reference);
        true
    }

    /*
     * Removes the given paths from the Working List. Entries staged in the
     * Selection are left alone: removing a file from the catalog does not
     * silently change the print batch, matching the two-list independence of
     * the containers.
     */
    pub fn remove_files(&mut self, paths: &[PathBuf]) -> usize {
        let before = self.working_list.len();
        self.working_list.retain(|r| !paths.contains(&r.path));
        before - self.working_list.len()
    }

    /// Sorts the Working List by display name, case-insensitively.
    pub fn sort_files(&mut self, order: SortOrder) {
        self.working_list
            .sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        if order == SortOrder::Descending {
            self.working_list.reverse();
        }
    }

    /// Case-insensitive substring filter over display names, for the search
    /// box. Returns references in list order.
    pub fn filter_working(&self, query: &str) -> Vec<&PdfReference> {
        let query = query.to_lowercase();
        self.working_list
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&query))
            .collect()
    }

    /*
     * Stages a file for printing unless it is already staged. A reference
     * may sit in both the Working List and the Selection, but never twice
     * within the Selection. Returns whether the file was staged.
     */
    pub fn add_to_selection(&mut self, reference: PdfReference) -> bool {
        if self.selection.iter().any(|r| r.path == reference.path) {
            return false;
        }
        self.selection.push(reference);
        true
    }

    pub fn remove_from_selection(&mut self, paths: &[PathBuf]) -> usize {
        let before = self.selection.len();
        self.selection.retain(|r| !paths.contains(&r.path));
        before - self.selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn clear_working_list(&mut self) {
        self.working_list.clear();
    }
}
