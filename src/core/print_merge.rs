/*
 * This module builds the printable artifact: one combined PDF containing the
 * pages of every selected document, in selection order. Sources that cannot
 * be read are skipped with a per-item failure record, and a partial batch still
 * prints. With duplex padding enabled, a source with an odd page count gets
 * one blank trailing page sized to its own first page, so the next document
 * starts on a fresh physical sheet when printing double-sided.
 *
 * The merge rebuilds a fresh page tree: each source is renumbered into the
 * combined object space, its pages are reparented under the new root, and
 * inheritable page attributes (Resources, MediaBox, CropBox, Rotate) are
 * flattened onto the page dictionaries first, since the old parent chain
 * that supplied them is discarded. Stale catalogs and page-tree nodes are
 * pruned before saving.
 */
use crate::core::models::display_name_for;
use crate::core::progress::BatchProgress;
use lopdf::{Document, Object, ObjectId, dictionary};
use std::io;
use std::path::{Path, PathBuf};

pub const ARTIFACT_FILENAME: &str = "print_station_combined.pdf";

/// Inheritable page-tree attributes per the PDF page-tree model.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter in PDF points, used when no MediaBox can be resolved at all.
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeFailure {
    pub name: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct PrintJob {
    pub artifact_path: PathBuf,
    pub failed: Vec<MergeFailure>,
}

#[derive(Debug)]
pub enum MergeError {
    Io(io::Error),
    Pdf(lopdf::Error),
    /// Every source failed; there is no artifact to print.
    NothingToPrint(Vec<MergeFailure>),
    /// The user cancelled between source documents.
    Cancelled,
}

impl From<io::Error> for MergeError {
    fn from(err: io::Error) -> Self {
        MergeError::Io(err)
    }
}

impl From<lopdf::Error> for MergeError {
    fn from(err: lopdf::Error) -> Self {
        MergeError::Pdf(err)
    }
}

impl std::fmt::Display for MergeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::Io(e) => write!(f, "Print merge I/O error: {e}"),
            MergeError::Pdf(e) => write!(f, "Print merge PDF error: {e}"),
            MergeError::NothingToPrint(failed) => {
                write!(f, "No pages could be merged ({} failed sources)", failed.len())
            }
            MergeError::Cancelled => write!(f, "Print preparation cancelled"),
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::Io(e) => Some(e),
            MergeError::Pdf(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, MergeError>;

/// Number of pages in the document at `path`.
pub fn page_count(path: &Path) -> Result<usize> {
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}

/*
 * Resolves a page attribute, walking up the Parent chain when the page
 * dictionary itself lacks it. The chain is bounded to keep a cyclic Parent
 * reference in a malformed file from looping forever.
 */
fn inherited_page_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => current = *parent_id,
            _ => return None,
        }
    }
    None
}

fn fallback_media_box() -> Object {
    Object::Array(FALLBACK_MEDIA_BOX.iter().map(|v| Object::Integer(*v)).collect())
}

/*
 * Copies missing inheritable attributes from the page's ancestors onto the
 * page dictionary itself. After this, the page renders identically under a
 * different parent node.
 */
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) {
    for key in INHERITABLE_PAGE_KEYS {
        let already_present = doc
            .get_object(page_id)
            .ok()
            .and_then(|obj| obj.as_dict().ok())
            .map(|dict| dict.has(key))
            .unwrap_or(true);
        if already_present {
            continue;
        }
        if let Some(value) = inherited_page_attribute(doc, page_id, key)
            && let Ok(obj) = doc.get_object_mut(page_id)
            && let Ok(dict) = obj.as_dict_mut()
        {
            dict.set(key, value);
        }
    }
}

/// A dictionary object that must not survive into the merged document: the
/// old catalogs, page-tree nodes and outlines of the sources.
fn is_discarded_container(object: &Object) -> bool {
    let type_name = object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|t| t.as_name().ok());
    matches!(type_name, Some(b"Catalog") | Some(b"Pages") | Some(b"Outlines"))
}

/*
 * Builds the combined document from `selection`, in order. Returns the
 * artifact path plus per-source failures; fails outright only when no source
 * contributed any pages, on a write error, or on cancellation. The artifact
 * is written beside the first selected file (temp dir fallback).
 */
pub fn build_printable(
    selection: &[PathBuf],
    pad_for_duplex: bool,
    progress: &mut dyn BatchProgress,
) -> Result<PrintJob> {
    let mut merged = Document::with_version("1.5");
    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::new();
    let mut failed: Vec<MergeFailure> = Vec::new();

    for (index, source) in selection.iter().enumerate() {
        if progress.is_cancelled() {
            log::info!("PrintMerge: Cancelled before source {}.", index + 1);
            return Err(MergeError::Cancelled);
        }
        let name = display_name_for(source);

        if !source.exists() {
            failed.push(MergeFailure {
                name: name.clone(),
                reason: "file not found".to_string(),
            });
            progress.report(index + 1, selection.len(), &name);
            continue;
        }

        let mut doc = match Document::load(source) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("PrintMerge: Cannot open {source:?}: {e}");
                failed.push(MergeFailure {
                    name: name.clone(),
                    reason: e.to_string(),
                });
                progress.report(index + 1, selection.len(), &name);
                continue;
            }
        };

        doc.renumber_objects_with(merged.max_id + 1);
        let page_map = doc.get_pages();
        let page_ids: Vec<ObjectId> = page_map.values().copied().collect();
        if page_ids.is_empty() {
            failed.push(MergeFailure {
                name: name.clone(),
                reason: "document has no pages".to_string(),
            });
            progress.report(index + 1, selection.len(), &name);
            continue;
        }

        for page_id in &page_ids {
            flatten_inherited_attributes(&mut doc, *page_id);
        }
        // The blank page matches this document's first page dimensions.
        let media_box = inherited_page_attribute(&doc, page_ids[0], b"MediaBox")
            .unwrap_or_else(fallback_media_box);

        merged.max_id = doc.max_id;
        merged.objects.extend(
            doc.objects
                .into_iter()
                .filter(|(_, object)| !is_discarded_container(object)),
        );

        for page_id in &page_ids {
            if let Ok(obj) = merged.get_object_mut(*page_id)
                && let Ok(dict) = obj.as_dict_mut()
            {
                dict.set("Parent", Object::Reference(pages_id));
            }
            kids.push(Object::Reference(*page_id));
        }

        if pad_for_duplex && page_ids.len() % 2 != 0 {
            let blank_id = merged.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => media_box,
            });
            kids.push(Object::Reference(blank_id));
            log::debug!("PrintMerge: Padded odd-count source {source:?} with a blank page.");
        }

        progress.report(index + 1, selection.len(), &name);
    }

    if kids.is_empty() {
        return Err(MergeError::NothingToPrint(failed));
    }

    let kids_count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => kids_count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    merged.renumber_objects();
    merged.adjust_zero_pages();
    merged.compress();

    let artifact_path = artifact_path_for(selection);
    merged.save(&artifact_path)?;
    log::info!(
        "PrintMerge: Wrote {} pages to {artifact_path:?} ({} failed sources).",
        kids_count,
        failed.len()
    );

    Ok(PrintJob {
        artifact_path,
        failed,
    })
}

/// The artifact lives beside the first selected file so it shares that
/// file's filesystem (and permissions); temp dir when that has no parent.
fn artifact_path_for(selection: &[PathBuf]) -> PathBuf {
    selection
        .first()
        .and_then(|p| p.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(|parent| parent.join(ARTIFACT_FILENAME))
        .unwrap_or_else(|| std::env::temp_dir().join(ARTIFACT_FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::{CancelAfter, SilentProgress};
    use lopdf::Stream;
    use tempfile::TempDir;

    /*
     * Builds a minimal valid PDF with the given number of empty pages. When
     * `media_box_on_pages_node` is set, the MediaBox lives only on the page
     * tree root, exercising attribute inheritance.
     */
    fn build_test_pdf(path: &Path, pages: usize, media_box: [i64; 4], media_box_on_pages_node: bool) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let media_box_object =
            Object::Array(media_box.iter().map(|v| Object::Integer(*v)).collect());

        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..pages {
            let content_id = doc.add_object(Object::Stream(Stream::new(
                dictionary! {},
                Vec::new(),
            )));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
            };
            if !media_box_on_pages_node {
                page.set("MediaBox", media_box_object.clone());
            }
            let page_id = doc.add_object(page);
            kids.push(Object::Reference(page_id));
        }

        let mut pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        };
        if media_box_on_pages_node {
            pages_dict.set("MediaBox", media_box_object);
        }
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    fn letter_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
        let path = dir.path().join(name);
        build_test_pdf(&path, pages, [0, 0, 612, 792], false);
        path
    }

    #[test]
    fn test_page_count_reads_fixture() {
        let dir = TempDir::new().unwrap();
        let path = letter_pdf(&dir, "five.pdf", 5);

        assert_eq!(page_count(&path).unwrap(), 5);
    }

    #[test]
    fn test_duplex_padding_adds_one_blank_per_odd_source() {
        let dir = TempDir::new().unwrap();
        let selection = vec![
            letter_pdf(&dir, "three.pdf", 3),
            letter_pdf(&dir, "four.pdf", 4),
            letter_pdf(&dir, "five.pdf", 5),
        ];

        let job = build_printable(&selection, true, &mut SilentProgress).unwrap();

        assert!(job.failed.is_empty());
        // 3+1 padding, 4 untouched, 5+1 padding.
        assert_eq!(page_count(&job.artifact_path).unwrap(), 14);
    }

    #[test]
    fn test_without_duplex_padding_pages_are_just_concatenated() {
        let dir = TempDir::new().unwrap();
        let selection = vec![
            letter_pdf(&dir, "three.pdf", 3),
            letter_pdf(&dir, "four.pdf", 4),
        ];

        let job = build_printable(&selection, false, &mut SilentProgress).unwrap();

        assert_eq!(page_count(&job.artifact_path).unwrap(), 7);
    }

    #[test]
    fn test_missing_source_is_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let selection = vec![
            letter_pdf(&dir, "a.pdf", 2),
            dir.path().join("gone.pdf"),
            letter_pdf(&dir, "b.pdf", 2),
        ];

        let job = build_printable(&selection, true, &mut SilentProgress).unwrap();

        assert_eq!(job.failed.len(), 1);
        assert_eq!(job.failed[0].name, "gone.pdf");
        assert_eq!(job.failed[0].reason, "file not found");
        assert_eq!(page_count(&job.artifact_path).unwrap(), 4);
    }

    #[test]
    fn test_unparseable_source_is_reported_and_skipped() {
        let dir = TempDir::new().unwrap();
        let junk = dir.path().join("junk.pdf");
        std::fs::write(&junk, b"this is not a pdf").unwrap();
        let selection = vec![junk, letter_pdf(&dir, "good.pdf", 2)];

        let job = build_printable(&selection, true, &mut SilentProgress).unwrap();

        assert_eq!(job.failed.len(), 1);
        assert_eq!(job.failed[0].name, "junk.pdf");
        assert_eq!(page_count(&job.artifact_path).unwrap(), 2);
    }

    #[test]
    fn test_all_sources_failing_produces_no_artifact() {
        let dir = TempDir::new().unwrap();
        let selection = vec![dir.path().join("x.pdf"), dir.path().join("y.pdf")];

        let result = build_printable(&selection, true, &mut SilentProgress);

        match result {
            Err(MergeError::NothingToPrint(failed)) => assert_eq!(failed.len(), 2),
            other => panic!("Expected NothingToPrint, got {other:?}"),
        }
        assert!(!dir.path().join(ARTIFACT_FILENAME).exists());
    }

    #[test]
    fn test_artifact_is_written_beside_first_selected_file() {
        let dir = TempDir::new().unwrap();
        let selection = vec![letter_pdf(&dir, "a.pdf", 1)];

        let job = build_printable(&selection, false, &mut SilentProgress).unwrap();

        assert_eq!(job.artifact_path, dir.path().join(ARTIFACT_FILENAME));
    }

    #[test]
    fn test_blank_page_inherits_media_box_from_pages_node() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("inherited.pdf");
        build_test_pdf(&path, 3, [0, 0, 300, 400], true);

        let job = build_printable(&[path], true, &mut SilentProgress).unwrap();

        let merged = Document::load(&job.artifact_path).unwrap();
        let pages = merged.get_pages();
        assert_eq!(pages.len(), 4);
        // The appended blank page is the last one.
        let blank_id = *pages.get(&4).unwrap();
        let blank = merged.get_object(blank_id).unwrap().as_dict().unwrap();
        let media_box = blank.get(b"MediaBox").unwrap().as_array().unwrap();
        let dims: Vec<i64> = media_box.iter().filter_map(|o| o.as_i64().ok()).collect();
        assert_eq!(dims, vec![0, 0, 300, 400]);
    }

    #[test]
    fn test_cancellation_stops_at_source_boundary() {
        let dir = TempDir::new().unwrap();
        let selection = vec![
            letter_pdf(&dir, "a.pdf", 1),
            letter_pdf(&dir, "b.pdf", 1),
            letter_pdf(&dir, "c.pdf", 1),
        ];
        let mut progress = CancelAfter { after: 1, seen: 0 };

        let result = build_printable(&selection, false, &mut progress);

        assert!(matches!(result, Err(MergeError::Cancelled)));
        assert_eq!(progress.seen, 1, "one source processed before the checkpoint");
    }
}
