/*
 * This module manages the preview cache: one rendered first-page thumbnail
 * per tracked PDF, stored flat in a dedicated directory under a filename
 * derived from the source file's basename. Entries are created lazily on
 * first request and reused without any staleness check: a source that
 * changes in place keeps its old thumbnail until an explicit sweep removes
 * it. Two sources sharing a basename in different directories share one
 * entry; the key is the basename, not the full path.
 *
 * Generation failures never propagate: `ensure_preview` reports plain
 * success/failure and logs the cause, so batch loops (adds, collection
 * loads) continue past broken documents. The eviction operations are
 * likewise best-effort; per-file deletion errors are logged and the sweep
 * moves on.
 */
use crate::core::rasterizer::PageRasterizer;
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Render scale for thumbnails: one PDF point maps to 0.2 pixels, trading
/// fidelity for small files and fast generation.
const PREVIEW_SCALE: f32 = 0.2;
const JPEG_QUALITY: u8 = 85;
const PREVIEW_PREFIX: &str = "preview_";
const PREVIEW_EXTENSION: &str = "jpg";

pub trait PreviewCacheOperations {
    /// Guarantees a thumbnail exists for `source`, generating it on first
    /// access. Returns `false` when generation failed; never errors.
    fn ensure_preview(&self, source: &Path) -> bool;

    /// The deterministic cache location for `source`, whether or not an
    /// entry exists yet.
    fn preview_path_for(&self, source: &Path) -> PathBuf;

    /// Deletes every entry unconditionally. Returns the number removed.
    fn clear_all(&self) -> usize;

    /// Deletes entries whose modification time is older than `max_age`.
    /// Entries exactly at the threshold are retained.
    fn clear_older_than(&self, max_age: Duration) -> usize;

    /// Deletes entries whose derived key matches no basename in
    /// `current_paths`. Run at shutdown against the Working List.
    fn clear_unreferenced(&self, current_paths: &[PathBuf]) -> usize;

    /// Total size of all cache entries in bytes.
    fn cache_size(&self) -> u64;
}

pub struct CorePreviewCache {
    cache_dir: PathBuf,
    rasterizer: Box<dyn PageRasterizer>,
}

impl CorePreviewCache {
    pub fn new(cache_dir: PathBuf, rasterizer: Box<dyn PageRasterizer>) -> Self {
        CorePreviewCache {
            cache_dir,
            rasterizer,
        }
    }

    fn entry_file_name(source: &Path) -> String {
        let basename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{PREVIEW_PREFIX}{basename}.{PREVIEW_EXTENSION}")
    }

    fn generate(&self, source: &Path, target: &Path) -> bool {
        let page = match self.rasterizer.render_first_page(source, PREVIEW_SCALE) {
            Ok(page) => page,
            Err(e) => {
                log::warn!("CorePreviewCache: Cannot render {source:?}: {e}");
                return false;
            }
        };

        let file = match File::create(target) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("CorePreviewCache: Cannot create {target:?}: {e}");
                return false;
            }
        };
        let writer = BufWriter::new(file);
        let mut encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
        if let Err(e) = encoder.encode(
            &page.pixels,
            page.width,
            page.height,
            image::ColorType::Rgb8,
        ) {
            log::warn!("CorePreviewCache: Cannot encode preview for {source:?}: {e}");
            return false;
        }

        log::debug!("CorePreviewCache: Generated preview {target:?} for {source:?}.");
        true
    }

    /*
     * Runs `keep` over every file in the cache directory and deletes those
     * for which it returns false. Shared sweep loop for the three clear
     * operations; deletion errors are logged and do not abort the sweep.
     */
    fn sweep<F>(&self, keep: F) -> usize
    where
        F: Fn(&fs::DirEntry) -> bool,
    {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "CorePreviewCache: Cannot read cache directory {:?}: {e}",
                    self.cache_dir
                );
                return 0;
            }
        };

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || keep(&entry) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("CorePreviewCache: Cannot remove {path:?}: {e}"),
            }
        }
        removed
    }
}

impl PreviewCacheOperations for CorePreviewCache {
    fn ensure_preview(&self, source: &Path) -> bool {
        let target = self.preview_path_for(source);
        if target.exists() {
            log::trace!("CorePreviewCache: Reusing existing preview {target:?}.");
            return true;
        }
        self.generate(source, &target)
    }

    fn preview_path_for(&self, source: &Path) -> PathBuf {
        self.cache_dir.join(Self::entry_file_name(source))
    }

    fn clear_all(&self) -> usize {
        let removed = self.sweep(|_| false);
        log::debug!("CorePreviewCache: Cleared {removed} cache entries.");
        removed
    }

    fn clear_older_than(&self, max_age: Duration) -> usize {
        let removed = self.sweep(|entry| {
            let age = entry
                .metadata()
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| mtime.elapsed().ok());
            match age {
                Some(age) => age <= max_age,
                // Unreadable metadata: keep the entry rather than guess.
                None => true,
            }
        });
        if removed > 0 {
            log::debug!("CorePreviewCache: Removed {removed} entries older than {max_age:?}.");
        }
        removed
    }

    fn clear_unreferenced(&self, current_paths: &[PathBuf]) -> usize {
        let referenced: Vec<String> = current_paths.iter().map(|p| Self::entry_file_name(p)).collect();
        let removed = self.sweep(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            referenced.iter().any(|r| *r == name)
        });
        if removed > 0 {
            log::debug!("CorePreviewCache: Removed {removed} unreferenced entries.");
        }
        removed
    }

    fn cache_size(&self) -> u64 {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "CorePreviewCache: Cannot read cache directory {:?}: {e}",
                    self.cache_dir
                );
                return 0;
            }
        };
        entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rasterizer::{RasterPage, RasterizeError};
    use std::cell::Cell;
    use std::fs::File;
    use std::rc::Rc;
    use std::time::SystemTime;
    use tempfile::TempDir;

    struct MockRasterizer {
        calls: Rc<Cell<usize>>,
        fail_with_empty: bool,
    }

    impl MockRasterizer {
        fn succeeding() -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            (
                MockRasterizer {
                    calls: Rc::clone(&calls),
                    fail_with_empty: false,
                },
                calls,
            )
        }

        fn empty_document() -> Self {
            MockRasterizer {
                calls: Rc::new(Cell::new(0)),
                fail_with_empty: true,
            }
        }
    }

    impl PageRasterizer for MockRasterizer {
        fn render_first_page(
            &self,
            _path: &Path,
            _scale: f32,
        ) -> crate::core::rasterizer::Result<RasterPage> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_with_empty {
                return Err(RasterizeError::EmptyDocument);
            }
            Ok(RasterPage {
                width: 2,
                height: 2,
                pixels: vec![200; 2 * 2 * 3],
            })
        }
    }

    fn cache_with(dir: &TempDir, rasterizer: MockRasterizer) -> CorePreviewCache {
        CorePreviewCache::new(dir.path().to_path_buf(), Box::new(rasterizer))
    }

    fn succeeding_cache(dir: &TempDir) -> CorePreviewCache {
        let (rasterizer, _) = MockRasterizer::succeeding();
        cache_with(dir, rasterizer)
    }

    fn backdate(path: &Path, age: Duration) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_ensure_preview_generates_then_reuses() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);
        let source = PathBuf::from("/docs/report.pdf");

        assert!(cache.ensure_preview(&source));
        let entry = cache.preview_path_for(&source);
        assert!(entry.exists());
        let first_mtime = fs::metadata(&entry).unwrap().modified().unwrap();

        // Second call must not re-render: same entry, untouched mtime.
        assert!(cache.ensure_preview(&source));
        let second_mtime = fs::metadata(&entry).unwrap().modified().unwrap();
        assert_eq!(first_mtime, second_mtime);
    }

    #[test]
    fn test_ensure_preview_renders_exactly_once() {
        let dir = TempDir::new().unwrap();
        let (rasterizer, calls) = MockRasterizer::succeeding();
        let cache = cache_with(&dir, rasterizer);
        let source = PathBuf::from("/docs/report.pdf");

        assert!(cache.ensure_preview(&source));
        assert!(cache.ensure_preview(&source));

        assert_eq!(calls.get(), 1, "second call must be served from the cache");
    }

    #[test]
    fn test_zero_page_document_creates_no_entry() {
        let dir = TempDir::new().unwrap();
        let cache = cache_with(&dir, MockRasterizer::empty_document());
        let source = PathBuf::from("/docs/empty.pdf");

        assert!(!cache.ensure_preview(&source));
        assert!(!cache.preview_path_for(&source).exists());
    }

    #[test]
    fn test_preview_key_is_basename_derived() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);

        let one = cache.preview_path_for(Path::new("/one/report.pdf"));
        let two = cache.preview_path_for(Path::new("/two/report.pdf"));

        // Same basename collapses to the same entry, by design.
        assert_eq!(one, two);
        assert_eq!(
            one.file_name().unwrap_or_default(),
            "preview_report.pdf.jpg"
        );
    }

    #[test]
    fn test_clear_all_removes_everything() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);
        cache.ensure_preview(Path::new("/docs/a.pdf"));
        cache.ensure_preview(Path::new("/docs/b.pdf"));

        let removed = cache.clear_all();

        assert_eq!(removed, 2);
        assert_eq!(cache.cache_size(), 0);
    }

    #[test]
    fn test_clear_older_than_removes_only_expired_entries() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);
        let day = Duration::from_secs(24 * 60 * 60);

        // The seven-day fixture sits one second inside the threshold so the
        // wall-clock time spent between backdating and sweeping cannot push
        // it over the edge.
        let ages = [
            ("young.pdf", day),
            ("edge.pdf", 7 * day - Duration::from_secs(1)),
            ("old.pdf", 10 * day),
        ];
        for (name, age) in ages {
            let source = PathBuf::from("/docs").join(name);
            assert!(cache.ensure_preview(&source));
            backdate(&cache.preview_path_for(&source), age);
        }

        let removed = cache.clear_older_than(7 * day);

        assert_eq!(removed, 1, "only the 10-day entry exceeds the threshold");
        assert!(cache.preview_path_for(Path::new("/docs/young.pdf")).exists());
        assert!(cache.preview_path_for(Path::new("/docs/edge.pdf")).exists());
        assert!(!cache.preview_path_for(Path::new("/docs/old.pdf")).exists());
    }

    #[test]
    fn test_clear_unreferenced_keeps_working_list_entries() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);
        cache.ensure_preview(Path::new("/docs/keep.pdf"));
        cache.ensure_preview(Path::new("/docs/drop.pdf"));

        let removed = cache.clear_unreferenced(&[PathBuf::from("/elsewhere/keep.pdf")]);

        assert_eq!(removed, 1);
        assert!(cache.preview_path_for(Path::new("/docs/keep.pdf")).exists());
        assert!(!cache.preview_path_for(Path::new("/docs/drop.pdf")).exists());
    }

    #[test]
    fn test_cache_size_sums_entry_bytes() {
        let dir = TempDir::new().unwrap();
        let cache = succeeding_cache(&dir);
        assert_eq!(cache.cache_size(), 0);

        cache.ensure_preview(Path::new("/docs/a.pdf"));

        assert!(cache.cache_size() > 0);
    }
}
