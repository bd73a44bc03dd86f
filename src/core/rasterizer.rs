/*
 * First-page rasterization behind a small trait so the preview cache can be
 * exercised without a PDF engine present. The concrete implementation wraps
 * pdfium; the pdfium library is bound once at construction and documents are
 * opened per call. Rasterization happens on the caller's thread; the
 * application is single-threaded and nothing here is shared across threads.
 */
use pdfium_render::prelude::*;
use std::path::Path;

#[derive(Debug)]
pub enum RasterizeError {
    /// The pdfium library could not be located or bound.
    Bindings(PdfiumError),
    /// The document could not be opened or parsed.
    Open(PdfiumError),
    /// The document has no pages; nothing to render.
    EmptyDocument,
    Render(PdfiumError),
}

impl std::fmt::Display for RasterizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RasterizeError::Bindings(e) => write!(f, "PDF engine unavailable: {e:?}"),
            RasterizeError::Open(e) => write!(f, "Cannot open document: {e:?}"),
            RasterizeError::EmptyDocument => write!(f, "Document has no pages"),
            RasterizeError::Render(e) => write!(f, "Render failed: {e:?}"),
        }
    }
}

impl std::error::Error for RasterizeError {}

pub type Result<T> = std::result::Result<T, RasterizeError>;

/// One rendered page: tightly packed RGB8 rows, ready for image encoding.
pub struct RasterPage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub trait PageRasterizer {
    /*
     * Renders the first page of the document at `path`, scaled so that one
     * PDF point maps to `scale` pixels. Zero-page documents yield
     * `RasterizeError::EmptyDocument` rather than an empty image.
     */
    fn render_first_page(&self, path: &Path, scale: f32) -> Result<RasterPage>;
}

pub struct PdfiumRasterizer {
    pdfium: Pdfium,
}

impl PdfiumRasterizer {
    /// Binds the system pdfium library. Fails cleanly when the library is
    /// not installed; previews are then reported per-file as failed.
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_system_library().map_err(RasterizeError::Bindings)?;
        Ok(PdfiumRasterizer {
            pdfium: Pdfium::new(bindings),
        })
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render_first_page(&self, path: &Path, scale: f32) -> Result<RasterPage> {
        let path_text = path.to_string_lossy();
        let document = self
            .pdfium
            .load_pdf_from_file(&*path_text, None)
            .map_err(RasterizeError::Open)?;

        if document.pages().len() == 0 {
            return Err(RasterizeError::EmptyDocument);
        }
        let page = document.pages().get(0).map_err(RasterizeError::Open)?;

        // Target dimensions in physical pixels, clamped so degenerate page
        // sizes still produce a 1x1 bitmap instead of a render error.
        let width = ((page.width().value * scale) as i32).max(1);
        let height = ((page.height().value * scale) as i32).max(1);

        let render_config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .set_format(PdfBitmapFormat::BGRA);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(RasterizeError::Render)?;
        let bgra = bitmap.as_bytes();

        // BGRA to tightly packed RGB; the alpha channel is dropped so the
        // cached preview is opaque.
        let pixel_count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(pixel_count * 3);
        for chunk in bgra.chunks_exact(4).take(pixel_count) {
            pixels.push(chunk[2]);
            pixels.push(chunk[1]);
            pixels.push(chunk[0]);
        }

        Ok(RasterPage {
            width: width as u32,
            height: height as u32,
            pixels,
        })
    }
}
