// Upload classification and page previews. Images decode into a single page.
// PDFs are validated with lopdf, then rasterized page by page through pdfium
// when its shared library can be found. Without pdfium, or for a page pdfium
// can't render, the page previews from its first embedded raster image, which
// covers scanned statements. Pages with neither keep an empty slot so indexes
// stay aligned with LandingAI's.

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, RgbaImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use pdfium_render::prelude::*;
use tracing::{debug, trace, warn};

use crate::error::{FindocError, Result};

/// Extensions accepted by the upload widget and the CLI.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Kind of uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Png,
    Jpeg,
    Pdf,
}

impl DocumentKind {
    /// Classify by file extension, case-insensitively.
    pub fn from_filename(name: &str) -> Result<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "png" => Ok(DocumentKind::Png),
            "jpg" | "jpeg" => Ok(DocumentKind::Jpeg),
            "pdf" => Ok(DocumentKind::Pdf),
            "" => Err(FindocError::UnsupportedFormat(name.to_string())),
            other => Err(FindocError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        Self::from_filename(&path.to_string_lossy())
    }

    pub fn mime(&self) -> &'static str {
        match self {
            DocumentKind::Png => "image/png",
            DocumentKind::Jpeg => "image/jpeg",
            DocumentKind::Pdf => "application/pdf",
        }
    }
}

/// Decode the document into one slot per page; `None` marks a page with no
/// previewable image.
pub fn load_pages(bytes: &[u8], kind: DocumentKind) -> Result<Vec<Option<DynamicImage>>> {
    match kind {
        DocumentKind::Png => {
            let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
            Ok(vec![Some(DynamicImage::ImageRgb8(image.to_rgb8()))])
        }
        DocumentKind::Jpeg => {
            let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
            Ok(vec![Some(DynamicImage::ImageRgb8(image.to_rgb8()))])
        }
        DocumentKind::Pdf => pdf_page_images(bytes),
    }
}

fn open_pdf(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|e| FindocError::Pdf(e.to_string()))?;
    check_pdf(doc)
}

/// Refuse documents we can't preview page by page.
fn check_pdf(doc: Document) -> Result<Document> {
    if doc.is_encrypted() {
        return Err(FindocError::Pdf("document is encrypted".to_string()));
    }
    if doc.get_pages().is_empty() {
        return Err(FindocError::Pdf("no pages found in PDF".to_string()));
    }
    Ok(doc)
}

/// Rendered page width; tall pages are capped at `RENDER_MAX_HEIGHT`.
const RENDER_WIDTH: Pixels = 1224;
const RENDER_MAX_HEIGHT: Pixels = 1584;

fn pdf_page_images(bytes: &[u8]) -> Result<Vec<Option<DynamicImage>>> {
    let doc = open_pdf(bytes)?;
    let page_count = doc.get_pages().len();
    debug!("Loaded PDF with {} pages", page_count);

    let rendered = match rasterize(bytes) {
        Ok(pages) if pages.len() == page_count => pages,
        Ok(pages) => {
            warn!(
                "pdfium saw {} pages, lopdf saw {}; using embedded images",
                pages.len(),
                page_count
            );
            vec![None; page_count]
        }
        Err(e) => {
            debug!("PDF rasterizer unavailable, using embedded images: {:?}", e);
            vec![None; page_count]
        }
    };

    let embedded = if rendered.iter().any(Option::is_none) {
        embedded_page_images(&doc)
    } else {
        vec![None; page_count]
    };
    Ok(rendered
        .into_iter()
        .zip(embedded)
        .enumerate()
        .map(|(i, (rendered, embedded))| {
            let page = rendered.or(embedded);
            if page.is_none() {
                warn!("No previewable image on PDF page {}", i + 1);
            }
            page
        })
        .collect())
}

/// Render every page with pdfium. Fails when the library can't be bound or
/// the document can't be opened; a page that fails to render yields `None`.
fn rasterize(bytes: &[u8]) -> std::result::Result<Vec<Option<DynamicImage>>, PdfiumError> {
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())?;
    let pdfium = Pdfium::new(bindings);
    let document = pdfium.load_pdf_from_byte_slice(bytes, None)?;
    let config = PdfRenderConfig::new()
        .set_target_width(RENDER_WIDTH)
        .set_maximum_height(RENDER_MAX_HEIGHT);

    let pages: Vec<Option<DynamicImage>> = document
        .pages()
        .iter()
        .enumerate()
        .map(|(i, page)| match page.render_with_config(&config) {
            Ok(bitmap) => bitmap_to_image(&bitmap),
            Err(e) => {
                warn!("pdfium could not render page {}: {:?}", i + 1, e);
                None
            }
        })
        .collect();
    Ok(pages)
}

fn bitmap_to_image(bitmap: &PdfBitmap) -> Option<DynamicImage> {
    let width = u32::try_from(bitmap.width()).ok().filter(|w| *w > 0)?;
    let height = u32::try_from(bitmap.height()).ok().filter(|h| *h > 0)?;
    let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes())?;
    Some(DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(rgba).to_rgb8()))
}

/// First embedded raster image of each page, in page order.
fn embedded_page_images(doc: &Document) -> Vec<Option<DynamicImage>> {
    doc.get_pages()
        .into_values()
        .map(|page_id| first_page_image(doc, page_id))
        .collect()
}

fn first_page_image(doc: &Document, page_id: ObjectId) -> Option<DynamicImage> {
    let resources = page_resources(doc, page_id)?;
    let xobjects = resources.get(b"XObject").ok()?;
    let (_, xobjects) = doc.dereference(xobjects).ok()?;
    let Object::Dictionary(xobjects) = xobjects else {
        return None;
    };

    xobjects.iter().find_map(|(_, obj_ref)| {
        let (_, obj) = doc.dereference(obj_ref).ok()?;
        decode_image_object(doc, obj)
    })
}

/// Resources for a page, walking up the page tree for inherited entries.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Object::Dictionary(dict) = doc.get_object(node_id).ok()? else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res))) = doc.dereference(resources) {
            return Some(res.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, obj: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = obj else {
        return None;
    };
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = positive_dimension(dict, b"Width")?;
    let height = positive_dimension(dict, b"Height")?;
    trace!("Found image object: {}x{}", width, height);

    let filters: Vec<Vec<u8>> = stream
        .filters()
        .map(|names| names.into_iter().map(<[u8]>::to_vec).collect())
        .unwrap_or_default();
    if filters.iter().any(|f| {
        matches!(
            f.as_slice(),
            b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode"
        )
    }) {
        trace!("Skipping image with unsupported filter");
        return None;
    }

    if let Some((last, earlier)) = filters.split_last() {
        if last.as_slice() == b"DCTDecode" {
            let jpeg = if earlier.is_empty() {
                stream.content.clone()
            } else {
                decode_filters(stream, earlier)?
            };
            let image = image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).ok()?;
            if image.width() == 0 || image.height() == 0 {
                return None;
            }
            return Some(DynamicImage::ImageRgb8(image.to_rgb8()));
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    raw_to_rgb(&data, width, height, color_space, bits)
}

/// A `/Width` or `/Height` entry, rejected unless it is a positive integer
/// that fits in a u32.
fn positive_dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).ok()?.as_i64().ok()?;
    u32::try_from(value).ok().filter(|v| *v > 0)
}

/// Apply the leading filters of a chain, leaving the image codec's input.
fn decode_filters(stream: &lopdf::Stream, filters: &[Vec<u8>]) -> Option<Vec<u8>> {
    let mut partial = stream.clone();
    partial.dict.set(
        "Filter",
        Object::Array(filters.iter().cloned().map(Object::Name).collect()),
    );
    match partial.decompressed_content() {
        Ok(data) => Some(data),
        Err(e) => {
            trace!("Could not undo filters ahead of DCTDecode: {}", e);
            None
        }
    }
}

fn raw_to_rgb(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
    bits_per_component: i64,
) -> Option<DynamicImage> {
    if bits_per_component != 8 {
        trace!("Unsupported bits per component: {}", bits_per_component);
        return None;
    }
    if width == 0 || height == 0 {
        return None;
    }

    let pixels = (width as usize).checked_mul(height as usize)?;
    let rgb_len = pixels.checked_mul(3)?;
    let rgb = match color_space {
        b"DeviceRGB" | b"RGB" if data.len() >= rgb_len => data[..rgb_len].to_vec(),
        b"DeviceGray" | b"G" if data.len() >= pixels => data[..pixels]
            .iter()
            .flat_map(|&g| [g, g, g])
            .collect(),
        _ => {
            trace!(
                "Could not decode raw image: {} bytes for {}x{}",
                data.len(),
                width,
                height
            );
            return None;
        }
    };

    ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
}
