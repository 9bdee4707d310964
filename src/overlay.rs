// Bounding boxes from parse chunks, drawn over page previews. Each box gets
// an outline plus a tab carrying the chunk type in white 8x8 glyphs.

use std::io::Cursor;

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::Serialize;

use crate::api::ParseResponse;
use crate::error::Result;

const OUTLINE_WIDTH: u32 = 2;
const GLYPH_SIZE: u32 = 8;
const TAB_PADDING: u32 = 2;
const TAB_HEIGHT: u32 = GLYPH_SIZE + 2 * TAB_PADDING;

const TEXT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const OTHER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// A chunk's box scaled to pixel coordinates of a page preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundingBox {
    pub page_index: u32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
    pub text: String,
}

impl BoundingBox {
    fn color(&self) -> Rgb<u8> {
        if self.label == "text" {
            TEXT_COLOR
        } else {
            OTHER_COLOR
        }
    }
}

/// Scale every grounded chunk box to a `width` x `height` page.
/// Chunks without a grounding box are skipped.
pub fn extract_bounding_boxes(response: &ParseResponse, width: u32, height: u32) -> Vec<BoundingBox> {
    let (w, h) = (width as f32, height as f32);

    response
        .chunks
        .iter()
        .filter_map(|chunk| {
            let grounding = chunk.grounding.as_ref()?;
            let bbox = grounding.bbox?;
            let label = if chunk.chunk_type.is_empty() {
                "chunk".to_string()
            } else {
                chunk.chunk_type.clone()
            };
            Some(BoundingBox {
                page_index: grounding.page,
                x1: bbox.left * w,
                y1: bbox.top * h,
                x2: bbox.right * w,
                y2: bbox.bottom * h,
                label,
                text: chunk.markdown.clone(),
            })
        })
        .collect()
}

/// Draw boxes on a copy of the page: a 2px outline plus a filled label tab
/// sitting on the box's top edge, with the label written in white.
pub fn draw_bounding_boxes(page: &DynamicImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut annotated = page.to_rgb8();
    let (width, height) = annotated.dimensions();

    for bbox in boxes {
        let x1 = clamp(bbox.x1.min(bbox.x2), width);
        let x2 = clamp(bbox.x1.max(bbox.x2), width);
        let y1 = clamp(bbox.y1.min(bbox.y2), height);
        let y2 = clamp(bbox.y1.max(bbox.y2), height);
        if x1 >= x2 || y1 >= y2 {
            continue;
        }
        let color = bbox.color();

        fill_rect(&mut annotated, x1, y1, x2, (y1 + OUTLINE_WIDTH).min(y2), color);
        fill_rect(&mut annotated, x1, y2.saturating_sub(OUTLINE_WIDTH).max(y1), x2, y2, color);
        fill_rect(&mut annotated, x1, y1, (x1 + OUTLINE_WIDTH).min(x2), y2, color);
        fill_rect(&mut annotated, x2.saturating_sub(OUTLINE_WIDTH).max(x1), y1, x2, y2, color);

        if !bbox.label.is_empty() {
            let tab_width = bbox.label.chars().count() as u32 * GLYPH_SIZE + 2 * TAB_PADDING;
            let tab_top = y1.saturating_sub(TAB_HEIGHT);
            let tab_right = (x1 + tab_width).min(width);
            fill_rect(&mut annotated, x1, tab_top, tab_right, y1, color);
            draw_label(
                &mut annotated,
                &bbox.label,
                x1 + TAB_PADDING,
                tab_top + TAB_PADDING,
                tab_right,
            );
        }
    }

    annotated
}

/// Encode an annotated page as PNG.
pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Write `label` with its top-left corner at (x, y), stopping at `right`.
/// Characters outside the basic Latin set are skipped.
fn draw_label(image: &mut RgbImage, label: &str, x: u32, y: u32, right: u32) {
    let (width, height) = image.dimensions();
    let right = right.min(width);

    for (i, ch) in label.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let left = x + i as u32 * GLYPH_SIZE;
        if left >= right {
            break;
        }
        for (row, bits) in glyph.iter().enumerate() {
            let py = y + row as u32;
            if py >= height {
                break;
            }
            for col in 0..GLYPH_SIZE {
                let px = left + col;
                if px < right && bits & (1 << col) != 0 {
                    image.put_pixel(px, py, LABEL_COLOR);
                }
            }
        }
    }
}

fn clamp(value: f32, limit: u32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value.round() as u32).min(limit)
    }
}

/// Fill the half-open rectangle [x0, x1) x [y0, y1).
fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let (width, height) = image.dimensions();
    for y in y0..y1.min(height) {
        for x in x0..x1.min(width) {
            image.put_pixel(x, y, color);
        }
    }
}
