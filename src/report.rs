// Per-page aggregation of a parse response and the terminal renderers.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use image::{DynamicImage, RgbImage};
use serde::Serialize;
use serde_json::Value;

use crate::api::ParseResponse;
use crate::overlay::{draw_bounding_boxes, extract_bounding_boxes, BoundingBox};

pub const NO_MARKDOWN: &str = "No markdown found for this page.";
pub const NO_BOXES: &str = "No bounding boxes found for this page.";

/// What we show for one page.
#[derive(Debug, Clone)]
pub struct PageReport {
    /// Zero-based page index.
    pub index: u32,
    pub markdown: Option<String>,
    pub boxes: Vec<BoundingBox>,
    /// Preview with boxes drawn, when the page had a preview and boxes.
    pub annotated: Option<RgbImage>,
}

/// A flattened key/value view of the loosely-typed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub key: String,
    pub value: String,
}

/// Chunk markdown grouped by page, joined with a blank line in response order.
/// Chunks without grounding count as page 0.
pub fn markdown_by_page(response: &ParseResponse) -> BTreeMap<u32, String> {
    let mut pages: BTreeMap<u32, String> = BTreeMap::new();
    for chunk in &response.chunks {
        let page = chunk.grounding.as_ref().map(|g| g.page).unwrap_or(0);
        pages
            .entry(page)
            .and_modify(|md| {
                md.push_str("\n\n");
                md.push_str(&chunk.markdown);
            })
            .or_insert_with(|| chunk.markdown.clone());
    }
    pages
}

/// One report per page. Covers every preview and every page the response
/// mentions, whichever is larger.
pub fn build_pages(response: &ParseResponse, previews: &[Option<DynamicImage>]) -> Vec<PageReport> {
    let mut markdown = markdown_by_page(response);
    let highest_seen = response
        .chunks
        .iter()
        .filter_map(|c| c.grounding.as_ref().map(|g| g.page + 1))
        .max()
        .unwrap_or(0);
    let page_count = (previews.len() as u32).max(highest_seen);

    (0..page_count)
        .map(|index| {
            let (boxes, annotated) = match previews.get(index as usize).and_then(Option::as_ref) {
                Some(preview) => {
                    let boxes: Vec<BoundingBox> =
                        extract_bounding_boxes(response, preview.width(), preview.height())
                            .into_iter()
                            .filter(|b| b.page_index == index)
                            .collect();
                    let annotated =
                        (!boxes.is_empty()).then(|| draw_bounding_boxes(preview, &boxes));
                    (boxes, annotated)
                }
                None => (Vec::new(), None),
            };
            PageReport {
                index,
                markdown: markdown.remove(&index).filter(|md| !md.trim().is_empty()),
                boxes,
                annotated,
            }
        })
        .collect()
}

/// Depth-first flatten into dotted keys; array items use `[i]`.
pub fn flatten_fields(value: &Value) -> Vec<Field> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<Field>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}[{i}]"), child, out);
            }
        }
        Value::String(s) => push_field(prefix, s.clone(), out),
        Value::Null => push_field(prefix, String::new(), out),
        other => push_field(prefix, other.to_string(), out),
    }
}

fn push_field(key: &str, value: String, out: &mut Vec<Field>) {
    out.push(Field {
        key: key.to_string(),
        value,
    });
}

/// Plain-text report: a heading per page followed by its markdown.
pub fn render_text(pages: &[PageReport]) -> String {
    let mut out = String::new();
    for page in pages {
        let _ = writeln!(out, "=== Page {} ===", page.index + 1);
        if !page.boxes.is_empty() {
            let _ = writeln!(out, "({} bounding boxes)", page.boxes.len());
        }
        match &page.markdown {
            Some(md) => {
                let _ = writeln!(out, "{}", md.trim_end());
            }
            None => {
                let _ = writeln!(out, "{NO_MARKDOWN}");
            }
        }
        out.push('\n');
    }
    out
}

/// Whole-document markdown, rebuilt from the chunks when the response
/// carries none.
pub fn render_markdown(response: &ParseResponse) -> String {
    if !response.markdown.trim().is_empty() {
        return response.markdown.clone();
    }
    markdown_by_page(response)
        .into_values()
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_fields(fields: &[Field]) -> String {
    let mut out = String::new();
    for field in fields {
        let _ = writeln!(out, "{}: {}", field.key, field.value);
    }
    out
}

pub fn render_json(value: &Value) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
