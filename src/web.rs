// Browser upload UI. `GET /` shows the upload form and `GET /health` is a
// liveness check. `POST /analyze` forwards the document to LandingAI and
// renders one row per page: annotated preview on the left, page markdown on
// the right. Nothing is stored between requests.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pulldown_cmark::{html, Options, Parser};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::LandingAiClient;
use crate::config::Settings;
use crate::document::{load_pages, DocumentKind, ACCEPTED_EXTENSIONS};
use crate::error::Result;
use crate::overlay::encode_png;
use crate::report::{build_pages, NO_BOXES, NO_MARKDOWN};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const GET_STARTED: &str = "Upload a PNG, JPG, or PDF to get started.";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

/// Build the Axum application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured address and serve until the process stops.
pub async fn serve(settings: Settings) -> Result<()> {
    let addr = settings.addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Upload UI listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(AppState::new(settings))).await?;
    Ok(())
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    Html(layout(&upload_form(state.settings.has_api_key()), Some(GET_STARTED)))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

struct Upload {
    api_key: Option<String>,
    filename: String,
    bytes: Vec<u8>,
}

/// One page ready for the results template.
struct RenderedPage {
    index: u32,
    image_data_uri: Option<String>,
    markdown_html: Option<String>,
}

async fn analyze_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let has_key = state.settings.has_api_key();

    let upload = match read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return error_page(StatusCode::BAD_REQUEST, GET_STARTED, has_key),
        Err(e) => {
            error!(error = %e, "Could not read upload");
            return error_page(e.status(), &e.body_text(), has_key);
        }
    };

    let settings = (*state.settings).clone().with_api_key(upload.api_key.as_deref());
    let filename = upload.filename.clone();
    let outcome = tokio::task::spawn_blocking(move || analyze_upload(&settings, &upload)).await;

    match outcome {
        Ok(Ok(pages)) => {
            info!(filename = %filename, pages = pages.len(), "Rendered analysis");
            let body = format!("{}{}", upload_form(has_key), results(&filename, &pages));
            (StatusCode::OK, Html(layout(&body, None)))
        }
        Ok(Err(e)) => {
            error!(filename = %filename, error = %e, "Analysis failed");
            let status = if e.is_upstream() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::BAD_REQUEST
            };
            error_page(status, &e.to_string(), has_key)
        }
        Err(e) => {
            error!(error = %e, "Analysis task panicked");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed unexpectedly.", has_key)
        }
    }
}

/// Pull the key and document out of the form. `Ok(None)` when no file was chosen.
/// Oversized bodies fail here with a 413.
async fn read_upload(
    mut multipart: Multipart,
) -> std::result::Result<Option<Upload>, MultipartError> {
    let mut api_key = None;
    let mut document = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "api_key" => api_key = Some(field.text().await?),
            "document" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // browsers send an empty part when no file is selected
                if !filename.is_empty() && !bytes.is_empty() {
                    document = Some((filename, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(document.map(|(filename, bytes)| Upload {
        api_key,
        filename,
        bytes,
    }))
}

/// Blocking part of a request: preview, upstream call, drawing, encoding.
fn analyze_upload(settings: &Settings, upload: &Upload) -> Result<Vec<RenderedPage>> {
    let kind = DocumentKind::from_filename(&upload.filename)?;
    let previews = load_pages(&upload.bytes, kind)?;

    let client = LandingAiClient::new(settings)?;
    let response = client.parse_document(&upload.bytes, &upload.filename)?;

    build_pages(&response, &previews)
        .into_iter()
        .map(|page| -> Result<RenderedPage> {
            let image_data_uri = match &page.annotated {
                Some(image) => Some(format!(
                    "data:image/png;base64,{}",
                    STANDARD.encode(encode_png(image)?)
                )),
                None => None,
            };
            Ok(RenderedPage {
                index: page.index,
                image_data_uri,
                markdown_html: page.markdown.as_deref().map(markdown_to_html),
            })
        })
        .collect()
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn error_page(status: StatusCode, message: &str, has_key: bool) -> (StatusCode, Html<String>) {
    let body = format!(
        "{}<div class=\"error\">{}</div>",
        upload_form(has_key),
        escape(message)
    );
    (status, Html(layout(&body, None)))
}

fn upload_form(has_key: bool) -> String {
    let accept = ACCEPTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{ext}"))
        .collect::<Vec<_>>()
        .join(",");
    let key_hint = if has_key {
        "Leave empty to use the server's configured key."
    } else {
        "No API key configured on the server, enter one to continue."
    };

    format!(
        r#"<form method="post" action="/analyze" enctype="multipart/form-data">
<label>Enter your Landing AI API key <input type="password" name="api_key" autocomplete="off"></label>
<p class="hint">{key_hint}</p>
<label>Upload a document <input type="file" name="document" accept="{accept}" required></label>
<button type="submit">Analyze document with LandingAI</button>
</form>"#
    )
}

fn results(filename: &str, pages: &[RenderedPage]) -> String {
    let mut out = format!("<h2>Results for {}</h2>", escape(filename));
    for page in pages {
        let number = page.index + 1;
        let image = match &page.image_data_uri {
            Some(uri) => format!(
                "<img src=\"{uri}\" alt=\"Page {number} with bounding boxes\"><p class=\"caption\">Page {number} with bounding boxes</p>"
            ),
            None => format!("<p class=\"info\">{NO_BOXES}</p>"),
        };
        let markdown = match &page.markdown_html {
            Some(html) => html.clone(),
            None => format!("<p class=\"info\">{NO_MARKDOWN}</p>"),
        };
        out.push_str(&format!(
            "<div class=\"page\"><div class=\"preview\"><h3>Page {number}</h3>{image}</div><div class=\"markdown\"><h3>Page {number}</h3>{markdown}</div></div>"
        ));
    }
    out
}

fn layout(body: &str, info: Option<&str>) -> String {
    let info = info
        .map(|msg| format!("<p class=\"info\">{}</p>", escape(msg)))
        .unwrap_or_default();
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>Financial Document Extractor</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
.page {{ display: flex; gap: 2rem; margin-bottom: 2rem; }}
.preview {{ flex: 1.1; }}
.markdown {{ flex: 1.3; overflow-x: auto; }}
.preview img {{ max-width: 100%; }}
.error {{ background: #fde2e2; color: #8a1f1f; padding: 0.75rem; margin-top: 1rem; }}
.info {{ background: #e6f0fb; padding: 0.75rem; }}
.hint, .caption {{ color: #666; font-size: 0.9rem; }}
</style>
</head>
<body>
<h1>Financial Document Extractor PoC</h1>
<p>Upload a financial document (image or PDF). This demo parses it with Landing AI's ADE API, overlays bounding boxes, and shows extracted fields.</p>
{body}
{info}
</body>
</html>"#
    )
}
