// Shared test harness: an in-process stand-in for the ADE parse endpoint.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Router,
};
use findoc::Settings;
use image::{DynamicImage, ImageFormat, RgbImage};

/// What the mock saw for one request.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub authorization: Option<String>,
    pub model: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub document_len: usize,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    captured: Arc<Mutex<Vec<Captured>>>,
}

/// Mock server running on its own thread and runtime, so it works from both
/// plain and async tests.
pub struct MockAde {
    pub base_url: String,
    pub captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockAde {
    pub fn start(status: u16, body: &str) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock listener");
        let addr = listener.local_addr().expect("mock addr");
        listener.set_nonblocking(true).expect("nonblocking listener");

        let captured = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status: StatusCode::from_u16(status).expect("valid status"),
            body: body.to_string(),
            captured: captured.clone(),
        };

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                let app = Router::new()
                    .route("/v1/ade/parse", post(parse_handler))
                    .with_state(state);
                axum::serve(listener, app).await.expect("mock server");
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
        }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    /// Settings pointing at this mock with the given key.
    pub fn settings(&self, api_key: Option<&str>) -> Settings {
        let base_url = self.base_url.clone();
        let api_key = api_key.map(str::to_string);
        Settings::from_lookup(move |name| match name {
            "LANDINGAI_API_KEY" => api_key.clone(),
            "LANDINGAI_BASE_URL" => Some(base_url.clone()),
            _ => None,
        })
        .expect("settings")
    }
}

async fn parse_handler(
    State(state): State<MockState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let mut captured = Captured {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..Default::default()
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "model" => captured.model = field.text().await.ok(),
            "document" => {
                captured.filename = field.file_name().map(str::to_string);
                captured.content_type = field.content_type().map(str::to_string);
                captured.document_len = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            _ => {}
        }
    }

    state.captured.lock().unwrap().push(captured);
    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}

/// A two-chunk response for a single-page document.
pub fn sample_response() -> String {
    serde_json::json!({
        "markdown": "# ACME Bank statement\n\nClosing balance: 1,024.00",
        "chunks": [
            {
                "id": "c-1",
                "type": "text",
                "markdown": "# ACME Bank statement",
                "grounding": {"page": 0, "box": {"left": 0.1, "top": 0.1, "right": 0.6, "bottom": 0.2}}
            },
            {
                "id": "c-2",
                "type": "table",
                "markdown": "Closing balance: 1,024.00",
                "grounding": {"page": 0, "box": {"left": 0.1, "top": 0.5, "right": 0.9, "bottom": 0.8}}
            }
        ],
        "metadata": {"page_count": 1, "credit_usage": 3}
    })
    .to_string()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}
