// Library root
// -----------
// This crate exposes a small library surface shared by the CLI, the
// interactive menu and the web upload UI. All extraction happens inside
// LandingAI's hosted ADE service; this code only forwards documents and
// renders what comes back.
//
// Module responsibilities:
// - `config`: environment / `.env` settings and the remembered API key.
// - `error`: the library error type.
// - `api`: blocking HTTP client for the ADE parse endpoint.
// - `document`: upload classification and page previews (images, PDFs).
// - `overlay`: chunk bounding boxes and drawing them on previews.
// - `report`: per-page aggregation, field flattening, text renderers.
// - `ui`: interactive terminal flow.
// - `web`: axum upload UI.
pub mod api;
pub mod config;
pub mod document;
pub mod error;
pub mod overlay;
pub mod report;
pub mod ui;
pub mod web;

pub use api::{Chunk, Grounding, LandingAiClient, NormalizedBox, ParseResponse};
pub use config::Settings;
pub use error::{FindocError, Result};
