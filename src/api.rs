// API client module: a small blocking HTTP client for LandingAI's Agentic
// Document Extraction (ADE) parse endpoint. One request per document, no
// retries; whatever LandingAI answers is surfaced to the caller as-is.

use reqwest::blocking::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Settings;
use crate::document::DocumentKind;
use crate::error::{FindocError, Result};

const PARSE_PATH: &str = "/v1/ade/parse";

/// Response of the parse endpoint. Only the parts we render are typed; every
/// field defaults so schema drift on LandingAI's side does not break decoding.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ParseResponse {
    /// Whole-document markdown.
    pub markdown: String,
    pub chunks: Vec<Chunk>,
    pub metadata: Value,
}

/// A located region of the document.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Chunk {
    pub id: String,
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub markdown: String,
    pub grounding: Option<Grounding>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Grounding {
    /// Zero-based page index.
    pub page: u32,
    #[serde(rename = "box")]
    pub bbox: Option<NormalizedBox>,
}

/// Box in page-relative units, 0.0 to 1.0 on both axes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct NormalizedBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl ParseResponse {
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

/// Blocking client holding the reqwest client, endpoint and credential.
#[derive(Clone)]
pub struct LandingAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LandingAiClient {
    /// Build a client from settings. Fails before any network traffic when
    /// no key is configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_api_key()?.to_string();
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(LandingAiClient {
            client,
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.model.clone(),
        })
    }

    pub fn parse_endpoint(&self) -> String {
        format!("{}{}", self.base_url, PARSE_PATH)
    }

    /// Parse a document and decode the typed response.
    pub fn parse_document(&self, bytes: &[u8], filename: &str) -> Result<ParseResponse> {
        ParseResponse::from_value(self.parse_raw(bytes, filename)?)
    }

    /// Parse a document and return the undecoded JSON body.
    pub fn parse_raw(&self, bytes: &[u8], filename: &str) -> Result<Value> {
        let url = self.parse_endpoint();
        let mime = DocumentKind::from_filename(filename)
            .map(|kind| kind.mime())
            .unwrap_or("application/octet-stream");

        let part = multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime)?;
        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("document", part);

        info!(filename, model = %self.model, size = bytes.len(), "Sending document to LandingAI");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()?;

        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            return Err(FindocError::Api {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "LandingAI responded");
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_parse_response() {
        let value = json!({
            "markdown": "# Statement",
            "chunks": [
                {
                    "id": "c1",
                    "type": "text",
                    "markdown": "Total: 42.00",
                    "grounding": {
                        "page": 1,
                        "box": {"left": 0.1, "top": 0.2, "right": 0.5, "bottom": 0.3}
                    }
                },
                {"id": "c2", "type": "table", "markdown": "|a|b|"}
            ],
            "metadata": {"page_count": 2},
            "splits": []
        });

        let response = ParseResponse::from_value(value).unwrap();
        assert_eq!(response.markdown, "# Statement");
        assert_eq!(response.chunks.len(), 2);

        let grounding = response.chunks[0].grounding.as_ref().unwrap();
        assert_eq!(grounding.page, 1);
        assert_eq!(
            grounding.bbox,
            Some(NormalizedBox { left: 0.1, top: 0.2, right: 0.5, bottom: 0.3 })
        );
        assert_eq!(response.chunks[1].chunk_type, "table");
        assert!(response.chunks[1].grounding.is_none());
    }

    #[test]
    fn test_empty_object_decodes_to_defaults() {
        let response = ParseResponse::from_value(json!({})).unwrap();
        assert!(response.chunks.is_empty());
        assert!(response.markdown.is_empty());
    }

    #[test]
    fn test_new_requires_key() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert!(matches!(
            LandingAiClient::new(&settings),
            Err(FindocError::MissingApiKey)
        ));
    }

    #[test]
    fn test_parse_endpoint() {
        let settings = Settings::from_lookup(|name| match name {
            "LANDINGAI_API_KEY" => Some("k".to_string()),
            "LANDINGAI_BASE_URL" => Some("http://localhost:1234/".to_string()),
            _ => None,
        })
        .unwrap();
        let client = LandingAiClient::new(&settings).unwrap();
        assert_eq!(client.parse_endpoint(), "http://localhost:1234/v1/ade/parse");
    }
}
