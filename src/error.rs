// Error types for the findoc library. Library code returns these; the
// binary wraps them with anyhow context.

use thiserror::Error;

/// Main error type for the library surface.
#[derive(Error, Debug)]
pub enum FindocError {
    /// No LandingAI key in the form, the environment or the saved key file.
    #[error("no LandingAI API key: set LANDINGAI_API_KEY or enter a key")]
    MissingApiKey,

    /// Upload is not a PNG, JPG or PDF.
    #[error("unsupported document type: {0} (expected png, jpg, jpeg or pdf)")]
    UnsupportedFormat(String),

    /// Transport failure talking to LandingAI.
    #[error("request to LandingAI failed: {0}")]
    Http(#[from] reqwest::Error),

    /// LandingAI answered with a non-success status.
    #[error("LandingAI returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body was not the JSON we expected.
    #[error("could not decode LandingAI response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// PDF could not be opened.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FindocError {
    /// True when the failure came from the LandingAI side rather than the input.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            FindocError::Http(_) | FindocError::Api { .. } | FindocError::Decode(_)
        )
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, FindocError>;
