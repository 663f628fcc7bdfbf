use thiserror::Error;

/// Failure taxonomy for the roast pipeline.
///
/// `UpstreamFetch` and `SchemaValidation` are recoverable inside a tool
/// call (they become a failed tool result handed back to the model) but
/// fatal at the existence probe, where only a 404 has a dedicated path.
#[derive(Debug, Error)]
pub enum RoastError {
    #[error("GitHub API error: {status} {status_text}")]
    UpstreamFetch { status: u16, status_text: String },

    #[error("unexpected {context} payload from GitHub: {source}")]
    SchemaValidation {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("caller disconnected before the stream completed")]
    Canceled,
}

pub type Result<T> = std::result::Result<T, RoastError>;
