use actix_web::web::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone)]
pub struct RoastRequest {
    pub username: String,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub intensity: Option<u8>,
}

/// Wire frames of the roast stream, in the order the caller sees them:
/// zero or more `chunk`s, then exactly one `done` or `error`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk { text: String },
    Done { roast: String },
    Error { message: String },
}

impl StreamEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    pub fn done(roast: impl Into<String>) -> Self {
        Self::Done { roast: roast.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize as a server-sent-event frame.
    pub fn to_sse(&self) -> Bytes {
        let payload = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Bytes::from(format!("data: {}\n\n", payload))
    }
}

#[derive(Debug, Deserialize)]
pub struct InsightsRequest {
    pub username: String,
}

/// The three insight cards the model is asked to produce.
#[derive(Debug, Serialize, Deserialize)]
pub struct Insights {
    pub strengths: String,
    pub trend: String,
    pub recommendation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_serializes_with_type_tag() {
        let frame = StreamEvent::chunk("hello").to_sse();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.starts_with("data: "));
        assert!(text.ends_with("\n\n"));
        assert!(text.contains(r#""type":"chunk""#));
        assert!(text.contains(r#""text":"hello""#));
    }

    #[test]
    fn roast_request_defaults_are_optional() {
        let req: RoastRequest = serde_json::from_str(r#"{"username":"octocat"}"#).unwrap();
        assert_eq!(req.username, "octocat");
        assert!(req.personality.is_none());
        assert!(req.intensity.is_none());
    }
}
