use actix_web::{web, HttpResponse, Result as ActixResult};
use futures::StreamExt;
use lazy_static::lazy_static;
use log::{error, info};
use regex::Regex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::error::RoastError;
use crate::handlers::AppState;
use crate::models::roast::{RoastRequest, StreamEvent};

lazy_static! {
    // GitHub usernames: alphanumeric and hyphens, max 39 chars. Checked
    // before anything is interpolated into an upstream URL.
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9-]{0,38}$").unwrap();
}

/// Streams a roast as server-sent events: `chunk` frames as the model
/// produces text, then one `done` frame carrying the aggregated roast,
/// or one `error` frame with a generic message.
pub async fn handle_roast(
    body: web::Json<RoastRequest>,
    data: web::Data<AppState>,
) -> ActixResult<HttpResponse> {
    let request = body.into_inner();

    if !USERNAME_REGEX.is_match(&request.username) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "username must be a valid GitHub username"
        })));
    }

    let request_id = Uuid::new_v4();
    info!(
        "[{}] roast requested for {} (personality: {}, intensity: {})",
        request_id,
        request.username,
        request.personality.as_deref().unwrap_or("default"),
        request.intensity.unwrap_or(3),
    );

    let (tx, rx) = mpsc::channel::<StreamEvent>(32);
    let orchestrator = data.orchestrator.clone();
    actix_web::rt::spawn(async move {
        match orchestrator.roast(&request, &tx).await {
            Ok(text) => info!("[{}] roast complete ({} chars)", request_id, text.len()),
            Err(RoastError::Canceled) => {
                info!("[{}] caller disconnected mid-roast", request_id)
            }
            Err(e) => {
                error!("[{}] roast failed: {}", request_id, e);
                let _ = tx
                    .send(StreamEvent::error(
                        "Failed to generate roast. Please try again later.",
                    ))
                    .await;
            }
        }
    });

    let frames = ReceiverStream::new(rx).map(|event| Ok::<_, actix_web::Error>(event.to_sse()));
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(frames))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_regex_accepts_real_usernames() {
        for name in ["octocat", "torvalds", "rust-lang", "a", "x1-y2-z3"] {
            assert!(USERNAME_REGEX.is_match(name), "rejected: {}", name);
        }
    }

    #[test]
    fn username_regex_rejects_garbage() {
        for name in [
            "",
            "-leading-hyphen",
            "has space",
            "slash/attack",
            "dot.dot",
            "../../etc/passwd",
            &"x".repeat(40),
        ] {
            assert!(!USERNAME_REGEX.is_match(name), "accepted: {}", name);
        }
    }
}
