use async_trait::async_trait;
use futures::{future, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::error::{Result, RoastError};
use crate::models::roast::StreamEvent;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Hard cap on tool round-trips in one generation. A model that is
/// still asking for tools after this many turns gets cut off and the
/// accumulated text is returned as-is.
const MAX_TOOL_ROUNDS: usize = 8;

/// A named operation the model may invoke mid-generation.
///
/// Handlers must be independently callable: the model can request
/// several in one turn and they all run concurrently.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn declaration(&self) -> FunctionDeclaration;
    async fn call(&self, args: Value) -> Result<Value>;
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDecl]>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct ToolDecl {
    #[serde(rename = "functionDeclarations")]
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part {
                text: Some(text.into()),
                ..Default::default()
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "functionCall", skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(rename = "functionResponse", skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "topK")]
    top_k: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

impl GenerationConfig {
    fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// What one streamed model turn produced: text already forwarded to the
/// caller, plus any tool invocations to satisfy before the next turn.
#[derive(Default)]
struct Turn {
    text: String,
    calls: Vec<FunctionCall>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_base_url(api_key, model, GEMINI_API_URL.to_string())
    }

    fn with_base_url(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        }
    }

    /// Streaming generation with tool dispatch.
    ///
    /// Text fragments are forwarded to `events` in arrival order and also
    /// accumulated; the return value equals the concatenation of every
    /// forwarded chunk. The model decides which tools to invoke, how
    /// often, and in what order; a failed tool call is reported back to
    /// it as an error payload and never aborts the generation.
    pub async fn generate_stream(
        &self,
        prompt: &str,
        tools: &[Box<dyn Tool>],
        temperature: f32,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<String> {
        let declarations = if tools.is_empty() {
            None
        } else {
            Some(vec![ToolDecl {
                function_declarations: tools.iter().map(|t| t.declaration()).collect(),
            }])
        };

        let mut contents = vec![Content::text("user", prompt)];
        let mut final_text = String::new();

        for round in 0..MAX_TOOL_ROUNDS {
            let turn = self
                .stream_turn(
                    &contents,
                    declarations.as_deref(),
                    temperature,
                    events,
                    &mut final_text,
                )
                .await?;

            if turn.calls.is_empty() {
                return Ok(final_text);
            }
            info!(
                "model requested {} tool call(s) in round {}",
                turn.calls.len(),
                round + 1
            );

            let mut model_parts = Vec::new();
            if !turn.text.is_empty() {
                model_parts.push(Part {
                    text: Some(turn.text.clone()),
                    ..Default::default()
                });
            }
            model_parts.extend(turn.calls.iter().map(|call| Part {
                function_call: Some(call.clone()),
                ..Default::default()
            }));
            contents.push(Content {
                role: "model".to_string(),
                parts: model_parts,
            });

            contents.push(Content {
                role: "user".to_string(),
                parts: execute_tools(tools, &turn.calls).await,
            });
        }

        warn!("tool round limit reached; returning accumulated text");
        Ok(final_text)
    }

    /// Single-shot generation, used where no streaming or tools are
    /// needed (the insight cards).
    pub async fn generate_content(&self, prompt: &str, temperature: f32) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let contents = vec![Content::text("user", prompt)];
        let request = GenerateRequest {
            contents: &contents,
            tools: None,
            generation_config: GenerationConfig::with_temperature(temperature),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(RoastError::Generation(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| RoastError::Generation("no content in Gemini response".to_string()))
    }

    async fn stream_turn(
        &self,
        contents: &[Content],
        tools: Option<&[ToolDecl]>,
        temperature: f32,
        events: &mpsc::Sender<StreamEvent>,
        final_text: &mut String,
    ) -> Result<Turn> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents,
            tools,
            generation_config: GenerationConfig::with_temperature(temperature),
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, body);
            return Err(RoastError::Generation(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let mut turn = Turn::default();
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| RoastError::Generation(format!("stream interrupted: {}", e)))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(newline) = buffer.find('\n') {
                let line: String = buffer.drain(..=newline).collect();
                self.consume_sse_line(line.trim(), events, &mut turn, final_text)
                    .await?;
            }
        }
        let tail = buffer.trim().to_string();
        if !tail.is_empty() {
            self.consume_sse_line(&tail, events, &mut turn, final_text)
                .await?;
        }

        Ok(turn)
    }

    async fn consume_sse_line(
        &self,
        line: &str,
        events: &mpsc::Sender<StreamEvent>,
        turn: &mut Turn,
        final_text: &mut String,
    ) -> Result<()> {
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(());
        }

        for part in parse_stream_frame(data)? {
            if let Some(text) = part.text.filter(|t| !t.is_empty()) {
                // A send failure means the caller hung up; stop streaming
                // so the in-flight generation gets dropped with us.
                events
                    .send(StreamEvent::chunk(text.clone()))
                    .await
                    .map_err(|_| RoastError::Canceled)?;
                turn.text.push_str(&text);
                final_text.push_str(&text);
            }
            if let Some(call) = part.function_call {
                debug!("function call requested: {}", call.name);
                turn.calls.push(call);
            }
        }
        Ok(())
    }
}

fn parse_stream_frame(data: &str) -> Result<Vec<Part>> {
    let parsed: GenerateResponse = serde_json::from_str(data)
        .map_err(|e| RoastError::Generation(format!("unparseable stream frame: {}", e)))?;
    Ok(parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default())
}

/// Run every requested call against the tool table, concurrently. Each
/// failure turns into an error payload for the model instead of bubbling
/// up; data gaps are the model's problem to roast around.
async fn execute_tools(tools: &[Box<dyn Tool>], calls: &[FunctionCall]) -> Vec<Part> {
    future::join_all(calls.iter().map(|call| async move {
        let result = match tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.call(call.args.clone()).await,
            None => Err(RoastError::Generation(format!("unknown tool: {}", call.name))),
        };
        tool_response_part(&call.name, result)
    }))
    .await
}

fn tool_response_part(name: &str, result: Result<Value>) -> Part {
    let response = match result {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => json!({ "result": other }),
        Err(e) => {
            warn!("tool call {} failed: {}", name, e);
            json!({ "error": e.to_string() })
        }
    };
    Part {
        function_response: Some(FunctionResponse {
            name: name.to_string(),
            response,
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> GeminiClient {
        GeminiClient::with_base_url(
            "test-key".to_string(),
            "gemini-2.0-flash".to_string(),
            server.url(),
        )
    }

    fn text_frame(text: &str) -> String {
        format!(
            r#"data: {{"candidates": [{{"content": {{"role": "model", "parts": [{{"text": "{}"}}]}}}}]}}"#,
            text
        )
    }

    #[tokio::test]
    async fn streamed_chunks_concatenate_to_the_final_text() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}\n\n{}\n\n{}\n\n",
            text_frame("Your repos "),
            text_frame("are a cry "),
            text_frame("for help.")
        );
        server
            .mock(
                "POST",
                "/models/gemini-2.0-flash:streamGenerateContent?alt=sse",
            )
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let (tx, mut rx) = mpsc::channel(32);
        let final_text = test_client(&server)
            .generate_stream("roast me", &[], 0.7, &tx)
            .await
            .expect("stream should succeed");
        drop(tx);

        let mut chunks = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Chunk { text } => chunks.push(text),
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(chunks, ["Your repos ", "are a cry ", "for help."]);
        assert_eq!(final_text, chunks.concat());
    }

    #[tokio::test]
    async fn non_success_status_is_a_generation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "POST",
                "/models/gemini-2.0-flash:streamGenerateContent?alt=sse",
            )
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let (tx, _rx) = mpsc::channel(32);
        let err = test_client(&server)
            .generate_stream("roast me", &[], 0.7, &tx)
            .await
            .expect_err("429 should fail");

        assert!(matches!(err, RoastError::Generation(_)));
    }

    #[tokio::test]
    async fn generate_content_extracts_the_first_text_part() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "three cards"}]}}]}"#,
            )
            .create_async()
            .await;

        let text = test_client(&server)
            .generate_content("summarize", 0.7)
            .await
            .expect("call should succeed");
        assert_eq!(text, "three cards");
    }

    #[test]
    fn stream_frame_parses_text_and_function_calls() {
        let data = r#"{"candidates": [{"content": {"role": "model", "parts": [
            {"text": "checking..."},
            {"functionCall": {"name": "fetch_github_repos", "args": {"username": "octocat"}}}
        ]}}]}"#;
        let parts = parse_stream_frame(data).expect("frame should parse");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text.as_deref(), Some("checking..."));
        let call = parts[1].function_call.as_ref().expect("call part");
        assert_eq!(call.name, "fetch_github_repos");
        assert_eq!(call.args["username"], "octocat");
    }

    #[test]
    fn garbage_stream_frame_is_a_generation_error() {
        assert!(matches!(
            parse_stream_frame("not json"),
            Err(RoastError::Generation(_))
        ));
    }

    #[test]
    fn failed_tool_result_becomes_an_error_payload() {
        let part = tool_response_part(
            "fetch_github_repos",
            Err(RoastError::UpstreamFetch {
                status: 403,
                status_text: "Forbidden".to_string(),
            }),
        );
        let response = part.function_response.expect("response part");
        assert_eq!(response.name, "fetch_github_repos");
        assert!(response.response["error"]
            .as_str()
            .expect("error message")
            .contains("403"));
    }

    #[test]
    fn non_object_tool_results_are_wrapped() {
        let part = tool_response_part("fetch_commit_messages", Ok(json!(["fix", "fix again"])));
        let response = part.function_response.expect("response part");
        assert_eq!(response.response["result"][1], "fix again");
    }
}
