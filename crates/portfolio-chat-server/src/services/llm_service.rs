use crate::config::LlmConfig;
use crate::models::chat::ChatMessage;
use crate::utils::error::GenerationError;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Incremental text fragments from the backend, in order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// Text generation backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Full completion for a prompt.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Same completion, delivered as fragments. Concatenated fragments
    /// form the full reply.
    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, GenerationError>;
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
    pub temperature: f32,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    pub choices: Vec<ChoiceChunk>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceChunk {
    pub delta: Delta,
}

#[derive(Debug, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn completion_request(&self, prompt: &str, stream: bool) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream,
        }
    }

    async fn post(&self, body: &ChatCompletionRequest) -> Result<reqwest::Response, GenerationError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut request = self.client.post(&url).json(body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Transport(format!("Failed to call LLM API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status { status, body });
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl LlmProvider for LlmService {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!("Starting generation ({} prompt chars)", prompt.len());

        let response = self.post(&self.completion_request(prompt, false)).await?;
        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(GenerationError::Empty)
    }

    async fn generate_stream(&self, prompt: &str) -> Result<TextStream, GenerationError> {
        debug!("Starting generation stream ({} prompt chars)", prompt.len());

        let response = self.post(&self.completion_request(prompt, true)).await?;
        Ok(parse_sse(response.bytes_stream()))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Text(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(payload) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let payload = payload.trim_start();

    if payload == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<ChatCompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|c| !c.is_empty())
            .map(SseLine::Text)
            .unwrap_or(SseLine::Skip),
        Err(e) => {
            warn!("Skipping unparsable stream event: {}", e);
            SseLine::Skip
        }
    }
}

/// Turns a raw SSE byte stream into content fragments. Events may be split
/// across network chunks, so bytes are buffered until a full line arrives.
fn parse_sse<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: std::fmt::Display + Send,
{
    let stream = async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'read: while let Some(item) = bytes.next().await {
            let chunk = item.map_err(|e| GenerationError::Stream(e.to_string()))?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    SseLine::Text(text) => yield text,
                    SseLine::Done => {
                        finished = true;
                        break 'read;
                    }
                    SseLine::Skip => {}
                }
            }
        }

        if !finished && !buffer.is_empty() {
            if let SseLine::Text(text) = parse_sse_line(&String::from_utf8_lossy(&buffer)) {
                yield text;
            }
        }
    };

    Box::pin(stream)
}
