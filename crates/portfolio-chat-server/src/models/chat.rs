use serde::{Deserialize, Serialize};

// ===== REQUEST MODELS =====

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub mode: ChatMode,
}

fn default_session_id() -> String {
    "default".to_string()
}

/// Persona selector. Anything other than `portfolio` is a general chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Portfolio,
    #[serde(other)]
    General,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Portfolio => "portfolio",
            Self::General => "general",
        }
    }
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct MessageChunk {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionInfo {
    pub done: bool,
    pub session_id: String,
    pub request_id: String,
    pub processing_time_ms: u64,
}

// ===== LLM WIRE MODELS =====

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}
