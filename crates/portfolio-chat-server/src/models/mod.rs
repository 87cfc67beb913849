pub mod chat;

pub use chat::{ChatMessage, ChatMode, ChatReply, ChatRequest, CompletionInfo, MessageChunk};
