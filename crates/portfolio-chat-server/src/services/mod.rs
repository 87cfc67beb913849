pub mod chat_service;
pub mod context_assembler;
pub mod conversation;
pub mod llm_service;
pub mod portfolio;
pub mod response_cache;

pub use chat_service::{ChatService, ChatStreamChunk};
pub use context_assembler::ContextAssembler;
pub use conversation::SessionStore;
pub use llm_service::{LlmProvider, LlmService};
pub use portfolio::PortfolioCache;
pub use response_cache::ResponseCache;
