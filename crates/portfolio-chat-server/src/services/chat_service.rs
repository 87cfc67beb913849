use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, Instrument};

use crate::config::StreamConfig;
use crate::models::chat::ChatRequest;
use crate::services::context_assembler::ContextAssembler;
use crate::services::conversation::SessionStore;
use crate::services::llm_service::LlmProvider;
use crate::services::portfolio::PortfolioCache;
use crate::services::response_cache::ResponseCache;
use crate::utils::error::ChatError;

/// Events of a streamed reply, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStreamChunk {
    Token(String),
    Done,
}

/// Request pipeline: response cache, portfolio refresh, session history,
/// prompt assembly, generation, then a single commit of the result.
pub struct ChatService {
    responses: Arc<ResponseCache>,
    portfolio: Arc<PortfolioCache>,
    sessions: SessionStore,
    assembler: ContextAssembler,
    llm: Arc<dyn LlmProvider>,
    stream: StreamConfig,
}

impl ChatService {
    pub fn new(
        responses: Arc<ResponseCache>,
        portfolio: Arc<PortfolioCache>,
        sessions: SessionStore,
        assembler: ContextAssembler,
        llm: Arc<dyn LlmProvider>,
        stream: StreamConfig,
    ) -> Self {
        Self {
            responses,
            portfolio,
            sessions,
            assembler,
            llm,
            stream,
        }
    }

    pub fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub fn portfolio(&self) -> &PortfolioCache {
        &self.portfolio
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Complete reply for a request. Failures become the apology text.
    pub async fn reply(&self, request: &ChatRequest) -> String {
        let key = ResponseCache::key(&request.message, request.mode);

        if let Some(cached) = self.responses.get(&key) {
            debug!("Response cache hit for session {}", request.session_id);
            self.sessions.append(&request.session_id, request.message.clone(), cached.clone());
            return cached;
        }

        match self.generate(request).await {
            Ok(reply) => {
                self.commit(key, request, &reply);
                reply
            }
            Err(e) => {
                error!("Chat generation failed for session {}: {}", request.session_id, e);
                e.user_reply().to_string()
            }
        }
    }

    /// Streamed reply. Work runs on its own task and finishes even when the
    /// receiver is dropped, so a completed answer is always committed.
    pub fn reply_stream(self: &Arc<Self>, request: ChatRequest) -> mpsc::Receiver<ChatStreamChunk> {
        let (tx, rx) = mpsc::channel(self.stream.channel_capacity.max(1));
        let service = Arc::clone(self);

        tokio::spawn(
            async move {
                service.run_stream(request, tx).await;
            }
            .instrument(tracing::Span::current()),
        );

        rx
    }

    async fn run_stream(&self, request: ChatRequest, tx: mpsc::Sender<ChatStreamChunk>) {
        let key = ResponseCache::key(&request.message, request.mode);

        if let Some(cached) = self.responses.get(&key) {
            debug!("Response cache hit for session {} (replay)", request.session_id);
            self.sessions.append(&request.session_id, request.message.clone(), cached.clone());
            self.replay(&cached, &tx).await;
            let _ = tx.send(ChatStreamChunk::Done).await;
            return;
        }

        match self.generate_streaming(&request, &tx).await {
            Ok(reply) => {
                self.commit(key, &request, &reply);
            }
            Err(e) => {
                error!("Chat stream failed for session {}: {}", request.session_id, e);
                let _ = tx.send(ChatStreamChunk::Token(e.user_reply().to_string())).await;
            }
        }

        let _ = tx.send(ChatStreamChunk::Done).await;
    }

    async fn prompt_for(&self, request: &ChatRequest) -> String {
        let snapshot = self.portfolio.ensure_fresh().await;
        let (summary, window) = self.sessions.context(&request.session_id);

        self.assembler
            .build_prompt(&summary, &window, &snapshot, request.mode, &request.message)
    }

    async fn generate(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let prompt = self.prompt_for(request).await;
        Ok(self.llm.generate(&prompt).await?)
    }

    /// Forwards fragments as they arrive and returns the full text.
    /// Send failures mean the client left; generation keeps going.
    async fn generate_streaming(
        &self,
        request: &ChatRequest,
        tx: &mpsc::Sender<ChatStreamChunk>,
    ) -> Result<String, ChatError> {
        let prompt = self.prompt_for(request).await;
        let mut stream = self.llm.generate_stream(&prompt).await?;

        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            full.push_str(&fragment);
            let _ = tx.send(ChatStreamChunk::Token(fragment)).await;
        }

        Ok(full)
    }

    async fn replay(&self, text: &str, tx: &mpsc::Sender<ChatStreamChunk>) {
        let delay = Duration::from_millis(self.stream.replay_delay_ms);
        for piece in split_chars(text, self.stream.replay_chunk_chars) {
            if tx.send(ChatStreamChunk::Token(piece)).await.is_err() {
                return;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn commit(&self, key: String, request: &ChatRequest, reply: &str) {
        if !reply.is_empty() {
            self.responses.put(key, reply.to_string());
        }
        let turns = self
            .sessions
            .append(&request.session_id, request.message.clone(), reply.to_string());

        info!(
            "Committed reply for session {} ({} chars, {} turns)",
            request.session_id,
            reply.len(),
            turns
        );
    }
}

/// Splits text into pieces of at most `size` characters.
fn split_chars(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}
